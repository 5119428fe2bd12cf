//! Network adapters carrying servant traffic.
//!
//! One adapter binds exactly one skeleton. The container only drives the
//! adapter lifecycle; framing and request dispatch belong to the protocol
//! layer, which plugs in behind [`ConnectionService`].

use crate::error::{CoreError, CoreResult};
use crate::servant::ServantSkeleton;
use async_trait::async_trait;
use parking_lot::Mutex;
use quay_config::AdapterConfig;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Protocol-layer boundary: serves one accepted connection against the
/// skeleton the adapter is bound to.
#[async_trait]
pub trait ConnectionService: Send + Sync {
    /// Serves the connection until it closes or fails.
    async fn serve(&self, stream: TcpStream, skeleton: Arc<ServantSkeleton>) -> CoreResult<()>;
}

/// A network-facing binding that carries traffic for one servant.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// The configuration this adapter was built from.
    fn config(&self) -> &AdapterConfig;

    /// True while the adapter is accepting traffic.
    fn is_running(&self) -> bool;

    /// Binds the endpoint and starts serving the skeleton.
    async fn bind(&self, skeleton: Arc<ServantSkeleton>) -> CoreResult<()>;

    /// Stops accepting traffic and releases the endpoint.
    async fn stop(&self) -> CoreResult<()>;
}

/// Standard TCP adapter: binds a listener, enforces the configured
/// connection ceiling and hands each accepted stream to the injected
/// [`ConnectionService`].
pub struct TcpServantAdapter {
    config: AdapterConfig,
    service: Arc<dyn ConnectionService>,
    running: AtomicBool,
    active: Arc<AtomicUsize>,
    shutdown: watch::Sender<bool>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    bound_addr: Mutex<Option<SocketAddr>>,
}

impl TcpServantAdapter {
    /// Creates an unbound adapter for `config`.
    pub fn new(config: AdapterConfig, service: Arc<dyn ConnectionService>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            service,
            running: AtomicBool::new(false),
            active: Arc::new(AtomicUsize::new(0)),
            shutdown,
            accept_task: Mutex::new(None),
            bound_addr: Mutex::new(None),
        }
    }

    /// The address actually bound; differs from the configured one when
    /// binding port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.bound_addr.lock()
    }

    /// Connections currently being served.
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    async fn accept_loop(
        listener: TcpListener,
        skeleton: Arc<ServantSkeleton>,
        service: Arc<dyn ConnectionService>,
        active: Arc<AtomicUsize>,
        max_connections: usize,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!(servant = %skeleton.name(), "accept loop shutting down");
                        break;
                    }
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            if active.load(Ordering::Relaxed) >= max_connections {
                                warn!(
                                    servant = %skeleton.name(),
                                    %peer,
                                    limit = max_connections,
                                    "connection ceiling reached, dropping connection"
                                );
                                continue;
                            }
                            let guard = ConnectionGuard::acquire(&active);
                            let service = Arc::clone(&service);
                            let skeleton = Arc::clone(&skeleton);
                            tokio::spawn(async move {
                                let _guard = guard;
                                if let Err(e) = service.serve(stream, Arc::clone(&skeleton)).await {
                                    debug!(
                                        servant = %skeleton.name(),
                                        %peer,
                                        error = %e,
                                        "connection ended with error"
                                    );
                                }
                            });
                        }
                        Err(e) => {
                            warn!(servant = %skeleton.name(), error = %e, "accept failed");
                        }
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Adapter for TcpServantAdapter {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    async fn bind(&self, skeleton: Arc<ServantSkeleton>) -> CoreResult<()> {
        if self.is_running() {
            return Err(CoreError::Adapter(format!(
                "adapter for servant '{}' is already bound",
                self.config.servant
            )));
        }

        let listener =
            TcpListener::bind(self.config.bind)
                .await
                .map_err(|e| CoreError::AdapterBind {
                    servant: self.config.servant.clone(),
                    reason: e.to_string(),
                })?;
        let local = listener.local_addr().map_err(|e| CoreError::AdapterBind {
            servant: self.config.servant.clone(),
            reason: e.to_string(),
        })?;
        *self.bound_addr.lock() = Some(local);

        let task = tokio::spawn(Self::accept_loop(
            listener,
            Arc::clone(&skeleton),
            Arc::clone(&self.service),
            Arc::clone(&self.active),
            self.config.max_connections,
            self.shutdown.subscribe(),
        ));
        *self.accept_task.lock() = Some(task);
        self.running.store(true, Ordering::Release);

        info!(servant = %skeleton.name(), %local, "adapter bound");
        Ok(())
    }

    async fn stop(&self) -> CoreResult<()> {
        if !self.is_running() {
            return Err(CoreError::Adapter(format!(
                "adapter for servant '{}' is not running",
                self.config.servant
            )));
        }

        let _ = self.shutdown.send(true);
        let task = self.accept_task.lock().take();
        if let Some(task) = task {
            task.await
                .map_err(|e| CoreError::Adapter(format!("accept loop join failed: {e}")))?;
        }
        self.running.store(false, Ordering::Release);

        info!(servant = %self.config.servant, "adapter stopped");
        Ok(())
    }
}

/// RAII guard for the live-connection counter.
struct ConnectionGuard {
    active: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    fn acquire(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::Relaxed);
        Self {
            active: Arc::clone(active),
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::servant::{ApiDescriptor, ServantHandler, UNBOUNDED_LOAD};
    use parking_lot::Mutex as SyncMutex;

    struct NullHandler;

    #[async_trait]
    impl ServantHandler for NullHandler {
        fn api(&self) -> ApiDescriptor {
            ApiDescriptor::new("NullService", &[])
        }

        async fn invoke(&self, _method: &str, _payload: &[u8]) -> CoreResult<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    struct RecordingService {
        served: Arc<SyncMutex<Vec<String>>>,
    }

    #[async_trait]
    impl ConnectionService for RecordingService {
        async fn serve(
            &self,
            _stream: TcpStream,
            skeleton: Arc<ServantSkeleton>,
        ) -> CoreResult<()> {
            self.served.lock().push(skeleton.name().to_string());
            Ok(())
        }
    }

    fn test_skeleton() -> Arc<ServantSkeleton> {
        Arc::new(ServantSkeleton::new(
            "calc",
            "demo",
            Arc::new(NullHandler),
            UNBOUNDED_LOAD,
        ))
    }

    fn loopback_config() -> AdapterConfig {
        AdapterConfig::new("calc", "127.0.0.1:0".parse().unwrap())
    }

    #[tokio::test]
    async fn bind_then_stop_releases_the_adapter() {
        let served = Arc::new(SyncMutex::new(Vec::new()));
        let adapter = TcpServantAdapter::new(
            loopback_config(),
            Arc::new(RecordingService {
                served: Arc::clone(&served),
            }),
        );

        adapter.bind(test_skeleton()).await.unwrap();
        assert!(adapter.is_running());
        assert!(adapter.local_addr().is_some());

        adapter.stop().await.unwrap();
        assert!(!adapter.is_running());
    }

    #[tokio::test]
    async fn accepted_connections_reach_the_service() {
        let served = Arc::new(SyncMutex::new(Vec::new()));
        let adapter = TcpServantAdapter::new(
            loopback_config(),
            Arc::new(RecordingService {
                served: Arc::clone(&served),
            }),
        );
        adapter.bind(test_skeleton()).await.unwrap();
        let addr = adapter.local_addr().unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();
        // Give the accept loop a moment to hand the stream over.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(*served.lock(), vec!["calc"]);
        adapter.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_before_bind_is_an_error() {
        let adapter = TcpServantAdapter::new(
            loopback_config(),
            Arc::new(RecordingService {
                served: Arc::new(SyncMutex::new(Vec::new())),
            }),
        );
        assert!(adapter.stop().await.is_err());
    }

    #[tokio::test]
    async fn double_bind_is_an_error() {
        let adapter = TcpServantAdapter::new(
            loopback_config(),
            Arc::new(RecordingService {
                served: Arc::new(SyncMutex::new(Vec::new())),
            }),
        );
        adapter.bind(test_skeleton()).await.unwrap();
        assert!(adapter.bind(test_skeleton()).await.is_err());
        adapter.stop().await.unwrap();
    }
}
