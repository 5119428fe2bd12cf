//! Shared fixtures for the container integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use quay_config::{AdapterConfig, ServerConfig};
use quay_core::{
    Adapter, AppListener, AppStartedEvent, ApiDescriptor, Application, ConnectionService,
    CoreError, CoreResult, ServantHandler, ServantLoader, ServantPublisher, ServantSkeleton,
    ServantStartedEvent, UNBOUNDED_LOAD,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;

/// Connection service that closes every accepted stream immediately.
pub struct NoopConnectionService;

#[async_trait]
impl ConnectionService for NoopConnectionService {
    async fn serve(&self, _stream: TcpStream, _skeleton: Arc<ServantSkeleton>) -> CoreResult<()> {
        Ok(())
    }
}

/// Handler that echoes the payload back.
pub struct EchoHandler;

#[async_trait]
impl ServantHandler for EchoHandler {
    fn api(&self) -> ApiDescriptor {
        ApiDescriptor::new("EchoService", &["echo"])
    }

    async fn invoke(&self, _method: &str, payload: &[u8]) -> CoreResult<Vec<u8>> {
        Ok(payload.to_vec())
    }
}

/// Loader that registers one echo servant per configured name.
pub struct RegisterLoader {
    pub servants: Vec<String>,
}

#[async_trait]
impl ServantLoader for RegisterLoader {
    async fn load(&self, app: &Arc<Application>) -> CoreResult<()> {
        for name in &self.servants {
            app.register_servant(name, Arc::new(EchoHandler), UNBOUNDED_LOAD)
                .await?;
        }
        Ok(())
    }
}

/// Loader that always fails fatally.
pub struct FailingLoader;

#[async_trait]
impl ServantLoader for FailingLoader {
    async fn load(&self, _app: &Arc<Application>) -> CoreResult<()> {
        Err(CoreError::Load("servant wiring broke".to_string()))
    }
}

/// Publisher that records successful publications.
#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<String>>,
}

impl ServantPublisher for RecordingPublisher {
    fn publish(&self, _app: &str, _api: &ApiDescriptor, servant: &str) -> CoreResult<()> {
        self.published.lock().push(servant.to_string());
        Ok(())
    }
}

/// Publisher that rejects every registration.
pub struct FailingPublisher;

impl ServantPublisher for FailingPublisher {
    fn publish(&self, _app: &str, _api: &ApiDescriptor, servant: &str) -> CoreResult<()> {
        Err(CoreError::Registration {
            servant: servant.to_string(),
            reason: "collector unreachable".to_string(),
        })
    }
}

/// Listener that records both event kinds.
#[derive(Default)]
pub struct RecordingListener {
    pub started_apps: Mutex<Vec<Arc<Application>>>,
    pub started_servants: Mutex<Vec<String>>,
}

impl AppListener for RecordingListener {
    fn on_app_started(&self, event: &AppStartedEvent) {
        self.started_apps.lock().push(Arc::clone(event.app()));
    }

    fn on_servant_started(&self, event: &ServantStartedEvent) {
        self.started_servants.lock().push(event.servant.clone());
    }
}

/// Adapter stub counting stop invocations.
pub struct CountingAdapter {
    config: AdapterConfig,
    running: AtomicBool,
    pub stops: AtomicUsize,
}

impl CountingAdapter {
    pub fn new(servant: &str) -> Self {
        Self {
            config: AdapterConfig::new(servant, "127.0.0.1:0".parse().unwrap()),
            running: AtomicBool::new(true),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Adapter for CountingAdapter {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn bind(&self, _skeleton: Arc<ServantSkeleton>) -> CoreResult<()> {
        Ok(())
    }

    async fn stop(&self) -> CoreResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Adapter stub whose stop always fails.
pub struct FailingAdapter {
    config: AdapterConfig,
}

impl FailingAdapter {
    pub fn new(servant: &str) -> Self {
        Self {
            config: AdapterConfig::new(servant, "127.0.0.1:0".parse().unwrap()),
        }
    }
}

#[async_trait]
impl Adapter for FailingAdapter {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn is_running(&self) -> bool {
        true
    }

    async fn bind(&self, _skeleton: Arc<ServantSkeleton>) -> CoreResult<()> {
        Ok(())
    }

    async fn stop(&self) -> CoreResult<()> {
        Err(CoreError::Adapter("socket refused to close".to_string()))
    }
}

/// Server configuration with one loopback adapter entry per servant name.
pub fn loopback_config(app: &str, servants: &[&str]) -> Arc<ServerConfig> {
    let mut config = ServerConfig::new(app, format!("{app}-server"));
    for servant in servants {
        config = config.with_adapter(AdapterConfig::new(
            *servant,
            "127.0.0.1:0".parse().unwrap(),
        ));
    }
    Arc::new(config)
}

/// Container wired with loopback adapters and a recording publisher.
pub fn build_app(
    app_name: &str,
    adapter_entries: &[&str],
    loader: Box<dyn ServantLoader>,
) -> Arc<Application> {
    Application::new(
        app_name,
        loopback_config(app_name, adapter_entries),
        loader,
        Arc::new(RecordingPublisher::default()),
        Arc::new(NoopConnectionService),
    )
}
