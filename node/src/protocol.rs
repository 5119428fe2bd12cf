//! Minimal line-oriented protocol layer for the host.
//!
//! The container treats request framing as an external concern; this is the
//! host's stand-in dispatch layer. Each request is one line of the form
//! `method [payload]`; the reply is the handler's bytes (or `ERR <reason>`)
//! followed by a newline.

use async_trait::async_trait;
use quay_core::{
    Application, CallContext, ConnectionService, CoreResult, FilterKind, ServantSkeleton,
};
use std::sync::{Arc, OnceLock, Weak};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

/// Line dispatcher that runs the application's server-inbound filter chain
/// around every call.
///
/// The service is constructed before its application (the container wants
/// its collaborators at construction), so the application is attached right
/// after with [`LineConnectionService::attach`].
#[derive(Default)]
pub struct LineConnectionService {
    app: OnceLock<Weak<Application>>,
}

impl LineConnectionService {
    /// Creates a dispatcher not yet wired to an application.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wires the dispatcher to its application. Later calls are ignored.
    pub fn attach(&self, app: &Arc<Application>) {
        let _ = self.app.set(Arc::downgrade(app));
    }

    fn app(&self) -> Option<Arc<Application>> {
        self.app.get().and_then(Weak::upgrade)
    }

    async fn dispatch(&self, skeleton: &ServantSkeleton, line: &str) -> CoreResult<Vec<u8>> {
        let mut parts = line.splitn(2, ' ');
        let method = parts.next().unwrap_or_default();
        let payload = parts.next().unwrap_or_default();

        if let Some(app) = self.app() {
            let mut ctx = CallContext::new(app.name(), skeleton.name(), method);
            app.run_filters(FilterKind::Server, &mut ctx).await?;
        }
        skeleton.invoke(method, payload.as_bytes()).await
    }
}

#[async_trait]
impl ConnectionService for LineConnectionService {
    async fn serve(&self, stream: TcpStream, skeleton: Arc<ServantSkeleton>) -> CoreResult<()> {
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match self.dispatch(&skeleton, line).await {
                Ok(reply) => {
                    write_half.write_all(&reply).await?;
                    write_half.write_all(b"\n").await?;
                }
                Err(e) => {
                    debug!(servant = %skeleton.name(), error = %e, "request failed");
                    write_half
                        .write_all(format!("ERR {e}\n").as_bytes())
                        .await?;
                }
            }
        }
        Ok(())
    }
}
