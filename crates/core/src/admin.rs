//! Built-in administrative servant.
//!
//! Every application gets a diagnostic endpoint injected under the reserved
//! name [`ADMIN_SERVANT_NAME`] during startup. The handler answers a small
//! command set against the owning container, reached through a weak handle
//! so the admin servant never keeps its application alive.

use crate::app::Application;
use crate::error::{CoreError, CoreResult};
use crate::servant::{ApiDescriptor, ServantHandler};
use async_trait::async_trait;
use std::sync::{Arc, Weak};

/// Reserved servant name of the built-in admin endpoint.
pub const ADMIN_SERVANT_NAME: &str = "admin";

/// Diagnostic/management handler injected into every application.
pub struct AdminServant {
    app: Weak<Application>,
}

impl AdminServant {
    /// Creates the admin handler for the given container.
    pub fn new(app: Weak<Application>) -> Self {
        Self { app }
    }

    fn container(&self, method: &str) -> CoreResult<Arc<Application>> {
        self.app.upgrade().ok_or_else(|| CoreError::Invoke {
            servant: ADMIN_SERVANT_NAME.to_string(),
            method: method.to_string(),
            reason: "application container dropped".to_string(),
        })
    }
}

#[async_trait]
impl ServantHandler for AdminServant {
    fn api(&self) -> ApiDescriptor {
        ApiDescriptor::new("AdminService", &["ping", "status", "servants", "report"])
    }

    async fn invoke(&self, method: &str, _payload: &[u8]) -> CoreResult<Vec<u8>> {
        match method {
            "ping" => Ok(b"pong".to_vec()),
            "status" => {
                let app = self.container(method)?;
                let status = serde_json::json!({
                    "app": app.name(),
                    "state": app.state().to_string(),
                    "ready": app.is_ready(),
                    "servants": app.servant_count(),
                    "adapters": app.adapter_count(),
                });
                Ok(status.to_string().into_bytes())
            }
            "servants" => {
                let app = self.container(method)?;
                let mut names = app.servant_names();
                names.sort();
                Ok(serde_json::json!(names).to_string().into_bytes())
            }
            "report" => {
                let app = self.container(method)?;
                match app.startup_report() {
                    Some(report) => serde_json::to_vec(&report).map_err(|e| CoreError::Invoke {
                        servant: ADMIN_SERVANT_NAME.to_string(),
                        method: method.to_string(),
                        reason: e.to_string(),
                    }),
                    None => Ok(b"null".to_vec()),
                }
            }
            other => Err(CoreError::Invoke {
                servant: ADMIN_SERVANT_NAME.to_string(),
                method: other.to_string(),
                reason: "unknown admin command".to_string(),
            }),
        }
    }
}
