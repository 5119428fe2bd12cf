//! Demo servants hosted by the node and the loader that registers them.

use async_trait::async_trait;
use quay_core::{
    ApiDescriptor, Application, CoreError, CoreResult, ServantHandler, ServantLoader,
    UNBOUNDED_LOAD,
};
use std::sync::Arc;

/// Echo servant: `echo` returns the payload, `reverse` returns it reversed.
pub struct EchoServant;

#[async_trait]
impl ServantHandler for EchoServant {
    fn api(&self) -> ApiDescriptor {
        ApiDescriptor::new("EchoService", &["echo", "reverse"])
    }

    async fn invoke(&self, method: &str, payload: &[u8]) -> CoreResult<Vec<u8>> {
        match method {
            "echo" => Ok(payload.to_vec()),
            "reverse" => Ok(payload.iter().rev().copied().collect()),
            other => Err(CoreError::Invoke {
                servant: "echo".to_string(),
                method: other.to_string(),
                reason: "unknown method".to_string(),
            }),
        }
    }
}

/// Registers one echo servant per declared adapter entry.
pub struct DeclaredServantLoader {
    servants: Vec<String>,
}

impl DeclaredServantLoader {
    /// Creates a loader for the declared servant names.
    pub fn new(servants: Vec<String>) -> Self {
        Self { servants }
    }
}

#[async_trait]
impl ServantLoader for DeclaredServantLoader {
    async fn load(&self, app: &Arc<Application>) -> CoreResult<()> {
        for name in &self.servants {
            app.register_servant(name, Arc::new(EchoServant), UNBOUNDED_LOAD)
                .await?;
        }
        Ok(())
    }
}
