//! Servant skeletons and the bound handler contract.
//!
//! A servant is a named RPC endpoint. Its skeleton pairs the name with the
//! handler object that serves it and with the capability interface the
//! handler implements. Skeletons are immutable after registration.

use crate::error::CoreResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Load limit hint meaning "unconstrained".
pub const UNBOUNDED_LOAD: i32 = -1;

/// Describes the capability interface a handler implements.
///
/// Published to the discovery collaborator during the registration pass so
/// that clients can resolve which operations a servant exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDescriptor {
    /// Interface name, e.g. `"EchoService"`.
    pub interface: String,
    /// Operation names exposed by the interface.
    pub methods: Vec<String>,
}

impl ApiDescriptor {
    /// Creates a descriptor from an interface name and its operations.
    pub fn new(interface: impl Into<String>, methods: &[&str]) -> Self {
        Self {
            interface: interface.into(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl fmt::Display for ApiDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.interface)
    }
}

/// Handler object bound to a servant endpoint.
///
/// The container treats handlers as opaque: protocol decoding happens in the
/// dispatch layer, which hands the method name and raw payload to `invoke`.
#[async_trait]
pub trait ServantHandler: Send + Sync {
    /// Capability interface this handler implements.
    fn api(&self) -> ApiDescriptor;

    /// Invokes one operation with an opaque payload.
    async fn invoke(&self, method: &str, payload: &[u8]) -> CoreResult<Vec<u8>>;
}

/// A registered servant endpoint: name, bound handler, capability interface
/// and load limit hint.
pub struct ServantSkeleton {
    name: String,
    app: String,
    handler: Arc<dyn ServantHandler>,
    api: ApiDescriptor,
    load_limit: i32,
}

impl ServantSkeleton {
    /// Creates a skeleton binding `handler` under `name` for application `app`.
    pub fn new(
        name: impl Into<String>,
        app: impl Into<String>,
        handler: Arc<dyn ServantHandler>,
        load_limit: i32,
    ) -> Self {
        let api = handler.api();
        Self {
            name: name.into(),
            app: app.into(),
            handler,
            api,
            load_limit,
        }
    }

    /// Servant name, unique within its application.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the owning application.
    pub fn app(&self) -> &str {
        &self.app
    }

    /// Capability interface descriptor captured at registration.
    pub fn api(&self) -> &ApiDescriptor {
        &self.api
    }

    /// Load limit hint; [`UNBOUNDED_LOAD`] when unconstrained.
    pub fn load_limit(&self) -> i32 {
        self.load_limit
    }

    /// Dispatches one invocation to the bound handler.
    pub async fn invoke(&self, method: &str, payload: &[u8]) -> CoreResult<Vec<u8>> {
        self.handler.invoke(method, payload).await
    }
}

impl fmt::Debug for ServantSkeleton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServantSkeleton")
            .field("name", &self.name)
            .field("app", &self.app)
            .field("api", &self.api.interface)
            .field("load_limit", &self.load_limit)
            .finish()
    }
}
