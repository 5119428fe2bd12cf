//! Error types for the Quay application container.

use thiserror::Error;

/// Result type alias for container operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Container errors covering the startup phases and the readiness-gated
/// accessor surface.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A readiness-gated accessor was called while the application has not
    /// completed or has failed startup.
    #[error("application '{0}' is not ready")]
    NotReady(String),

    /// The application-specific servant load step failed. Fatal: startup is
    /// aborted and the application stays unavailable.
    #[error("servant load failed: {0}")]
    Load(String),

    /// The built-in admin servant could not be injected. Advisory: startup
    /// continues without the admin endpoint.
    #[error("admin servant injection failed: {0}")]
    AdminInjection(String),

    /// Publishing one servant to the discovery collaborator failed.
    /// Advisory and per-servant.
    #[error("registration of servant '{servant}' failed: {reason}")]
    Registration { servant: String, reason: String },

    /// No adapter entry was declared for the servant being registered.
    #[error("no adapter configuration for servant '{0}'")]
    MissingAdapterConfig(String),

    /// An adapter failed to bind its endpoint.
    #[error("adapter for servant '{servant}' failed to bind: {reason}")]
    AdapterBind { servant: String, reason: String },

    /// An adapter operation was invoked in the wrong state or failed to
    /// shut down.
    #[error("adapter error: {0}")]
    Adapter(String),

    /// A servant handler rejected an invocation.
    #[error("invoke of '{servant}.{method}' failed: {reason}")]
    Invoke {
        servant: String,
        method: String,
        reason: String,
    },

    /// IO error propagated from the standard library.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
