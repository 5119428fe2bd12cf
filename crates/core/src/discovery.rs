//! Discovery/analytics collaborator boundary.
//!
//! During startup every registered skeleton is published as
//! `(application, capability interface, servant name)`. Publication is
//! best-effort: a failure for one servant never aborts the others.

use crate::error::CoreResult;
use crate::servant::ApiDescriptor;
use tracing::info;

/// Receives servant registrations, typically a discovery or analytics
/// service outside this process.
pub trait ServantPublisher: Send + Sync {
    /// Publishes one servant registration.
    fn publish(&self, app: &str, api: &ApiDescriptor, servant: &str) -> CoreResult<()>;
}

/// Default publisher: records registrations in the process log.
#[derive(Default)]
pub struct LogPublisher;

impl ServantPublisher for LogPublisher {
    fn publish(&self, app: &str, api: &ApiDescriptor, servant: &str) -> CoreResult<()> {
        info!(app, interface = %api, servant, "servant published");
        Ok(())
    }
}
