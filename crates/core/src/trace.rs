//! Built-in call tracing filters, one per chain phase.

use crate::error::CoreResult;
use crate::filter::{CallContext, Filter};
use async_trait::async_trait;
use tracing::debug;

/// Traces server-inbound calls.
pub struct TraceServerFilter;

#[async_trait]
impl Filter for TraceServerFilter {
    fn name(&self) -> &str {
        "trace-server"
    }

    fn init(&self) -> CoreResult<()> {
        debug!("server trace filter installed");
        Ok(())
    }

    async fn on_call(&self, ctx: &mut CallContext) -> CoreResult<()> {
        debug!(
            app = %ctx.app,
            servant = %ctx.servant,
            method = %ctx.method,
            "inbound call"
        );
        Ok(())
    }
}

/// Traces client-outbound calls.
pub struct TraceClientFilter;

#[async_trait]
impl Filter for TraceClientFilter {
    fn name(&self) -> &str {
        "trace-client"
    }

    fn init(&self) -> CoreResult<()> {
        debug!("client trace filter installed");
        Ok(())
    }

    async fn on_call(&self, ctx: &mut CallContext) -> CoreResult<()> {
        debug!(
            app = %ctx.app,
            servant = %ctx.servant,
            method = %ctx.method,
            "outbound call"
        );
        Ok(())
    }
}

/// Traces asynchronous callback completions.
pub struct TraceCallbackFilter;

#[async_trait]
impl Filter for TraceCallbackFilter {
    fn name(&self) -> &str {
        "trace-callback"
    }

    fn init(&self) -> CoreResult<()> {
        debug!("callback trace filter installed");
        Ok(())
    }

    async fn on_call(&self, ctx: &mut CallContext) -> CoreResult<()> {
        debug!(
            app = %ctx.app,
            servant = %ctx.servant,
            method = %ctx.method,
            "callback completion"
        );
        Ok(())
    }
}
