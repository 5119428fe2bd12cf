//! Phase-keyed RPC filter chains.
//!
//! Filters are interceptors that the dispatch layer runs around every call.
//! The three phases never cross-apply: server-inbound, client-outbound and
//! asynchronous-callback calls each consult their own chain. Within a phase,
//! invocation order is exactly insertion order.
//!
//! Reads are copy-on-read: [`FilterChains::snapshot`] clones the phase list,
//! so a dispatching task never observes a chain growing mid-iteration.
//! Filters appended concurrently become visible to subsequent calls only.

use crate::error::CoreResult;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The phase a filter chain applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    /// Server-inbound calls.
    Server,
    /// Client-outbound calls.
    Client,
    /// Asynchronous callback completions.
    Callback,
}

impl FilterKind {
    /// All phases, in chain storage order.
    pub const ALL: [FilterKind; 3] = [FilterKind::Server, FilterKind::Client, FilterKind::Callback];

    fn index(self) -> usize {
        match self {
            FilterKind::Server => 0,
            FilterKind::Client => 1,
            FilterKind::Callback => 2,
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::Server => write!(f, "server"),
            FilterKind::Client => write!(f, "client"),
            FilterKind::Callback => write!(f, "callback"),
        }
    }
}

/// Mutable call metadata threaded through a filter chain.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Owning application name.
    pub app: String,
    /// Target servant name.
    pub servant: String,
    /// Invoked method name.
    pub method: String,
    attachments: HashMap<String, String>,
}

impl CallContext {
    /// Creates a context for one call.
    pub fn new(
        app: impl Into<String>,
        servant: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            app: app.into(),
            servant: servant.into(),
            method: method.into(),
            attachments: HashMap::new(),
        }
    }

    /// Attaches a key/value pair for downstream filters and the dispatch layer.
    pub fn attach(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attachments.insert(key.into(), value.into());
    }

    /// Reads an attachment set by an earlier filter.
    pub fn attachment(&self, key: &str) -> Option<&str> {
        self.attachments.get(key).map(String::as_str)
    }
}

/// An interceptor invoked around RPC calls in one phase.
#[async_trait]
pub trait Filter: Send + Sync {
    /// Filter name, used in diagnostics.
    fn name(&self) -> &str;

    /// One-time initialization hook, run when the filter is installed by
    /// the default-filter loader.
    fn init(&self) -> CoreResult<()> {
        Ok(())
    }

    /// Intercepts one call. Filters run in insertion order; an error aborts
    /// the remainder of the chain.
    async fn on_call(&self, ctx: &mut CallContext) -> CoreResult<()>;
}

/// The three per-phase filter chains of one application.
///
/// All three lists exist from construction onward, even while empty.
#[derive(Default)]
pub struct FilterChains {
    chains: [RwLock<Vec<Arc<dyn Filter>>>; 3],
}

impl FilterChains {
    /// Creates the three empty phase chains.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter to the phase's chain. Duplicates by reference are
    /// permitted and will run once per occurrence.
    pub fn add(&self, kind: FilterKind, filter: Arc<dyn Filter>) {
        self.chains[kind.index()].write().push(filter);
    }

    /// Returns a copy-on-read snapshot of the phase's chain, in insertion
    /// order.
    pub fn snapshot(&self, kind: FilterKind) -> Vec<Arc<dyn Filter>> {
        self.chains[kind.index()].read().clone()
    }

    /// Number of filters currently registered for the phase.
    pub fn len(&self, kind: FilterKind) -> usize {
        self.chains[kind.index()].read().len()
    }

    /// True when no phase has any filter.
    pub fn is_empty(&self) -> bool {
        FilterKind::ALL.iter().all(|kind| self.len(*kind) == 0)
    }

    /// Runs the phase's chain over `ctx` in insertion order, using a
    /// snapshot taken at entry.
    pub async fn execute(&self, kind: FilterKind, ctx: &mut CallContext) -> CoreResult<()> {
        for filter in self.snapshot(kind) {
            filter.on_call(ctx).await?;
        }
        Ok(())
    }
}
