//! Lifecycle listeners and the notification hub.
//!
//! Listeners subscribe once (identity-deduplicated) and receive two events:
//! application started and servant started. Delivery iterates an immutable
//! snapshot of the subscriber set taken at notify time, and each callback is
//! isolated: a panicking listener is logged and the remaining listeners are
//! still notified.

use crate::app::Application;
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

/// Payload of the application-started event.
pub struct AppStartedEvent {
    app: Arc<Application>,
}

impl AppStartedEvent {
    pub(crate) fn new(app: Arc<Application>) -> Self {
        Self { app }
    }

    /// The application that finished starting.
    pub fn app(&self) -> &Arc<Application> {
        &self.app
    }
}

/// Payload of the servant-started event.
#[derive(Debug, Clone)]
pub struct ServantStartedEvent {
    /// Owning application name.
    pub app: String,
    /// Name of the servant that began serving.
    pub servant: String,
}

/// Subscriber to application lifecycle events.
pub trait AppListener: Send + Sync {
    /// Called once when the application completes startup.
    fn on_app_started(&self, event: &AppStartedEvent);

    /// Called whenever a servant begins serving.
    fn on_servant_started(&self, event: &ServantStartedEvent);
}

/// Deduplicating subscriber set with isolated, snapshot-based delivery.
///
/// No delivery order is guaranteed beyond "every member notified exactly
/// once per event".
#[derive(Default)]
pub struct ListenerHub {
    subscribers: RwLock<Vec<Arc<dyn AppListener>>>,
}

impl ListenerHub {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a listener. Re-subscribing the same listener (by
    /// reference identity) is a no-op.
    pub fn subscribe(&self, listener: Arc<dyn AppListener>) {
        let mut subscribers = self.subscribers.write();
        if !subscribers.iter().any(|existing| Arc::ptr_eq(existing, &listener)) {
            subscribers.push(listener);
        }
    }

    /// Number of distinct subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// True when nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Delivers the app-started event to every subscriber.
    pub fn notify_app_started(&self, event: &AppStartedEvent) {
        for listener in self.snapshot() {
            if catch_unwind(AssertUnwindSafe(|| listener.on_app_started(event))).is_err() {
                error!(app = %event.app().name(), "listener panicked during app-started delivery");
            }
        }
    }

    /// Delivers the servant-started event to every subscriber.
    pub fn notify_servant_started(&self, event: &ServantStartedEvent) {
        for listener in self.snapshot() {
            if catch_unwind(AssertUnwindSafe(|| listener.on_servant_started(event))).is_err() {
                error!(
                    app = %event.app,
                    servant = %event.servant,
                    "listener panicked during servant-started delivery"
                );
            }
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn AppListener>> {
        self.subscribers.read().clone()
    }
}
