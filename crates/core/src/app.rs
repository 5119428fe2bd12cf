//! The per-application runtime container.
//!
//! An [`Application`] owns the servant and adapter registries, the
//! phase-keyed filter chains and the lifecycle listener hub of one hosted
//! application. `init()` runs the ordered startup sequence and reports every
//! phase outcome; `stop()` shuts the adapters down.
//!
//! Startup is partially fault-tolerant: a servant load failure is fatal, but
//! admin-servant injection and per-servant discovery registration degrade
//! without taking the application down. Shutdown is deliberately intolerant:
//! the first adapter stop error propagates and aborts the remaining stops.

use crate::adapter::{Adapter, ConnectionService, TcpServantAdapter};
use crate::admin::{AdminServant, ADMIN_SERVANT_NAME};
use crate::discovery::ServantPublisher;
use crate::error::{CoreError, CoreResult};
use crate::filter::{CallContext, Filter, FilterChains, FilterKind};
use crate::lifecycle::{AppState, PhaseStatus, StartupPhase, StartupReport};
use crate::listener::{AppListener, AppStartedEvent, ListenerHub, ServantStartedEvent};
use crate::registry::{AdapterRegistry, SkeletonRegistry};
use crate::servant::{ServantHandler, ServantSkeleton};
use crate::trace::{TraceCallbackFilter, TraceClientFilter, TraceServerFilter};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use quay_config::ServerConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use tracing::{debug, error, info, warn};

/// Application-specific servant loading step.
///
/// Implementations register the application's servants (and thereby their
/// adapters) before returning. A load error is the one fatal startup
/// failure.
#[async_trait]
pub trait ServantLoader: Send + Sync {
    /// Populates the application's registries.
    async fn load(&self, app: &Arc<Application>) -> CoreResult<()>;
}

/// Loader for applications without custom servants; only the built-in admin
/// servant will be registered.
pub struct EmptyLoader;

#[async_trait]
impl ServantLoader for EmptyLoader {
    async fn load(&self, _app: &Arc<Application>) -> CoreResult<()> {
        Ok(())
    }
}

/// The per-application runtime container.
pub struct Application {
    name: String,
    ready: AtomicBool,
    state: Mutex<AppState>,
    skeletons: SkeletonRegistry,
    adapters: AdapterRegistry,
    filter_chains: FilterChains,
    listeners: ListenerHub,
    params: RwLock<HashMap<String, String>>,
    config: Arc<ServerConfig>,
    loader: Box<dyn ServantLoader>,
    publisher: Arc<dyn ServantPublisher>,
    connection_service: Arc<dyn ConnectionService>,
    default_filters: Once,
    last_report: Mutex<Option<StartupReport>>,
}

impl Application {
    /// Creates a container for the named application.
    ///
    /// All collaborators are injected here; the container performs no
    /// ambient global lookups. The readiness flag starts true and models
    /// "never failed": it is cleared exactly once, on fatal startup failure.
    pub fn new(
        name: impl Into<String>,
        config: Arc<ServerConfig>,
        loader: Box<dyn ServantLoader>,
        publisher: Arc<dyn ServantPublisher>,
        connection_service: Arc<dyn ConnectionService>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            ready: AtomicBool::new(true),
            state: Mutex::new(AppState::Created),
            skeletons: SkeletonRegistry::new(),
            adapters: AdapterRegistry::new(),
            filter_chains: FilterChains::new(),
            listeners: ListenerHub::new(),
            params: RwLock::new(HashMap::new()),
            config,
            loader,
            publisher,
            connection_service,
            default_filters: Once::new(),
            last_report: Mutex::new(None),
        })
    }

    /// Application name; empty for the default application.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AppState {
        *self.state.lock()
    }

    /// True unless startup has failed fatally.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// The injected server configuration.
    pub fn config(&self) -> &Arc<ServerConfig> {
        &self.config
    }

    /// Runs the ordered startup sequence.
    ///
    /// Never returns an error: every phase outcome, fatal or advisory, is
    /// recorded in the returned [`StartupReport`]. After a fatal load
    /// failure the application is left in [`AppState::Failed`] with
    /// readiness cleared, and every readiness-gated accessor fails.
    pub async fn init(self: Arc<Self>) -> StartupReport {
        let mut report = StartupReport::new(&self.name);

        self.set_state(AppState::Loading);
        match self.loader.load(&self).await {
            Ok(()) => report.record(StartupPhase::Load, PhaseStatus::Ok),
            Err(e) => {
                self.ready.store(false, Ordering::Release);
                self.set_state(AppState::Failed);
                error!(app = %self.name, error = %e, "failed to start the application");
                report.record(StartupPhase::Load, PhaseStatus::Fatal(e.to_string()));
                report.skip_remaining();
                *self.last_report.lock() = Some(report.clone());
                return report;
            }
        }

        // Admin endpoint unavailability must not take the application down.
        match Self::inject_admin_servant(&self).await {
            Ok(()) => report.record(StartupPhase::AdminInjection, PhaseStatus::Ok),
            Err(e) => {
                warn!(app = %self.name, error = %e, "admin servant unavailable");
                report.record(
                    StartupPhase::AdminInjection,
                    PhaseStatus::Advisory(vec![e.to_string()]),
                );
            }
        }
        self.set_state(AppState::AdminInjected);

        let failures = self.publish_servants();
        self.set_state(AppState::ServantsInitialized);
        if failures.is_empty() {
            report.record(StartupPhase::ServantRegistration, PhaseStatus::Ok);
        } else {
            report.record(
                StartupPhase::ServantRegistration,
                PhaseStatus::Advisory(failures),
            );
        }

        self.set_state(AppState::Started);
        let event = AppStartedEvent::new(Arc::clone(&self));
        self.listeners.notify_app_started(&event);
        report.record(StartupPhase::Notify, PhaseStatus::Ok);
        info!(app = %self.name, "application started");

        *self.last_report.lock() = Some(report.clone());
        report
    }

    /// The report recorded by the most recent `init()` run, if any.
    pub fn startup_report(&self) -> Option<StartupReport> {
        self.last_report.lock().clone()
    }

    /// Stops every registered adapter.
    ///
    /// Deliberately intolerant, unlike startup: the first adapter stop error
    /// propagates immediately and the remaining adapters are not stopped.
    pub async fn stop(&self) -> CoreResult<()> {
        for name in self.adapters.names() {
            if let Some(adapter) = self.adapters.get(&name) {
                adapter.stop().await?;
            }
        }
        self.set_state(AppState::Stopped);
        info!(app = %self.name, "application stopped");
        Ok(())
    }

    /// Registers a servant under `name`: builds the TCP adapter declared for
    /// it in the server configuration, binds it to the new skeleton and
    /// publishes both registry entries.
    ///
    /// Both registries are written here (adapter first, then skeleton); a
    /// concurrent reader may briefly observe one map without the other.
    pub async fn register_servant(
        &self,
        name: &str,
        handler: Arc<dyn ServantHandler>,
        load_limit: i32,
    ) -> CoreResult<Arc<ServantSkeleton>> {
        let adapter_config = self
            .config
            .adapter_config(name)
            .ok_or_else(|| CoreError::MissingAdapterConfig(name.to_string()))?
            .clone();

        let skeleton = Arc::new(ServantSkeleton::new(
            name,
            &self.name,
            handler,
            load_limit,
        ));
        let adapter = Arc::new(TcpServantAdapter::new(
            adapter_config,
            Arc::clone(&self.connection_service),
        ));
        adapter.bind(Arc::clone(&skeleton)).await?;

        self.adapters.insert(name, adapter);
        self.skeletons.insert(Arc::clone(&skeleton));
        debug!(app = %self.name, servant = name, "servant registered");
        Ok(skeleton)
    }

    /// Publishes a pre-built skeleton without constructing an adapter.
    /// Duplicate names replace the previous binding.
    pub fn register_skeleton(&self, skeleton: Arc<ServantSkeleton>) {
        self.skeletons.insert(skeleton);
    }

    /// Publishes an externally constructed adapter under a servant name.
    pub fn register_adapter(&self, servant: &str, adapter: Arc<dyn Adapter>) {
        self.adapters.insert(servant, adapter);
    }

    /// Returns the skeleton registered under `name`.
    ///
    /// Fails with [`CoreError::NotReady`] while the application has not
    /// completed or has failed startup; returns `Ok(None)` when the
    /// application is ready but the servant is unknown.
    pub fn servant(&self, name: &str) -> CoreResult<Option<Arc<ServantSkeleton>>> {
        self.ensure_ready()?;
        Ok(self.skeletons.get(name))
    }

    /// Snapshot of the currently registered servant names.
    pub fn servant_names(&self) -> Vec<String> {
        self.skeletons.names()
    }

    /// Number of registered servants.
    pub fn servant_count(&self) -> usize {
        self.skeletons.len()
    }

    /// The adapter serving `servant`, if registered.
    pub fn adapter(&self, servant: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(servant)
    }

    /// Number of registered adapters.
    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Copy-on-read snapshot of the phase's filter chain, in insertion
    /// order. Readiness-gated.
    pub fn filters(&self, kind: FilterKind) -> CoreResult<Vec<Arc<dyn Filter>>> {
        self.ensure_ready()?;
        Ok(self.filter_chains.snapshot(kind))
    }

    /// Appends a filter to the phase's chain. Not readiness-gated; late
    /// registration becomes visible to future calls.
    pub fn add_filter(&self, kind: FilterKind, filter: Arc<dyn Filter>) {
        self.filter_chains.add(kind, filter);
    }

    /// Runs the phase's chain over `ctx`. Readiness-gated.
    pub async fn run_filters(&self, kind: FilterKind, ctx: &mut CallContext) -> CoreResult<()> {
        self.ensure_ready()?;
        self.filter_chains.execute(kind, ctx).await
    }

    /// Installs the built-in trace filters, one per phase, at most once per
    /// application. A filter whose `init` fails is logged and skipped.
    pub fn load_default_filters(&self) {
        self.default_filters.call_once(|| {
            let defaults: [(FilterKind, Arc<dyn Filter>); 3] = [
                (FilterKind::Server, Arc::new(TraceServerFilter)),
                (FilterKind::Client, Arc::new(TraceClientFilter)),
                (FilterKind::Callback, Arc::new(TraceCallbackFilter)),
            ];
            for (kind, filter) in defaults {
                match filter.init() {
                    Ok(()) => self.filter_chains.add(kind, filter),
                    Err(e) => {
                        warn!(app = %self.name, filter = filter.name(), error = %e,
                            "default filter failed to initialize, skipping");
                    }
                }
            }
        });
    }

    /// Subscribes a lifecycle listener; duplicates by identity are ignored.
    pub fn subscribe(&self, listener: Arc<dyn AppListener>) {
        self.listeners.subscribe(listener);
    }

    /// Fires the servant-started event to every listener. Decoupled from
    /// `init()`: any external trigger (typically the adapter beginning to
    /// serve) may invoke this.
    pub fn notify_servant_started(&self, servant: &str) {
        let event = ServantStartedEvent {
            app: self.name.clone(),
            servant: servant.to_string(),
        };
        self.listeners.notify_servant_started(&event);
    }

    /// Sets an application-scoped context parameter.
    pub fn set_param(&self, key: impl Into<String>, value: impl Into<String>) {
        self.params.write().insert(key.into(), value.into());
    }

    /// Reads an application-scoped context parameter.
    pub fn param(&self, key: &str) -> Option<String> {
        self.params.read().get(key).cloned()
    }

    async fn inject_admin_servant(app: &Arc<Application>) -> CoreResult<()> {
        let handler = Arc::new(AdminServant::new(Arc::downgrade(app)));
        app.register_servant(ADMIN_SERVANT_NAME, handler, crate::servant::UNBOUNDED_LOAD)
            .await
            .map_err(|e| CoreError::AdminInjection(e.to_string()))?;
        Ok(())
    }

    /// Best-effort discovery registration of every known skeleton. Returns
    /// one message per failed servant.
    fn publish_servants(&self) -> Vec<String> {
        let mut failures = Vec::new();
        for name in self.skeletons.names() {
            let Some(skeleton) = self.skeletons.get(&name) else {
                continue;
            };
            if let Err(e) = self.publisher.publish(&self.name, skeleton.api(), &name) {
                error!(app = %self.name, servant = %name, error = %e, "servant registration failed");
                failures.push(format!("{name}: {e}"));
            }
        }
        failures
    }

    fn ensure_ready(&self) -> CoreResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(CoreError::NotReady(self.name.clone()))
        }
    }

    fn set_state(&self, next: AppState) {
        let mut state = self.state.lock();
        let prev = *state;
        *state = next;
        debug!(app = %self.name, from = %prev, to = %next, "lifecycle transition");
    }
}
