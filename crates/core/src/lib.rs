//! # Quay Core
//!
//! Per-application runtime container for a multi-service RPC server
//! process. A host process creates one [`Application`] per configured
//! application; each container owns its servant registry, its network
//! adapters, its phase-keyed filter chains and its lifecycle listeners.
//!
//! ## Architecture
//!
//! - **Registries** (`registry`): concurrent servant/adapter maps with
//!   per-key linearizability and last-write-wins upsert semantics.
//! - **Filters** (`filter`, `trace`): ordered interceptor chains for the
//!   server-inbound, client-outbound and callback phases, consulted per
//!   call by the dispatch layer through copy-on-read snapshots.
//! - **Lifecycle** (`app`, `lifecycle`): the partially fault-tolerant
//!   startup sequence (fatal servant load, advisory admin injection,
//!   best-effort discovery registration) recorded as a structured
//!   [`StartupReport`], and the deliberately intolerant shutdown path.
//! - **Events** (`listener`): identity-deduplicated subscriber hub with
//!   isolated, snapshot-based delivery of app-started and servant-started
//!   events.
//! - **Boundaries**: `adapter` (socket carrier and `ConnectionService`
//!   protocol seam), `discovery` (servant publication), `admin` (built-in
//!   diagnostic servant), with configuration injected from `quay-config`.

#![warn(missing_docs)]

/// Network adapters and the protocol-layer boundary.
pub mod adapter;
/// Built-in administrative servant.
pub mod admin;
/// The per-application container and servant loading boundary.
pub mod app;
/// Discovery/analytics collaborator boundary.
pub mod discovery;
/// Core error types.
pub mod error;
/// Phase-keyed filter chains.
pub mod filter;
/// Lifecycle states and the startup report.
pub mod lifecycle;
/// Lifecycle listeners and the notification hub.
pub mod listener;
/// Concurrent servant and adapter registries.
pub mod registry;
/// Servant skeletons and the handler contract.
pub mod servant;
/// Built-in call tracing filters.
pub mod trace;

pub use adapter::{Adapter, ConnectionService, TcpServantAdapter};
pub use admin::{AdminServant, ADMIN_SERVANT_NAME};
pub use app::{Application, EmptyLoader, ServantLoader};
pub use discovery::{LogPublisher, ServantPublisher};
pub use error::{CoreError, CoreResult};
pub use filter::{CallContext, Filter, FilterChains, FilterKind};
pub use lifecycle::{AppState, PhaseOutcome, PhaseStatus, StartupPhase, StartupReport};
pub use listener::{AppListener, AppStartedEvent, ListenerHub, ServantStartedEvent};
pub use registry::{AdapterRegistry, SkeletonRegistry};
pub use servant::{ApiDescriptor, ServantHandler, ServantSkeleton, UNBOUNDED_LOAD};
