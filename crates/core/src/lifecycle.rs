//! Application lifecycle states and the structured startup report.
//!
//! Startup walks `Created → Loading → AdminInjected → ServantsInitialized →
//! Started`. A fatal load error short-circuits to `Failed`; an explicit
//! `stop()` takes a started application to `Stopped`. Instead of logging and
//! swallowing phase errors as its only signal, `init()` records every phase
//! outcome in a [`StartupReport`] the host can inspect.

use serde::Serialize;
use std::fmt;

/// Lifecycle state of one application container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AppState {
    /// Constructed, init() not yet invoked.
    Created,
    /// The application-specific servant load step is running.
    Loading,
    /// The built-in admin servant injection phase has completed (it may
    /// have degraded without the admin endpoint).
    AdminInjected,
    /// Every registered skeleton has gone through the discovery
    /// registration pass.
    ServantsInitialized,
    /// Startup completed; listeners have been notified.
    Started,
    /// Fatal startup failure; the application stays unavailable.
    Failed,
    /// Explicitly stopped.
    Stopped,
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppState::Created => write!(f, "created"),
            AppState::Loading => write!(f, "loading"),
            AppState::AdminInjected => write!(f, "admin-injected"),
            AppState::ServantsInitialized => write!(f, "servants-initialized"),
            AppState::Started => write!(f, "started"),
            AppState::Failed => write!(f, "failed"),
            AppState::Stopped => write!(f, "stopped"),
        }
    }
}

/// The startup phases recorded in a [`StartupReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StartupPhase {
    /// Application-specific servant loading.
    Load,
    /// Built-in admin servant injection.
    AdminInjection,
    /// Best-effort discovery registration of every skeleton.
    ServantRegistration,
    /// Listener notification of the app-started event.
    Notify,
}

impl StartupPhase {
    /// All phases in execution order.
    pub const ALL: [StartupPhase; 4] = [
        StartupPhase::Load,
        StartupPhase::AdminInjection,
        StartupPhase::ServantRegistration,
        StartupPhase::Notify,
    ];
}

impl fmt::Display for StartupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupPhase::Load => write!(f, "load"),
            StartupPhase::AdminInjection => write!(f, "admin-injection"),
            StartupPhase::ServantRegistration => write!(f, "servant-registration"),
            StartupPhase::Notify => write!(f, "notify"),
        }
    }
}

/// Outcome of one startup phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PhaseStatus {
    /// Phase completed cleanly.
    Ok,
    /// Phase degraded but startup continued; one message per tolerated
    /// failure.
    Advisory(Vec<String>),
    /// Phase failed fatally; startup was aborted.
    Fatal(String),
    /// Phase never ran because an earlier phase failed fatally.
    Skipped,
}

impl PhaseStatus {
    /// True for the fatal variant.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PhaseStatus::Fatal(_))
    }
}

/// One recorded phase outcome.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseOutcome {
    /// The phase this outcome belongs to.
    pub phase: StartupPhase,
    /// How the phase ended.
    pub status: PhaseStatus,
}

/// Structured record of one `init()` run.
#[derive(Debug, Clone, Serialize)]
pub struct StartupReport {
    app: String,
    outcomes: Vec<PhaseOutcome>,
}

impl StartupReport {
    /// Creates an empty report for the named application.
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            outcomes: Vec::new(),
        }
    }

    /// Application the report belongs to.
    pub fn app(&self) -> &str {
        &self.app
    }

    /// Records one phase outcome.
    pub fn record(&mut self, phase: StartupPhase, status: PhaseStatus) {
        self.outcomes.push(PhaseOutcome { phase, status });
    }

    /// Marks every not-yet-recorded phase as skipped, in phase order.
    pub fn skip_remaining(&mut self) {
        for phase in StartupPhase::ALL {
            if self.outcome(phase).is_none() {
                self.record(phase, PhaseStatus::Skipped);
            }
        }
    }

    /// Outcome recorded for `phase`, if it ran.
    pub fn outcome(&self, phase: StartupPhase) -> Option<&PhaseStatus> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.phase == phase)
            .map(|outcome| &outcome.status)
    }

    /// All recorded outcomes in execution order.
    pub fn outcomes(&self) -> &[PhaseOutcome] {
        &self.outcomes
    }

    /// True when no phase ended fatally.
    pub fn succeeded(&self) -> bool {
        !self.outcomes.iter().any(|outcome| outcome.status.is_fatal())
    }

    /// Advisory messages across all phases, in recording order.
    pub fn advisories(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match &outcome.status {
                PhaseStatus::Advisory(messages) => Some(messages),
                _ => None,
            })
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

impl fmt::Display for StartupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app '{}':", self.app)?;
        for outcome in &self.outcomes {
            match &outcome.status {
                PhaseStatus::Ok => write!(f, " {}=ok", outcome.phase)?,
                PhaseStatus::Advisory(messages) => {
                    write!(f, " {}=advisory({})", outcome.phase, messages.len())?
                }
                PhaseStatus::Fatal(reason) => {
                    write!(f, " {}=fatal({})", outcome.phase, reason)?
                }
                PhaseStatus::Skipped => write!(f, " {}=skipped", outcome.phase)?,
            }
        }
        Ok(())
    }
}
