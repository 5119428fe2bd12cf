//! Quay host process: boots every configured application container, keeps
//! serving until a shutdown signal arrives, then stops each application.
//!
//! A single application failing to boot is logged and left unavailable; the
//! process keeps hosting the others.

use anyhow::Result;
use clap::{Arg, Command};
use quay_core::{
    AppListener, AppStartedEvent, Application, LogPublisher, ServantStartedEvent,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod protocol;
mod servants;

use config::{AppBootConfig, NodeConfig};
use protocol::LineConnectionService;
use servants::DeclaredServantLoader;

/// Logs lifecycle milestones of every hosted application.
struct LoggingListener;

impl AppListener for LoggingListener {
    fn on_app_started(&self, event: &AppStartedEvent) {
        info!(
            app = %event.app().name(),
            servants = event.app().servant_count(),
            "application started"
        );
    }

    fn on_servant_started(&self, event: &ServantStartedEvent) {
        info!(app = %event.app, servant = %event.servant, "servant serving");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("quay-node")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Multi-application Quay RPC server host")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Host configuration file")
                .default_value("quay.toml"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("FILTER")
                .help("Log filter, e.g. 'info' or 'quay_core=debug'")
                .default_value("info"),
        )
        .get_matches();

    let log_filter = matches.get_one::<String>("log-level").unwrap();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(log_filter)?)
        .init();

    let config_path = PathBuf::from(matches.get_one::<String>("config").unwrap());
    let node_config = NodeConfig::load(&config_path)?;
    if node_config.applications.is_empty() {
        warn!(config = %config_path.display(), "no applications configured");
    }

    info!(
        applications = node_config.applications.len(),
        config = %config_path.display(),
        "starting quay host"
    );

    let mut apps: Vec<Arc<Application>> = Vec::new();
    for boot in &node_config.applications {
        match boot_application(boot).await {
            Ok(app) => apps.push(app),
            Err(e) => error!(app = %boot.name, error = %e, "application configuration rejected"),
        }
    }

    signal::ctrl_c().await?;
    info!("shutdown signal received");

    for app in &apps {
        if let Err(e) = app.stop().await {
            error!(app = %app.name(), error = %e, "application did not stop cleanly");
        }
    }
    info!("quay host stopped");
    Ok(())
}

/// Builds and initializes one application container.
///
/// Returns `Err` only for configuration errors; startup failures are
/// recorded in the container's report and leave the application
/// unavailable without aborting the host.
async fn boot_application(boot: &AppBootConfig) -> Result<Arc<Application>> {
    let server_config = Arc::new(boot.server_config()?);
    let service = Arc::new(LineConnectionService::new());

    let app = Application::new(
        &boot.name,
        server_config,
        Box::new(DeclaredServantLoader::new(boot.servant_names())),
        Arc::new(LogPublisher),
        service.clone(),
    );
    service.attach(&app);
    app.subscribe(Arc::new(LoggingListener));
    app.load_default_filters();

    let report = app.clone().init().await;
    if report.succeeded() {
        for advisory in report.advisories() {
            warn!(app = %app.name(), advisory, "startup degraded");
        }
        for servant in app.servant_names() {
            app.notify_servant_started(&servant);
        }
    } else {
        error!(app = %app.name(), report = %report, "application failed to start");
    }
    Ok(app)
}
