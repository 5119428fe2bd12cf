//! Container lifecycle integration tests: startup sequencing, fault
//! tolerance, readiness gating, listener delivery and shutdown.

mod common;

use common::*;
use quay_core::{
    AppState, Application, CoreError, EmptyLoader, FilterKind, PhaseStatus, StartupPhase,
    ADMIN_SERVANT_NAME,
};
use std::sync::Arc;

fn plain_app(name: &str, adapter_entries: &[&str]) -> Arc<Application> {
    build_app(name, adapter_entries, Box::new(EmptyLoader))
}

#[tokio::test]
async fn failed_load_leaves_application_unavailable() {
    let app = build_app("broken", &[ADMIN_SERVANT_NAME], Box::new(FailingLoader));
    let report = app.clone().init().await;

    assert!(!report.succeeded());
    assert!(matches!(
        report.outcome(StartupPhase::Load),
        Some(PhaseStatus::Fatal(_))
    ));
    assert_eq!(
        report.outcome(StartupPhase::AdminInjection),
        Some(&PhaseStatus::Skipped)
    );
    assert_eq!(app.state(), AppState::Failed);
    assert!(!app.is_ready());

    // Every readiness-gated accessor fails with NotReady.
    assert!(matches!(
        app.servant(ADMIN_SERVANT_NAME),
        Err(CoreError::NotReady(_))
    ));
    assert!(matches!(
        app.filters(FilterKind::Server),
        Err(CoreError::NotReady(_))
    ));

    // Filter registration itself is not readiness-gated.
    app.load_default_filters();
    assert!(matches!(
        app.filters(FilterKind::Server),
        Err(CoreError::NotReady(_))
    ));
}

#[tokio::test]
async fn context_params_are_application_scoped() {
    let app = plain_app("parametrized", &[]);
    assert_eq!(app.param("region"), None);

    app.set_param("region", "eu-west");
    app.set_param("region", "us-east");
    assert_eq!(app.param("region"), Some("us-east".to_string()));
}

#[tokio::test]
async fn admin_injection_failure_is_tolerated() {
    // No adapter entry for the admin servant: injection must degrade, not fail.
    let app = plain_app("no-admin", &[]);
    let listener = Arc::new(RecordingListener::default());
    app.subscribe(listener.clone());

    let report = app.clone().init().await;

    assert!(report.succeeded());
    assert!(matches!(
        report.outcome(StartupPhase::AdminInjection),
        Some(PhaseStatus::Advisory(_))
    ));
    assert_eq!(app.state(), AppState::Started);
    assert!(app.is_ready());
    assert_eq!(listener.started_apps.lock().len(), 1);
}

#[tokio::test]
async fn empty_application_still_serves_the_admin_servant() {
    let app = plain_app("bare", &[ADMIN_SERVANT_NAME]);
    let report = app.clone().init().await;

    assert!(report.succeeded());
    assert_eq!(report.outcome(StartupPhase::AdminInjection), Some(&PhaseStatus::Ok));
    assert_eq!(app.state(), AppState::Started);

    // The admin servant is present under its reserved name.
    let admin = app.servant(ADMIN_SERVANT_NAME).unwrap();
    assert!(admin.is_some());

    // Unknown servant on a ready application is "not found", not NotReady.
    let missing = app.servant("unknown").unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn both_listeners_receive_the_same_application_once() {
    let app = plain_app("shared", &[ADMIN_SERVANT_NAME]);
    let first = Arc::new(RecordingListener::default());
    let second = Arc::new(RecordingListener::default());
    app.subscribe(first.clone());
    app.subscribe(second.clone());

    app.clone().init().await;

    let first_seen = first.started_apps.lock();
    let second_seen = second.started_apps.lock();
    assert_eq!(first_seen.len(), 1);
    assert_eq!(second_seen.len(), 1);
    assert!(Arc::ptr_eq(&first_seen[0], &app));
    assert!(Arc::ptr_eq(&second_seen[0], &app));
}

#[tokio::test]
async fn loaded_servants_are_published_and_reachable() {
    let publisher = Arc::new(RecordingPublisher::default());
    let app = Application::new(
        "calc-app",
        loopback_config("calc-app", &["calc", "clock", ADMIN_SERVANT_NAME]),
        Box::new(RegisterLoader {
            servants: vec!["calc".to_string(), "clock".to_string()],
        }),
        publisher.clone(),
        Arc::new(NoopConnectionService),
    );

    let report = app.clone().init().await;
    assert!(report.succeeded());
    assert_eq!(report.outcome(StartupPhase::ServantRegistration), Some(&PhaseStatus::Ok));

    let mut published = publisher.published.lock().clone();
    published.sort();
    assert_eq!(published, vec!["admin", "calc", "clock"]);

    let calc = app.servant("calc").unwrap().unwrap();
    let reply = calc.invoke("echo", b"21*2").await.unwrap();
    assert_eq!(reply, b"21*2");
}

#[tokio::test]
async fn publication_failures_stay_per_servant() {
    let app = Application::new(
        "flaky-discovery",
        loopback_config("flaky-discovery", &["calc"]),
        Box::new(RegisterLoader {
            servants: vec!["calc".to_string()],
        }),
        Arc::new(FailingPublisher),
        Arc::new(NoopConnectionService),
    );

    let report = app.clone().init().await;

    // Registration failures are advisory; the application still starts.
    assert!(report.succeeded());
    assert_eq!(app.state(), AppState::Started);
    match report.outcome(StartupPhase::ServantRegistration) {
        Some(PhaseStatus::Advisory(messages)) => {
            assert_eq!(messages.len(), 1);
            assert!(messages[0].contains("calc"));
        }
        other => panic!("expected advisory registration outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn stop_reaches_every_adapter_exactly_once() {
    for count in [0usize, 1, 5] {
        let app = plain_app("stoppable", &[]);
        let adapters: Vec<Arc<CountingAdapter>> = (0..count)
            .map(|i| {
                let adapter = Arc::new(CountingAdapter::new(&format!("servant-{i}")));
                app.register_adapter(&format!("servant-{i}"), adapter.clone());
                adapter
            })
            .collect();

        app.stop().await.unwrap();
        assert_eq!(app.state(), AppState::Stopped);
        for adapter in adapters {
            assert_eq!(adapter.stop_count(), 1);
        }
    }
}

#[tokio::test]
async fn failing_adapter_aborts_shutdown() {
    let app = plain_app("bad-shutdown", &[]);
    app.register_adapter("wedged", Arc::new(FailingAdapter::new("wedged")));

    let result = app.stop().await;
    assert!(matches!(result, Err(CoreError::Adapter(_))));
    assert_ne!(app.state(), AppState::Stopped);
}

#[tokio::test]
async fn servant_started_event_fires_outside_init() {
    let app = plain_app("eventful", &[]);
    let listener = Arc::new(RecordingListener::default());
    app.subscribe(listener.clone());

    app.notify_servant_started("calc");
    app.notify_servant_started("clock");

    assert_eq!(*listener.started_servants.lock(), vec!["calc", "clock"]);
    assert!(listener.started_apps.lock().is_empty());
}

#[tokio::test]
async fn default_filters_install_once_per_phase() {
    let app = plain_app("filtered", &[ADMIN_SERVANT_NAME]);
    app.load_default_filters();
    app.load_default_filters();

    app.clone().init().await;

    for kind in FilterKind::ALL {
        let chain = app.filters(kind).unwrap();
        assert_eq!(chain.len(), 1, "phase {kind} should have one trace filter");
    }
}

#[tokio::test]
async fn admin_servant_answers_diagnostics() {
    let app = plain_app("diagnosable", &[ADMIN_SERVANT_NAME]);
    let report = app.clone().init().await;
    assert!(report.succeeded());

    let admin = app.servant(ADMIN_SERVANT_NAME).unwrap().unwrap();

    let pong = admin.invoke("ping", b"").await.unwrap();
    assert_eq!(pong, b"pong");

    let status = String::from_utf8(admin.invoke("status", b"").await.unwrap()).unwrap();
    assert!(status.contains("\"state\":\"started\""));
    assert!(status.contains("\"ready\":true"));

    let servants = String::from_utf8(admin.invoke("servants", b"").await.unwrap()).unwrap();
    assert!(servants.contains(ADMIN_SERVANT_NAME));

    assert!(admin.invoke("reboot-universe", b"").await.is_err());
}

#[tokio::test]
async fn reregistered_servant_replaces_the_previous_binding() {
    let app = plain_app("replace", &["calc", ADMIN_SERVANT_NAME]);
    app.clone().init().await;

    app.register_servant("calc", Arc::new(EchoHandler), quay_core::UNBOUNDED_LOAD)
        .await
        .unwrap();
    let first = app.servant("calc").unwrap().unwrap();

    app.register_servant("calc", Arc::new(EchoHandler), quay_core::UNBOUNDED_LOAD)
        .await
        .unwrap();
    let second = app.servant("calc").unwrap().unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(app.servant_count(), 2); // calc + admin
}
