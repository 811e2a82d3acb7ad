mod common;

use std::time::{Duration, Instant};

use mrdash::diagnostics::Diagnostic;
use mrdash::models::{BalancingStrategy, EngineRole, JobStatus, ResourceKind};
use mrdash::poller::{Phase, PollingController, RefreshOutcome};
use serde_json::json;

use common::{TEST_TIMEOUT, drain, monitor_for, spawn_stub, stub_and_monitor};

#[tokio::test]
async fn poll_fills_every_field() {
  let (backend, monitor) = stub_and_monitor().await;
  backend.register_engine("mapper-1", EngineRole::Mapper, 4).await;
  backend.register_engine("reducer-1", EngineRole::Reducer, 2).await;
  backend.create_job("the quick brown fox", BalancingStrategy::RoundRobin).await;

  let report = monitor.poll_once().await;
  for kind in ResourceKind::ALL {
    assert_eq!(report.outcome(kind), RefreshOutcome::Applied, "{} not applied", kind);
  }

  let snapshot = monitor.snapshot();
  assert_eq!(snapshot.jobs.len(), 1);
  assert_eq!(snapshot.engines.len(), 2);
  assert_eq!(snapshot.logs.len(), 3);
  assert_eq!(snapshot.logs[0].message, "Engine mapper-1 registered as mapper with capacity 4");
  let stats = snapshot.stats.unwrap();
  assert_eq!(stats.total_engines, 2);
  assert_eq!(stats.total_jobs, 1);
  assert_eq!(stats.active_jobs, 1);
  assert_eq!(monitor.phase(), Phase::Idle);
}

#[tokio::test]
async fn failed_resource_keeps_previous_value_while_others_update() {
  let (backend, monitor) = stub_and_monitor().await;
  backend.register_engine("mapper-1", EngineRole::Mapper, 4).await;
  monitor.poll_once().await;
  let before = monitor.snapshot();

  backend.set_failing(ResourceKind::Engines, true).await;
  backend.register_engine("mapper-2", EngineRole::Mapper, 4).await;
  backend.create_job("hello world", BalancingStrategy::RoundRobin).await;

  let mut diagnostics = monitor.diagnostics().subscribe();
  let report = monitor.poll_once().await;
  assert_eq!(report.engines, RefreshOutcome::Failed);
  assert_eq!(report.jobs, RefreshOutcome::Applied);
  assert_eq!(report.logs, RefreshOutcome::Applied);
  assert_eq!(report.stats, RefreshOutcome::Applied);

  let after = monitor.snapshot();
  assert_eq!(*after.engines, *before.engines);
  assert_eq!(after.engines.len(), 1);
  assert_eq!(after.jobs.len(), 1);
  assert!(after.logs.len() > before.logs.len());
  assert_eq!(after.stats.unwrap().total_engines, 2);

  let events = drain(&mut diagnostics);
  assert_eq!(events.len(), 1);
  match &events[0] {
    Diagnostic::FetchFailed { kind, ticket, .. } => {
      assert_eq!(*kind, ResourceKind::Engines);
      assert_eq!(*ticket, report.ticket);
    }
    other => panic!("unexpected diagnostic {:?}", other),
  }
}

#[tokio::test]
async fn older_tick_completing_last_does_not_overwrite_newer_jobs() {
  let (backend, monitor) = stub_and_monitor().await;
  backend.create_job("first job", BalancingStrategy::RoundRobin).await;
  backend.script_jobs_delays([Duration::from_millis(400)]).await;

  let slow_monitor = monitor.clone();
  let slow_tick = tokio::spawn(async move { slow_monitor.poll_once().await });
  tokio::time::sleep(Duration::from_millis(150)).await;
  assert_eq!(monitor.phase(), Phase::Polling);

  backend.create_job("second job", BalancingStrategy::RoundRobin).await;
  let mut diagnostics = monitor.diagnostics().subscribe();
  assert_eq!(monitor.refresh_jobs().await, RefreshOutcome::Applied);
  assert_eq!(monitor.snapshot().jobs.len(), 2);

  let report = slow_tick.await.unwrap();
  assert_eq!(report.jobs, RefreshOutcome::Stale);
  assert_eq!(monitor.snapshot().jobs.len(), 2);
  assert!(monitor.store().version(ResourceKind::Jobs) > report.ticket);
  assert!(
    drain(&mut diagnostics)
      .iter()
      .any(|d| matches!(d, Diagnostic::StaleDiscarded { kind: ResourceKind::Jobs, ticket, .. } if *ticket == report.ticket))
  );
  assert_eq!(monitor.phase(), Phase::Idle);
}

#[tokio::test]
async fn malformed_entity_is_dropped_and_reported() {
  let (backend, monitor) = stub_and_monitor().await;
  backend.create_job("good job", BalancingStrategy::RoundRobin).await;
  backend
    .inject_raw(
      ResourceKind::Jobs,
      json!({
        "job_id": "bad-1",
        "status": "exploded",
        "text_length": 3,
        "num_shards": 1,
        "created_at": "2024-05-01T12:00:00+00:00"
      }),
    )
    .await;
  backend
    .inject_raw(ResourceKind::Engines, json!({"engine_id": "combiner-1", "role": "combiner", "status": "idle", "current_load": 0, "capacity": 1}))
    .await;

  let mut diagnostics = monitor.diagnostics().subscribe();
  let report = monitor.poll_once().await;
  assert_eq!(report.jobs, RefreshOutcome::Applied);
  assert_eq!(report.engines, RefreshOutcome::Applied);

  let snapshot = monitor.snapshot();
  assert_eq!(snapshot.jobs.len(), 1);
  assert!(snapshot.engines.is_empty());

  let violations: Vec<_> = drain(&mut diagnostics)
    .into_iter()
    .filter_map(|d| match d {
      Diagnostic::ContractViolation(v) => Some(v),
      _ => None,
    })
    .collect();
  assert_eq!(violations.len(), 2);
  assert!(violations.iter().any(|v| v.kind == ResourceKind::Jobs && v.entity_id.as_deref() == Some("bad-1")));
  assert!(violations.iter().any(|v| v.kind == ResourceKind::Engines && v.entity_id.as_deref() == Some("combiner-1")));
}

#[tokio::test]
async fn backend_status_spellings_are_kept() {
  let (backend, monitor) = stub_and_monitor().await;
  for (id, status) in [("r-1", "reduciendo"), ("c-1", "completada")] {
    backend
      .inject_raw(
        ResourceKind::Jobs,
        json!({
          "job_id": id,
          "status": status,
          "text_length": 5,
          "num_shards": 1,
          "created_at": "2024-05-01T12:00:00+00:00"
        }),
      )
      .await;
  }

  let mut diagnostics = monitor.diagnostics().subscribe();
  assert_eq!(monitor.poll_once().await.jobs, RefreshOutcome::Applied);

  let snapshot = monitor.snapshot();
  let statuses: Vec<(&str, JobStatus)> = snapshot.jobs.iter().map(|j| (j.job_id.as_str(), j.status)).collect();
  assert_eq!(statuses, vec![("r-1", JobStatus::Reduce), ("c-1", JobStatus::Completed)]);
  assert!(!drain(&mut diagnostics).iter().any(|d| matches!(d, Diagnostic::ContractViolation(_))));
}

#[tokio::test]
async fn slow_requests_are_bounded_by_the_timeout() {
  let backend = mrdash::routes::StubBackend::new();
  backend.script_jobs_delays([Duration::from_millis(800)]).await;
  let addr = spawn_stub(backend.clone()).await;
  let monitor = monitor_for(addr, Duration::from_millis(150));

  let mut diagnostics = monitor.diagnostics().subscribe();
  let started = Instant::now();
  let report = monitor.poll_once().await;
  assert_eq!(report.jobs, RefreshOutcome::Failed);
  assert_eq!(report.stats, RefreshOutcome::Applied);
  assert!(started.elapsed() < Duration::from_millis(700));

  let cause = drain(&mut diagnostics)
    .into_iter()
    .find_map(|d| match d {
      Diagnostic::FetchFailed { kind: ResourceKind::Jobs, cause, .. } => Some(cause),
      _ => None,
    })
    .unwrap();
  assert!(cause.contains("timed out"), "cause lost the timeout: {}", cause);
}

#[tokio::test]
async fn slow_tick_does_not_hold_back_the_next_ones() {
  let backend = mrdash::routes::StubBackend::new();
  backend.script_jobs_delays([Duration::from_millis(600)]).await;
  let addr = spawn_stub(backend.clone()).await;
  let monitor = monitor_for(addr, TEST_TIMEOUT);

  let handle = PollingController::new(monitor.clone(), Duration::from_millis(50)).start();
  tokio::time::sleep(Duration::from_millis(300)).await;

  // the first tick is still waiting on its jobs response
  assert_eq!(handle.phase(), Phase::Polling);
  let stats_polled = backend.request_count(ResourceKind::Stats).await;
  assert!(stats_polled >= 4, "only {} ticks ran behind the slow one", stats_polled);
  assert!(backend.request_count(ResourceKind::Jobs).await >= 4);
  assert!(monitor.store().version(ResourceKind::Stats) > 1);

  handle.stop().await;
}

#[tokio::test]
async fn controller_ticks_until_stopped_then_discards() {
  let backend = mrdash::routes::StubBackend::new();
  let addr = spawn_stub(backend.clone()).await;
  let monitor = monitor_for(addr, TEST_TIMEOUT);

  let handle = PollingController::new(monitor.clone(), Duration::from_millis(50)).start();
  tokio::time::sleep(Duration::from_millis(400)).await;
  handle.stop().await;
  // let requests already on the wire land before counting
  tokio::time::sleep(Duration::from_millis(50)).await;

  let polled = backend.request_count(ResourceKind::Jobs).await;
  assert!(polled >= 3, "only {} ticks ran", polled);
  assert!(monitor.store().is_torn_down());

  tokio::time::sleep(Duration::from_millis(200)).await;
  assert_eq!(backend.request_count(ResourceKind::Jobs).await, polled);
  assert_eq!(monitor.refresh_jobs().await, RefreshOutcome::Discarded);
}

#[tokio::test]
async fn dropping_the_handle_stops_polling() {
  let backend = mrdash::routes::StubBackend::new();
  let addr = spawn_stub(backend.clone()).await;
  let monitor = monitor_for(addr, TEST_TIMEOUT);

  let handle = PollingController::new(monitor.clone(), Duration::from_millis(50)).start();
  tokio::time::sleep(Duration::from_millis(120)).await;
  drop(handle);
  assert!(monitor.store().is_torn_down());
  tokio::time::sleep(Duration::from_millis(50)).await;

  let polled = backend.request_count(ResourceKind::Stats).await;
  tokio::time::sleep(Duration::from_millis(200)).await;
  assert_eq!(backend.request_count(ResourceKind::Stats).await, polled);
}
