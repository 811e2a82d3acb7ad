use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_stream::{StreamExt, wrappers::IntervalStream};
use tracing::{error, info};

use crate::client::ResourceClient;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::models::ResourceKind;
use crate::store::{ApplyOutcome, Snapshot, SnapshotStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
  Applied,
  /// Fetch failed; the previous value is kept.
  Failed,
  /// A newer ticket already wrote the field.
  Stale,
  /// The store was torn down while the request was in flight.
  Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
  pub ticket: u64,
  pub jobs: RefreshOutcome,
  pub engines: RefreshOutcome,
  pub logs: RefreshOutcome,
  pub stats: RefreshOutcome,
}

impl TickReport {
  pub fn outcome(&self, kind: ResourceKind) -> RefreshOutcome {
    match kind {
      ResourceKind::Jobs => self.jobs,
      ResourceKind::Engines => self.engines,
      ResourceKind::Logs => self.logs,
      ResourceKind::Stats => self.stats,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Idle,
  Polling,
}

struct MonitorInner {
  client: ResourceClient,
  store: SnapshotStore,
  diagnostics: Diagnostics,
  in_flight: AtomicUsize,
}

/// Shared handle tying the resource client to the snapshot store.
#[derive(Clone)]
pub struct Monitor {
  inner: Arc<MonitorInner>,
}

impl Monitor {
  pub fn new(client: ResourceClient) -> Self {
    Self {
      inner: Arc::new(MonitorInner {
        client,
        store: SnapshotStore::new(),
        diagnostics: Diagnostics::new(),
        in_flight: AtomicUsize::new(0),
      }),
    }
  }

  pub fn client(&self) -> &ResourceClient {
    &self.inner.client
  }

  pub fn store(&self) -> &SnapshotStore {
    &self.inner.store
  }

  pub fn diagnostics(&self) -> &Diagnostics {
    &self.inner.diagnostics
  }

  pub fn snapshot(&self) -> Snapshot {
    self.inner.store.snapshot()
  }

  pub fn phase(&self) -> Phase {
    if self.inner.in_flight.load(Ordering::SeqCst) == 0 {
      Phase::Idle
    } else {
      Phase::Polling
    }
  }

  /// One tick: all four resources fetched concurrently under a single ticket.
  pub async fn poll_once(&self) -> TickReport {
    let _in_flight = InFlight::enter(&self.inner.in_flight);
    let ticket = self.store().issue_ticket();
    let (jobs, engines, logs, stats) = futures::join!(
      self.refresh(ResourceKind::Jobs, ticket),
      self.refresh(ResourceKind::Engines, ticket),
      self.refresh(ResourceKind::Logs, ticket),
      self.refresh(ResourceKind::Stats, ticket),
    );
    TickReport { ticket, jobs, engines, logs, stats }
  }

  /// Out-of-band refresh of the jobs list, ordered against ticks by its own ticket.
  pub async fn refresh_jobs(&self) -> RefreshOutcome {
    let ticket = self.store().issue_ticket();
    self.refresh(ResourceKind::Jobs, ticket).await
  }

  async fn refresh(&self, kind: ResourceKind, ticket: u64) -> RefreshOutcome {
    let payload = match self.client().fetch(kind).await {
      Ok(payload) => payload,
      Err(e) => {
        self.diagnostics().emit(Diagnostic::FetchFailed {
          kind,
          ticket,
          cause: format!("{:#}", anyhow::Error::from(e.source)),
        });
        return RefreshOutcome::Failed;
      }
    };

    for violation in payload.violations {
      self.diagnostics().emit(Diagnostic::ContractViolation(violation));
    }

    match self.store().apply(ticket, payload.resource) {
      ApplyOutcome::Applied => RefreshOutcome::Applied,
      ApplyOutcome::Stale { latest } => {
        self.diagnostics().emit(Diagnostic::StaleDiscarded { kind, ticket, latest });
        RefreshOutcome::Stale
      }
      ApplyOutcome::TornDown => {
        self.diagnostics().emit(Diagnostic::DiscardedAfterTeardown { kind, ticket });
        RefreshOutcome::Discarded
      }
    }
  }
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
  fn enter(counter: &'a AtomicUsize) -> Self {
    counter.fetch_add(1, Ordering::SeqCst);
    Self(counter)
  }
}

impl Drop for InFlight<'_> {
  fn drop(&mut self) {
    self.0.fetch_sub(1, Ordering::SeqCst);
  }
}

/// Drives [`Monitor::poll_once`] on a fixed period until stopped.
pub struct PollingController {
  monitor: Monitor,
  period: Duration,
}

impl PollingController {
  pub fn new(monitor: Monitor, period: Duration) -> Self {
    Self { monitor, period }
  }

  /// Spawns the tick loop on the current runtime. The first tick fires immediately.
  pub fn start(self) -> PollingHandle {
    let (stop_tx, stop_rx) = oneshot::channel();
    let task = tokio::spawn(run_ticks(self.monitor.clone(), self.period, stop_rx));
    PollingHandle {
      monitor: self.monitor,
      stop_tx: Some(stop_tx),
      task: Some(task),
    }
  }
}

async fn run_ticks(monitor: Monitor, period: Duration, mut stop: oneshot::Receiver<()>) {
  let mut interval = tokio::time::interval(period);
  interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
  let mut ticks = IntervalStream::new(interval);
  // Each tick runs as its own task so a slow cycle never delays the next one.
  let mut in_flight = JoinSet::new();

  info!(period_ms = period.as_millis() as u64, "polling started");
  loop {
    tokio::select! {
      _ = &mut stop => break,
      Some(_) = ticks.next() => {
        let monitor = monitor.clone();
        in_flight.spawn(async move { monitor.poll_once().await });
      }
      Some(joined) = in_flight.join_next() => {
        if let Err(e) = joined {
          if e.is_panic() {
            error!(error = %e, "poll tick panicked");
          }
        }
      }
    }
  }
  in_flight.abort_all();
  info!("polling stopped");
}

/// Owned by the dashboard's lifecycle. Dropping it stops polling and tears the
/// store down, same as [`PollingHandle::stop`].
pub struct PollingHandle {
  monitor: Monitor,
  stop_tx: Option<oneshot::Sender<()>>,
  task: Option<JoinHandle<()>>,
}

impl PollingHandle {
  pub fn monitor(&self) -> &Monitor {
    &self.monitor
  }

  pub fn phase(&self) -> Phase {
    self.monitor.phase()
  }

  pub async fn stop(mut self) {
    if let Some(stop_tx) = self.stop_tx.take() {
      let _ = stop_tx.send(());
    }
    if let Some(task) = self.task.take() {
      if let Err(e) = task.await {
        error!(error = %e, "polling task ended abnormally");
      }
    }
    self.monitor.store().tear_down();
  }
}

impl Drop for PollingHandle {
  fn drop(&mut self) {
    if let Some(task) = self.task.take() {
      task.abort();
      self.monitor.store().tear_down();
    }
  }
}
