use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{Engine, Job, LogEntry, Resource, ResourceKind, Stats};

/// Last-known values for the four resources. Fields are shared, so cloning a
/// snapshot is cheap and never copies the underlying lists.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
  pub jobs: Arc<Vec<Job>>,
  pub engines: Arc<Vec<Engine>>,
  pub logs: Arc<Vec<LogEntry>>,
  pub stats: Option<Arc<Stats>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
  Applied,
  /// A newer ticket already wrote this field.
  Stale { latest: u64 },
  TornDown,
}

#[derive(Debug, Default)]
struct FieldVersions {
  jobs: u64,
  engines: u64,
  logs: u64,
  stats: u64,
}

impl FieldVersions {
  fn get(&self, kind: ResourceKind) -> u64 {
    match kind {
      ResourceKind::Jobs => self.jobs,
      ResourceKind::Engines => self.engines,
      ResourceKind::Logs => self.logs,
      ResourceKind::Stats => self.stats,
    }
  }

  fn slot(&mut self, kind: ResourceKind) -> &mut u64 {
    match kind {
      ResourceKind::Jobs => &mut self.jobs,
      ResourceKind::Engines => &mut self.engines,
      ResourceKind::Logs => &mut self.logs,
      ResourceKind::Stats => &mut self.stats,
    }
  }
}

#[derive(Debug, Default)]
struct Inner {
  snapshot: Snapshot,
  versions: FieldVersions,
  torn_down: bool,
}

/// Owns the current [`Snapshot`].
///
/// Every poll tick and every out-of-band refresh takes a ticket from
/// [`SnapshotStore::issue_ticket`]. A field is only replaced by a response
/// carrying a newer ticket than the one that last wrote it, so a slow response
/// from an older tick can never overwrite data from a newer one.
#[derive(Debug, Default)]
pub struct SnapshotStore {
  next_ticket: AtomicU64,
  inner: RwLock<Inner>,
}

impl SnapshotStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Monotonic, starts at 1.
  pub fn issue_ticket(&self) -> u64 {
    self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1
  }

  pub fn apply(&self, ticket: u64, resource: Resource) -> ApplyOutcome {
    let mut inner = self.write();
    if inner.torn_down {
      return ApplyOutcome::TornDown;
    }
    let slot = inner.versions.slot(resource.kind());
    if ticket <= *slot {
      return ApplyOutcome::Stale { latest: *slot };
    }
    *slot = ticket;
    match resource {
      Resource::Jobs(jobs) => inner.snapshot.jobs = Arc::new(jobs),
      Resource::Engines(engines) => inner.snapshot.engines = Arc::new(engines),
      Resource::Logs(logs) => inner.snapshot.logs = Arc::new(logs),
      Resource::Stats(stats) => inner.snapshot.stats = Some(Arc::new(stats)),
    }
    ApplyOutcome::Applied
  }

  pub fn snapshot(&self) -> Snapshot {
    self.read().snapshot.clone()
  }

  /// Ticket that last wrote `kind`, 0 if never written.
  pub fn version(&self, kind: ResourceKind) -> u64 {
    self.read().versions.get(kind)
  }

  pub fn tear_down(&self) {
    self.write().torn_down = true;
  }

  pub fn is_torn_down(&self) -> bool {
    self.read().torn_down
  }

  // Writers never panic while holding the lock, but a poisoned lock still
  // holds a consistent snapshot since every write is a whole-field swap.
  fn read(&self) -> RwLockReadGuard<'_, Inner> {
    self.inner.read().unwrap_or_else(|e| e.into_inner())
  }

  fn write(&self) -> RwLockWriteGuard<'_, Inner> {
    self.inner.write().unwrap_or_else(|e| e.into_inner())
  }
}
