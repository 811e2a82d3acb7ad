//! Structured channel for the failures the dashboard recovers from silently.
//!
//! Every event is logged through `tracing` and broadcast to subscribers, so
//! tests and tooling can observe failure handling without scraping logs.

use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::error::ContractViolation;
use crate::models::ResourceKind;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
  FetchFailed {
    kind: ResourceKind,
    ticket: u64,
    cause: String,
  },
  ContractViolation(ContractViolation),
  StaleDiscarded {
    kind: ResourceKind,
    ticket: u64,
    latest: u64,
  },
  DiscardedAfterTeardown {
    kind: ResourceKind,
    ticket: u64,
  },
}

#[derive(Clone)]
pub struct Diagnostics {
  tx: broadcast::Sender<Diagnostic>,
}

impl Diagnostics {
  pub fn new() -> Self {
    let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
    Self { tx }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<Diagnostic> {
    self.tx.subscribe()
  }

  pub fn emit(&self, event: Diagnostic) {
    match &event {
      Diagnostic::FetchFailed { kind, ticket, cause } => {
        warn!(%kind, ticket, cause = %cause, "fetch failed, keeping previous value");
      }
      Diagnostic::ContractViolation(violation) => {
        error!(
          kind = %violation.kind,
          index = violation.index,
          entity_id = violation.entity_id.as_deref().unwrap_or("unknown"),
          reason = %violation.reason,
          "data contract violation, entity dropped"
        );
      }
      Diagnostic::StaleDiscarded { kind, ticket, latest } => {
        debug!(%kind, ticket, latest, "discarding stale response");
      }
      Diagnostic::DiscardedAfterTeardown { kind, ticket } => {
        debug!(%kind, ticket, "store torn down, response discarded");
      }
    }
    // No subscribers is the normal case outside tests.
    let _ = self.tx.send(event);
  }
}

impl Default for Diagnostics {
  fn default() -> Self {
    Self::new()
  }
}
