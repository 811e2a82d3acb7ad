use std::path::Path;

use tracing::{error, info};

use crate::error::{DashError, Result};
use crate::models::{BalancingStrategy, NewJob};
use crate::poller::Monitor;

const SAMPLE_PARAGRAPH: &str = "The quick brown fox jumps over the lazy dog. The dog was really lazy and did not chase the fox. \
The fox was very quick and clever. It jumped high over the dog. The brown fox is a common sight in many forests. \
Dogs are loyal animals and they love to play. The lazy dog finally got up and started to run. \
However, the quick fox was already gone. This story teaches us about the importance of being quick and alert. \
The fox and the dog represent different personalities. Some people are like the quick fox, always ready to act. \
Others are like the lazy dog, preferring to rest. Both have their place in the world.";

pub fn validate_text(text: &str) -> Result<()> {
  if text.trim().is_empty() {
    return Err(DashError::Validation("job text must not be empty".into()));
  }
  Ok(())
}

/// Creates a job on the backend and refreshes the jobs list right away.
///
/// Blank text fails before any request is made. Nothing is retried.
pub async fn submit(monitor: &Monitor, text: &str, strategy: BalancingStrategy) -> Result<String> {
  validate_text(text)?;

  let new_job = NewJob {
    text: text.to_string(),
    balancing_strategy: strategy,
  };
  let created = monitor.client().create_job(&new_job).await.map_err(|e| {
    error!(error = %e, "job submission failed");
    e
  })?;
  info!(job_id = %created.job_id, ?strategy, chars = text.len(), "job submitted");

  monitor.refresh_jobs().await;
  Ok(created.job_id)
}

/// Text used by the "load sample" action.
pub fn sample_text() -> String {
  SAMPLE_PARAGRAPH.repeat(5)
}

pub fn load_text_file(path: &Path) -> std::io::Result<String> {
  std::fs::read_to_string(path)
}
