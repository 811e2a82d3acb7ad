//! Pure projections of a [`Snapshot`](crate::store::Snapshot) for presentation.
//! Nothing here holds on to the data it is given.

use chrono::{DateTime, Utc};

use crate::models::{Engine, EngineRole, EngineStatus, Job, JobStatus, WordCount};

/// Returned by [`load_percentage`] for engines reporting zero capacity.
pub const ZERO_CAPACITY_LOAD: f64 = 0.0;

#[derive(Debug, Default, PartialEq)]
pub struct EngineGroups<'a> {
  pub mappers: Vec<&'a Engine>,
  pub reducers: Vec<&'a Engine>,
}

/// Partitions engines by role, keeping input order within each group.
pub fn group_engines_by_role(engines: &[Engine]) -> EngineGroups<'_> {
  let mut groups = EngineGroups::default();
  for engine in engines {
    match engine.role {
      EngineRole::Mapper => groups.mappers.push(engine),
      EngineRole::Reducer => groups.reducers.push(engine),
    }
  }
  groups
}

/// Most recently submitted first. Storage order is the backend's insertion
/// order, so this is a plain reverse and never consults timestamps.
pub fn order_jobs_for_display(jobs: &[Job]) -> Vec<&Job> {
  jobs.iter().rev().collect()
}

/// `100 * current_load / capacity`, or [`ZERO_CAPACITY_LOAD`] when capacity is 0.
/// Overloaded engines report more than 100.
pub fn load_percentage(engine: &Engine) -> f64 {
  if engine.capacity == 0 {
    return ZERO_CAPACITY_LOAD;
  }
  100.0 * f64::from(engine.current_load) / f64::from(engine.capacity)
}

/// Load percentage clamped for a gauge.
pub fn bar_percentage(engine: &Engine) -> u16 {
  load_percentage(engine).clamp(0.0, 100.0).round() as u16
}

pub fn status_label(status: JobStatus) -> &'static str {
  match status {
    JobStatus::Map => "MAP",
    JobStatus::Shuffle => "SHUFFLE",
    JobStatus::Reduce => "REDUCE",
    JobStatus::Completed => "COMPLETED",
  }
}

pub fn status_color_class(status: JobStatus) -> &'static str {
  match status {
    JobStatus::Map => "status-map",
    JobStatus::Shuffle => "status-shuffle",
    JobStatus::Reduce => "status-reduce",
    JobStatus::Completed => "status-done",
  }
}

pub fn engine_status_class(status: EngineStatus) -> &'static str {
  match status {
    EngineStatus::Active => "engine-active",
    EngineStatus::Idle => "engine-idle",
  }
}

/// Top words are only ever shown for completed jobs, whatever the payload says.
pub fn top_words_for_display(job: &Job) -> Option<&[WordCount]> {
  if !job.status.is_completed() {
    return None;
  }
  job.top_words.as_deref()
}

pub fn format_duration(seconds: Option<f64>) -> String {
  match seconds {
    Some(s) => format!("{:.2}s", s),
    None => "N/A".to_string(),
  }
}

pub fn short_job_id(job: &Job) -> &str {
  match job.job_id.char_indices().nth(8) {
    Some((end, _)) => &job.job_id[..end],
    None => &job.job_id,
  }
}

pub fn format_clock(timestamp: &DateTime<Utc>) -> String {
  timestamp.format("%H:%M:%S").to_string()
}
