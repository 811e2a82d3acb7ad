use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four resources the dashboard pulls from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
  Jobs,
  Engines,
  Logs,
  Stats,
}

impl ResourceKind {
  pub const ALL: [ResourceKind; 4] = [
    ResourceKind::Jobs,
    ResourceKind::Engines,
    ResourceKind::Logs,
    ResourceKind::Stats,
  ];

  pub fn path(&self) -> &'static str {
    match self {
      ResourceKind::Jobs => "jobs",
      ResourceKind::Engines => "engines",
      ResourceKind::Logs => "logs",
      ResourceKind::Stats => "stats",
    }
  }
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.path())
  }
}

/// Job lifecycle. Variants are declared in lifecycle order so `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
  Map,
  Shuffle,
  #[serde(alias = "reduciendo")]
  Reduce,
  #[serde(alias = "completada")]
  Completed,
}

impl JobStatus {
  pub fn next(self) -> Option<JobStatus> {
    match self {
      JobStatus::Map => Some(JobStatus::Shuffle),
      JobStatus::Shuffle => Some(JobStatus::Reduce),
      JobStatus::Reduce => Some(JobStatus::Completed),
      JobStatus::Completed => None,
    }
  }

  pub fn is_completed(self) -> bool {
    self == JobStatus::Completed
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
  pub word: String,
  pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
  pub job_id: String,
  pub text_length: u64,
  pub num_shards: u32,
  pub status: JobStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub top_words: Option<Vec<WordCount>>,
  pub created_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub completed_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineRole {
  Mapper,
  Reducer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
  Active,
  Idle,
}

/// A worker engine. `current_load <= capacity` is expected but not enforced here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engine {
  pub engine_id: String,
  pub role: EngineRole,
  pub status: EngineStatus,
  pub current_load: u32,
  pub capacity: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
  pub timestamp: DateTime<Utc>,
  pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
  pub total_engines: u64,
  pub mappers: u64,
  pub reducers: u64,
  pub map_queue_size: u64,
  pub reduce_queue_size: u64,
  pub total_jobs: u64,
  pub active_jobs: u64,
}

/// One freshly fetched resource, ready to replace its field in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
  Jobs(Vec<Job>),
  Engines(Vec<Engine>),
  Logs(Vec<LogEntry>),
  Stats(Stats),
}

impl Resource {
  pub fn kind(&self) -> ResourceKind {
    match self {
      Resource::Jobs(_) => ResourceKind::Jobs,
      Resource::Engines(_) => ResourceKind::Engines,
      Resource::Logs(_) => ResourceKind::Logs,
      Resource::Stats(_) => ResourceKind::Stats,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancingStrategy {
  #[default]
  RoundRobin,
  LeastLoaded,
}

impl BalancingStrategy {
  pub fn toggle(self) -> Self {
    match self {
      BalancingStrategy::RoundRobin => BalancingStrategy::LeastLoaded,
      BalancingStrategy::LeastLoaded => BalancingStrategy::RoundRobin,
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewJob {
  pub text: String,
  #[serde(default)]
  pub balancing_strategy: BalancingStrategy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobCreated {
  pub job_id: String,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn completed_status_accepts_backend_spelling() {
    let english: JobStatus = serde_json::from_value(json!("completed")).unwrap();
    let backend: JobStatus = serde_json::from_value(json!("completada")).unwrap();
    assert_eq!(english, JobStatus::Completed);
    assert_eq!(backend, JobStatus::Completed);
  }

  #[test]
  fn reduce_status_accepts_backend_spelling() {
    let backend: JobStatus = serde_json::from_value(json!("reduciendo")).unwrap();
    assert_eq!(backend, JobStatus::Reduce);
    assert_eq!(serde_json::to_value(backend).unwrap(), json!("reduce"));
  }

  #[test]
  fn unknown_status_is_rejected() {
    assert!(serde_json::from_value::<JobStatus>(json!("failed")).is_err());
  }

  #[test]
  fn lifecycle_is_strictly_ordered() {
    assert_eq!(JobStatus::Map.next(), Some(JobStatus::Shuffle));
    assert_eq!(JobStatus::Shuffle.next(), Some(JobStatus::Reduce));
    assert_eq!(JobStatus::Reduce.next(), Some(JobStatus::Completed));
    assert_eq!(JobStatus::Completed.next(), None);
    assert!(JobStatus::Map < JobStatus::Completed);
  }

  #[test]
  fn job_decodes_backend_payload() {
    let job: Job = serde_json::from_value(json!({
      "job_id": "7f1c",
      "status": "map",
      "text_length": 42,
      "num_shards": 1,
      "top_words": null,
      "created_at": "2024-05-01T12:00:00.123456+00:00",
      "completed_at": null,
      "duration_seconds": null
    }))
    .unwrap();
    assert_eq!(job.status, JobStatus::Map);
    assert!(job.top_words.is_none());
    assert!(job.duration_seconds.is_none());
  }

  #[test]
  fn strategy_serializes_as_wire_name() {
    let body = serde_json::to_value(NewJob {
      text: "a".into(),
      balancing_strategy: BalancingStrategy::LeastLoaded,
    })
    .unwrap();
    assert_eq!(body, json!({"text": "a", "balancing_strategy": "least_loaded"}));
  }
}
