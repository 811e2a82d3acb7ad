//! In-memory backend speaking the dashboard's REST contract.
//!
//! Serves demos through the `mrdash_stub` binary and stands in for the real
//! coordinator in integration tests, with failure injection, scripted delays
//! and request counters.

use std::collections::{HashMap, HashSet, VecDeque};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;
use warp::Filter;

use crate::models::{
  BalancingStrategy, Engine, EngineRole, EngineStatus, Job, JobStatus, LogEntry, ResourceKind, Stats, WordCount,
};

pub mod cluster;
pub mod jobs;

const MIN_SHARD_WORDS: usize = 100;
const MAX_LOGS_KEPT: usize = 200;
const LOGS_SERVED: usize = 50;
const TOP_WORDS: usize = 10;

struct StoredJob {
  job: Job,
  text: String,
}

#[derive(Default)]
struct StubState {
  jobs: Vec<StoredJob>,
  engines: Vec<Engine>,
  logs: Vec<LogEntry>,
  failing: HashSet<ResourceKind>,
  reject_submissions: bool,
  jobs_delays: VecDeque<Duration>,
  raw_extras: HashMap<ResourceKind, Vec<Value>>,
  requests: HashMap<ResourceKind, usize>,
  submissions: usize,
  last_strategy: Option<BalancingStrategy>,
}

impl StubState {
  fn add_log(&mut self, message: String) {
    info!("{}", message);
    self.logs.push(LogEntry { timestamp: Utc::now(), message });
    if self.logs.len() > MAX_LOGS_KEPT {
      let excess = self.logs.len() - MAX_LOGS_KEPT;
      self.logs.drain(..excess);
    }
  }

  fn stats(&self) -> Stats {
    let mappers = self.engines.iter().filter(|e| e.role == EngineRole::Mapper).count() as u64;
    let unfinished = |status: JobStatus| self.jobs.iter().filter(|s| s.job.status == status).count() as u64;
    Stats {
      total_engines: self.engines.len() as u64,
      mappers,
      reducers: self.engines.len() as u64 - mappers,
      map_queue_size: unfinished(JobStatus::Map),
      reduce_queue_size: unfinished(JobStatus::Reduce),
      total_jobs: self.jobs.len() as u64,
      active_jobs: self.jobs.iter().filter(|s| !s.job.status.is_completed()).count() as u64,
    }
  }
}

/// Body of one GET response and how long to hold it back.
pub(crate) struct Served {
  pub body: Value,
  pub delay: Option<Duration>,
}

#[derive(Clone, Default)]
pub struct StubBackend {
  state: Arc<Mutex<StubState>>,
}

impl StubBackend {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn register_engine(&self, engine_id: &str, role: EngineRole, capacity: u32) {
    let mut state = self.state.lock().await;
    state.engines.retain(|e| e.engine_id != engine_id);
    state.engines.push(Engine {
      engine_id: engine_id.to_string(),
      role,
      status: EngineStatus::Idle,
      current_load: 0,
      capacity,
      last_seen: Some(Utc::now()),
    });
    let role_name = match role {
      EngineRole::Mapper => "mapper",
      EngineRole::Reducer => "reducer",
    };
    state.add_log(format!("Engine {} registered as {} with capacity {}", engine_id, role_name, capacity));
  }

  /// Splits `text` into shards the way the coordinator does and queues a new job.
  pub async fn create_job(&self, text: &str, strategy: BalancingStrategy) -> String {
    let word_count = words(text).count();
    let shard_size = MIN_SHARD_WORDS.max(word_count / 4);
    let num_shards = word_count.div_ceil(shard_size) as u32;
    let job_id = Uuid::new_v4().to_string();

    let mut state = self.state.lock().await;
    state.last_strategy = Some(strategy);
    state.jobs.push(StoredJob {
      job: Job {
        job_id: job_id.clone(),
        text_length: text.chars().count() as u64,
        num_shards,
        status: JobStatus::Map,
        top_words: None,
        created_at: Utc::now(),
        completed_at: None,
        duration_seconds: None,
      },
      text: text.to_string(),
    });
    state.add_log(format!("Job {} created with {} shards", job_id, num_shards));
    job_id
  }

  /// Moves every unfinished job one stage forward, finishing word counts on completion.
  pub async fn advance(&self) {
    let mut state = self.state.lock().await;
    let mut messages = Vec::new();
    for stored in state.jobs.iter_mut() {
      let Some(next) = stored.job.status.next() else {
        continue;
      };
      stored.job.status = next;
      if next.is_completed() {
        let now = Utc::now();
        stored.job.top_words = Some(top_words(&stored.text));
        stored.job.completed_at = Some(now);
        stored.job.duration_seconds =
          Some((now - stored.job.created_at).num_milliseconds() as f64 / 1000.0);
        messages.push(format!("Job {} completed", stored.job.job_id));
      } else {
        messages.push(format!("Job {} moved to {:?}", stored.job.job_id, next));
      }
    }

    let in_phase = |status: JobStatus| state.jobs.iter().filter(|s| s.job.status == status).count() as u32;
    let (mapping, reducing) = (in_phase(JobStatus::Map) + in_phase(JobStatus::Shuffle), in_phase(JobStatus::Reduce));
    for engine in state.engines.iter_mut() {
      let demand = match engine.role {
        EngineRole::Mapper => mapping,
        EngineRole::Reducer => reducing,
      };
      engine.current_load = demand.min(engine.capacity);
      engine.status = if demand > 0 { EngineStatus::Active } else { EngineStatus::Idle };
      engine.last_seen = Some(Utc::now());
    }

    for message in messages {
      state.add_log(message);
    }
  }

  pub async fn set_failing(&self, kind: ResourceKind, failing: bool) {
    let mut state = self.state.lock().await;
    if failing {
      state.failing.insert(kind);
    } else {
      state.failing.remove(&kind);
    }
  }

  pub async fn set_rejecting_submissions(&self, rejecting: bool) {
    self.state.lock().await.reject_submissions = rejecting;
  }

  /// Delays for the next `GET /jobs` responses, consumed one per request. The
  /// body is captured when the request arrives, before the delay.
  pub async fn script_jobs_delays<I: IntoIterator<Item = Duration>>(&self, delays: I) {
    self.state.lock().await.jobs_delays.extend(delays);
  }

  /// Appends a raw, possibly malformed, element to a list resource.
  pub async fn inject_raw(&self, kind: ResourceKind, item: Value) {
    self.state.lock().await.raw_extras.entry(kind).or_default().push(item);
  }

  pub async fn request_count(&self, kind: ResourceKind) -> usize {
    self.state.lock().await.requests.get(&kind).copied().unwrap_or(0)
  }

  /// `POST /jobs` requests received, accepted or not.
  pub async fn submission_count(&self) -> usize {
    self.state.lock().await.submissions
  }

  pub async fn last_strategy(&self) -> Option<BalancingStrategy> {
    self.state.lock().await.last_strategy
  }

  /// Counts an incoming `POST /jobs` and reports whether it should be accepted.
  pub(crate) async fn accept_submission(&self) -> bool {
    let mut state = self.state.lock().await;
    state.submissions += 1;
    !state.reject_submissions
  }

  pub(crate) async fn serve(&self, kind: ResourceKind) -> Option<Served> {
    let mut state = self.state.lock().await;
    *state.requests.entry(kind).or_insert(0) += 1;
    if state.failing.contains(&kind) {
      return None;
    }

    let delay = match kind {
      ResourceKind::Jobs => state.jobs_delays.pop_front(),
      _ => None,
    };
    let body = match kind {
      ResourceKind::Jobs => {
        let jobs: Vec<&Job> = state.jobs.iter().map(|s| &s.job).collect();
        serde_json::to_value(jobs)
      }
      ResourceKind::Engines => serde_json::to_value(&state.engines),
      ResourceKind::Logs => {
        let start = state.logs.len().saturating_sub(LOGS_SERVED);
        serde_json::to_value(&state.logs[start..])
      }
      ResourceKind::Stats => serde_json::to_value(state.stats()),
    }
    .unwrap_or(Value::Null);

    let body = match (body, state.raw_extras.get(&kind)) {
      (Value::Array(mut items), Some(extras)) => {
        items.extend(extras.iter().cloned());
        Value::Array(items)
      }
      (body, _) => body,
    };
    Some(Served { body, delay })
  }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
  text
    .split(|c: char| !(c.is_alphanumeric() || c == '_'))
    .filter(|w| !w.is_empty())
    .map(|w| w.to_lowercase())
}

fn top_words(text: &str) -> Vec<WordCount> {
  let mut counts: HashMap<String, u64> = HashMap::new();
  for word in words(text) {
    *counts.entry(word).or_insert(0) += 1;
  }
  let mut ranked: Vec<WordCount> = counts.into_iter().map(|(word, count)| WordCount { word, count }).collect();
  ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
  ranked.truncate(TOP_WORDS);
  ranked
}

fn with_backend(backend: StubBackend) -> impl Filter<Extract = (StubBackend,), Error = Infallible> + Clone {
  warp::any().map(move || backend.clone())
}

pub fn routes(backend: StubBackend) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
  warp::path("api").and(
    jobs::list_route(backend.clone())
      .or(jobs::create_route(backend.clone()))
      .or(cluster::routes(backend)),
  )
}
