use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{ContractViolation, DashError, FetchError, Result};
use crate::models::{Engine, Job, JobCreated, LogEntry, NewJob, Resource, ResourceKind, Stats};

/// A decoded resource plus the entities that had to be dropped on the way.
#[derive(Debug)]
pub struct Payload {
  pub resource: Resource,
  pub violations: Vec<ContractViolation>,
}

/// Thin HTTP client for the backend REST contract. One request per call, no retries.
#[derive(Clone)]
pub struct ResourceClient {
  http: Client,
  api_base: Url,
}

impl ResourceClient {
  pub fn new(api_base: Url, timeout: Duration) -> Result<Self> {
    let http = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| DashError::Config(format!("failed to build HTTP client: {}", e)))?;
    Ok(Self { http, api_base })
  }

  pub fn api_base(&self) -> &Url {
    &self.api_base
  }

  fn url(&self, path: &str) -> Url {
    // `api_base` always ends in a slash, so joining a bare segment cannot fail.
    self.api_base.join(path).unwrap_or_else(|_| self.api_base.clone())
  }

  pub async fn fetch(&self, kind: ResourceKind) -> std::result::Result<Payload, FetchError> {
    debug!(%kind, "fetching resource");
    let response = self
      .http
      .get(self.url(kind.path()))
      .send()
      .await
      .and_then(|r| r.error_for_status())
      .map_err(|source| FetchError { kind, source })?;

    let payload = match kind {
      ResourceKind::Jobs => {
        let items: Vec<Value> = response.json().await.map_err(|source| FetchError { kind, source })?;
        let (jobs, violations) = decode_each::<Job>(kind, items, "job_id");
        Payload { resource: Resource::Jobs(jobs), violations }
      }
      ResourceKind::Engines => {
        let items: Vec<Value> = response.json().await.map_err(|source| FetchError { kind, source })?;
        let (engines, violations) = decode_each::<Engine>(kind, items, "engine_id");
        Payload { resource: Resource::Engines(engines), violations }
      }
      ResourceKind::Logs => {
        let logs: Vec<LogEntry> = response.json().await.map_err(|source| FetchError { kind, source })?;
        Payload { resource: Resource::Logs(logs), violations: vec![] }
      }
      ResourceKind::Stats => {
        let stats: Stats = response.json().await.map_err(|source| FetchError { kind, source })?;
        Payload { resource: Resource::Stats(stats), violations: vec![] }
      }
    };
    Ok(payload)
  }

  pub async fn create_job(&self, new_job: &NewJob) -> Result<JobCreated> {
    self
      .http
      .post(self.url(ResourceKind::Jobs.path()))
      .json(new_job)
      .send()
      .await
      .and_then(|r| r.error_for_status())
      .map_err(DashError::Submission)?
      .json::<JobCreated>()
      .await
      .map_err(DashError::Submission)
  }
}

/// Decodes list elements one by one so a single bad entity does not take down
/// the whole list.
fn decode_each<T: DeserializeOwned>(
  kind: ResourceKind,
  items: Vec<Value>,
  id_field: &str,
) -> (Vec<T>, Vec<ContractViolation>) {
  let mut decoded = Vec::with_capacity(items.len());
  let mut violations = Vec::new();
  for (index, item) in items.into_iter().enumerate() {
    let entity_id = item.get(id_field).and_then(|v| v.as_str()).map(str::to_string);
    match serde_json::from_value::<T>(item) {
      Ok(entity) => decoded.push(entity),
      Err(e) => violations.push(ContractViolation {
        kind,
        index,
        entity_id,
        reason: e.to_string(),
      }),
    }
  }
  (decoded, violations)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn bad_entities_are_dropped_individually() {
    let items = vec![
      json!({"engine_id": "mapper-1", "role": "mapper", "status": "active", "current_load": 1, "capacity": 4}),
      json!({"engine_id": "combiner-1", "role": "combiner", "status": "idle", "current_load": 0, "capacity": 4}),
      json!({"engine_id": "reducer-1", "role": "reducer", "status": "idle", "current_load": 0, "capacity": 2}),
    ];
    let (engines, violations) = decode_each::<Engine>(ResourceKind::Engines, items, "engine_id");
    assert_eq!(engines.len(), 2);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].index, 1);
    assert_eq!(violations[0].entity_id.as_deref(), Some("combiner-1"));
  }

  #[test]
  fn urls_are_built_under_api_base() {
    let client = ResourceClient::new(
      Url::parse("http://localhost:8000/api/").unwrap(),
      Duration::from_secs(1),
    )
    .unwrap();
    assert_eq!(client.url("stats").as_str(), "http://localhost:8000/api/stats");
  }
}
