use thiserror::Error;

use crate::models::ResourceKind;

/// A read of one resource failed: transport error, timeout, non-2xx status or
/// an undecodable body.
#[derive(Error, Debug)]
#[error("fetching {kind} failed: {source}")]
pub struct FetchError {
  pub kind: ResourceKind,
  #[source]
  pub source: reqwest::Error,
}

/// A single entity arrived outside the documented data contract.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}[{index}] ({}) violates the data contract: {reason}", .entity_id.as_deref().unwrap_or("unknown id"))]
pub struct ContractViolation {
  pub kind: ResourceKind,
  pub index: usize,
  pub entity_id: Option<String>,
  pub reason: String,
}

#[derive(Error, Debug)]
pub enum DashError {
  #[error("Validation error: {0}")]
  Validation(String),

  #[error("Job submission failed: {0}")]
  Submission(#[source] reqwest::Error),

  #[error("Configuration error: {0}")]
  Config(String),
}

pub type Result<T> = std::result::Result<T, DashError>;
