mod common;

use mrdash::error::DashError;
use mrdash::models::{BalancingStrategy, JobStatus, ResourceKind};
use mrdash::submission::{sample_text, submit};
use tokio_test::{assert_err, assert_ok};

use common::stub_and_monitor;

#[tokio::test]
async fn empty_text_fails_without_touching_the_network() {
  let (backend, monitor) = stub_and_monitor().await;

  for text in ["", "   \n\t"] {
    let err = assert_err!(submit(&monitor, text, BalancingStrategy::RoundRobin).await);
    assert!(matches!(err, DashError::Validation(_)));
  }

  assert_eq!(backend.submission_count().await, 0);
  assert_eq!(backend.request_count(ResourceKind::Jobs).await, 0);
  assert!(monitor.snapshot().jobs.is_empty());
}

#[tokio::test]
async fn successful_submit_returns_id_and_refreshes_jobs_once() {
  let (backend, monitor) = stub_and_monitor().await;

  let job_id = assert_ok!(submit(&monitor, "hello world", BalancingStrategy::LeastLoaded).await);

  assert_eq!(backend.submission_count().await, 1);
  assert_eq!(backend.request_count(ResourceKind::Jobs).await, 1);
  assert_eq!(backend.request_count(ResourceKind::Engines).await, 0);
  assert_eq!(backend.last_strategy().await, Some(BalancingStrategy::LeastLoaded));

  let snapshot = monitor.snapshot();
  assert_eq!(snapshot.jobs.len(), 1);
  assert_eq!(snapshot.jobs[0].job_id, job_id);
  assert_eq!(snapshot.jobs[0].status, JobStatus::Map);
  assert_eq!(snapshot.jobs[0].text_length, 11);
}

#[tokio::test]
async fn backend_failure_surfaces_as_submission_error() {
  let (backend, monitor) = stub_and_monitor().await;
  backend.set_rejecting_submissions(true).await;

  let err = assert_err!(submit(&monitor, "hello world", BalancingStrategy::RoundRobin).await);
  assert!(matches!(err, DashError::Submission(_)));
  assert_eq!(backend.request_count(ResourceKind::Jobs).await, 0);
  assert!(monitor.snapshot().jobs.is_empty());

  // identical input can simply be resubmitted
  backend.set_rejecting_submissions(false).await;
  assert_ok!(submit(&monitor, "hello world", BalancingStrategy::RoundRobin).await);
  assert_eq!(backend.submission_count().await, 2);
}

#[tokio::test]
async fn sample_text_is_split_into_shards() {
  let (_backend, monitor) = stub_and_monitor().await;
  let text = sample_text();

  assert_ok!(submit(&monitor, &text, BalancingStrategy::RoundRobin).await);
  let job = monitor.snapshot().jobs[0].clone();
  assert_eq!(job.text_length, text.chars().count() as u64);
  assert!(job.num_shards >= 4);
}
