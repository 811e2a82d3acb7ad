use serde_json::json;
use tracing::{error, info};
use warp::Filter;
use warp::http::StatusCode;

use super::{StubBackend, with_backend};
use crate::models::{JobCreated, NewJob, ResourceKind};

pub fn list_route(backend: StubBackend) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
  warp::path("jobs")
    .and(warp::path::end())
    .and(warp::get())
    .and(with_backend(backend))
    .and_then(handle_list_jobs)
}

pub fn create_route(backend: StubBackend) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
  warp::path("jobs")
    .and(warp::path::end())
    .and(warp::post())
    .and(warp::body::json())
    .and(with_backend(backend))
    .and_then(handle_create_job)
}

async fn handle_list_jobs(backend: StubBackend) -> Result<impl warp::Reply, warp::Rejection> {
  match backend.serve(ResourceKind::Jobs).await {
    Some(served) => {
      if let Some(delay) = served.delay {
        tokio::time::sleep(delay).await;
      }
      Ok(warp::reply::with_status(warp::reply::json(&served.body), StatusCode::OK))
    }
    None => Ok(warp::reply::with_status(
      warp::reply::json(&json!({"detail": "jobs unavailable"})),
      StatusCode::SERVICE_UNAVAILABLE,
    )),
  }
}

async fn handle_create_job(new_job: NewJob, backend: StubBackend) -> Result<impl warp::Reply, warp::Rejection> {
  if !backend.accept_submission().await {
    error!("Rejecting job submission");
    return Ok(warp::reply::with_status(
      warp::reply::json(&json!({"detail": "Internal server error while creating job"})),
      StatusCode::INTERNAL_SERVER_ERROR,
    ));
  }

  let job_id = backend.create_job(&new_job.text, new_job.balancing_strategy).await;
  info!("Job {} submitted with {:?}", job_id, new_job.balancing_strategy);
  Ok(warp::reply::with_status(warp::reply::json(&JobCreated { job_id }), StatusCode::OK))
}
