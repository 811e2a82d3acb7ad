use serde_json::json;
use warp::Filter;
use warp::http::StatusCode;

use super::{StubBackend, with_backend};
use crate::models::ResourceKind;

/// `GET /engines`, `GET /logs` and `GET /stats`.
pub fn routes(backend: StubBackend) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
  resource_route("engines", ResourceKind::Engines, backend.clone())
    .or(resource_route("logs", ResourceKind::Logs, backend.clone()))
    .or(resource_route("stats", ResourceKind::Stats, backend))
}

fn resource_route(
  segment: &'static str,
  kind: ResourceKind,
  backend: StubBackend,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
  warp::path(segment)
    .and(warp::path::end())
    .and(warp::get())
    .and(with_backend(backend))
    .and_then(move |backend: StubBackend| handle_resource(kind, backend))
}

async fn handle_resource(kind: ResourceKind, backend: StubBackend) -> Result<impl warp::Reply, warp::Rejection> {
  let reply = match backend.serve(kind).await {
    Some(served) => warp::reply::with_status(warp::reply::json(&served.body), StatusCode::OK),
    None => warp::reply::with_status(
      warp::reply::json(&json!({"detail": format!("{} unavailable", kind)})),
      StatusCode::SERVICE_UNAVAILABLE,
    ),
  };
  Ok(reply)
}
