use std::time::Duration;

use mrdash::{config::stub_port_from_env, models::EngineRole, routes::{StubBackend, routes}};
use tokio_stream::{StreamExt, wrappers::IntervalStream};
use tracing::info;

const ADVANCE_EVERY: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt::init();
  let port = stub_port_from_env()?;

  let backend = StubBackend::new();
  backend.register_engine("mapper-1", EngineRole::Mapper, 4).await;
  backend.register_engine("mapper-2", EngineRole::Mapper, 4).await;
  backend.register_engine("reducer-1", EngineRole::Reducer, 2).await;

  let simulated = backend.clone();
  tokio::spawn(async move {
    let mut ticks = IntervalStream::new(tokio::time::interval(ADVANCE_EVERY));
    while ticks.next().await.is_some() {
      simulated.advance().await;
    }
  });

  info!("Stub backend listening on port {}", port);
  warp::serve(routes(backend))
    .run(([0, 0, 0, 0], port))
    .await;
  Ok(())
}
