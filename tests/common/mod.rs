#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use mrdash::client::ResourceClient;
use mrdash::config::api_base;
use mrdash::diagnostics::Diagnostic;
use mrdash::poller::Monitor;
use mrdash::routes::{StubBackend, routes};
use reqwest::Url;
use tokio::sync::broadcast;

pub const TEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Serves the stub backend on an ephemeral local port.
pub async fn spawn_stub(backend: StubBackend) -> SocketAddr {
  let (addr, server) = warp::serve(routes(backend)).bind_ephemeral(([127, 0, 0, 1], 0));
  tokio::spawn(server);
  addr
}

pub fn monitor_for(addr: SocketAddr, timeout: Duration) -> Monitor {
  let url = Url::parse(&format!("http://{}", addr)).unwrap();
  let client = ResourceClient::new(api_base(&url).unwrap(), timeout).unwrap();
  Monitor::new(client)
}

pub async fn stub_and_monitor() -> (StubBackend, Monitor) {
  let backend = StubBackend::new();
  let addr = spawn_stub(backend.clone()).await;
  (backend, monitor_for(addr, TEST_TIMEOUT))
}

pub fn drain(rx: &mut broadcast::Receiver<Diagnostic>) -> Vec<Diagnostic> {
  let mut events = Vec::new();
  while let Ok(event) = rx.try_recv() {
    events.push(event);
  }
  events
}
