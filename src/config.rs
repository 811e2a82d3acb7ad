use std::env;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::{DashError, Result};
use crate::labels::Locale;

const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_STUB_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct Config {
  pub backend_url: Url,
  pub poll_interval: Duration,
  pub request_timeout: Duration,
  pub locale: Locale,
  pub log_file: PathBuf,
}

impl Config {
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  pub fn from_lookup<F>(lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let raw_url = lookup("MRDASH_BACKEND_URL")
      .ok_or_else(|| DashError::Config("MRDASH_BACKEND_URL is not set".into()))?;
    let backend_url = Url::parse(raw_url.trim())
      .map_err(|e| DashError::Config(format!("invalid MRDASH_BACKEND_URL '{}': {}", raw_url, e)))?;

    let poll_interval = Duration::from_millis(
      parse_or(&lookup, "MRDASH_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?.max(1),
    );
    // A request may never outlive the tick that issued it.
    let request_timeout = match lookup("MRDASH_REQUEST_TIMEOUT_MS") {
      Some(_) => Duration::from_millis(parse_or(&lookup, "MRDASH_REQUEST_TIMEOUT_MS", 0)?.max(1)),
      None => poll_interval,
    }
    .min(poll_interval);

    let locale = match lookup("MRDASH_LOCALE") {
      Some(code) => code
        .parse()
        .map_err(|_| DashError::Config(format!("unsupported MRDASH_LOCALE '{}'", code)))?,
      None => Locale::default(),
    };

    Ok(Self {
      backend_url,
      poll_interval,
      request_timeout,
      locale,
      log_file: lookup("MRDASH_LOG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("mrdash.log")),
    })
  }

  /// Base of the REST contract, always ending in `/api/`.
  pub fn api_base(&self) -> Result<Url> {
    api_base(&self.backend_url)
  }
}

/// Port for the `mrdash_stub` server, which needs no backend URL.
pub fn stub_port_from_env() -> Result<u16> {
  stub_port_from_lookup(|key| env::var(key).ok())
}

pub fn stub_port_from_lookup<F>(lookup: F) -> Result<u16>
where
  F: Fn(&str) -> Option<String>,
{
  parse_or(&lookup, "MRDASH_STUB_PORT", DEFAULT_STUB_PORT)
}

pub fn api_base(backend_url: &Url) -> Result<Url> {
  if backend_url.cannot_be_a_base() {
    return Err(DashError::Config(format!("'{}' cannot be used as a base URL", backend_url)));
  }
  let mut base = backend_url.clone();
  let trimmed = base.path().trim_end_matches('/').to_string();
  base.set_path(&format!("{}/api/", trimmed));
  Ok(base)
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
  F: Fn(&str) -> Option<String>,
  T: std::str::FromStr,
{
  match lookup(key) {
    Some(raw) => raw
      .trim()
      .parse()
      .map_err(|_| DashError::Config(format!("invalid value for {}: '{}'", key, raw))),
    None => Ok(default),
  }
}
