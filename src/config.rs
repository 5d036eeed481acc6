//! Environment-driven client configuration.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_API_BASE: &str = "http://localhost:5245/api";
pub const DEFAULT_HUB_PATH: &str = "hub";
/// Delays between hub reconnect attempts; the list length bounds the attempts.
pub const DEFAULT_RECONNECT_DELAYS_MS: [u64; 4] = [0, 2_000, 10_000, 30_000];

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: Url,
    pub hub_path: String,
    pub state_file: PathBuf,
    /// `None` leaves the HTTP client's own timeout behaviour in place.
    pub request_timeout: Option<Duration>,
    pub reconnect_delays: Vec<Duration>,
}

impl ClientConfig {
    /// Built-in defaults, ignoring the environment.
    pub fn defaults() -> ClientResult<Self> {
        Self::from_lookup(|_| None)
    }

    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build a config from an arbitrary variable lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = ClientConfig {
            api_base: normalize_base(DEFAULT_API_BASE)?,
            hub_path: DEFAULT_HUB_PATH.to_string(),
            state_file: default_state_file(),
            request_timeout: None,
            reconnect_delays: DEFAULT_RECONNECT_DELAYS_MS.iter().map(|ms| Duration::from_millis(*ms)).collect(),
        };
        if let Some(base) = lookup("SHIPDESK_API_BASE") {
            cfg.api_base = normalize_base(&base)?;
        }
        if let Some(hub) = lookup("SHIPDESK_HUB_PATH") {
            let hub = hub.trim().trim_matches('/').to_string();
            if hub.is_empty() {
                return Err(ClientError::config("SHIPDESK_HUB_PATH must not be empty"));
            }
            cfg.hub_path = hub;
        }
        if let Some(path) = lookup("SHIPDESK_STATE_FILE") {
            cfg.state_file = PathBuf::from(path);
        }
        if let Some(secs) = lookup("SHIPDESK_HTTP_TIMEOUT_SECS") {
            let n: u64 = secs.trim().parse()
                .map_err(|_| ClientError::config(format!("invalid SHIPDESK_HTTP_TIMEOUT_SECS '{}'", secs)))?;
            cfg.request_timeout = if n == 0 { None } else { Some(Duration::from_secs(n)) };
        }
        if let Some(list) = lookup("SHIPDESK_HUB_RECONNECT_MS") {
            cfg.reconnect_delays = parse_delays(&list)?;
        }
        Ok(cfg)
    }

    /// Hub endpoint with the websocket scheme matching the API scheme.
    pub fn hub_url(&self) -> ClientResult<Url> {
        let mut url = self.api_base.join(&self.hub_path)
            .map_err(|e| ClientError::config(format!("invalid hub path: {}", e)))?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|_| ClientError::config("cannot derive websocket scheme"))?;
        Ok(url)
    }
}

/// Parse the API base and make sure relative joins keep its path (`/api`).
pub fn normalize_base(raw: &str) -> ClientResult<Url> {
    let mut url = Url::parse(raw.trim()).map_err(|e| ClientError::config(format!("invalid base URL '{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::config(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let p = format!("{}/", url.path());
        url.set_path(&p);
    }
    Ok(url)
}

fn parse_delays(list: &str) -> ClientResult<Vec<Duration>> {
    let mut out = Vec::new();
    for part in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let ms: u64 = part.parse()
            .map_err(|_| ClientError::config(format!("invalid reconnect delay '{}'", part)))?;
        out.push(Duration::from_millis(ms));
    }
    Ok(out)
}

fn default_state_file() -> PathBuf {
    match std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        Ok(home) => PathBuf::from(home).join(".shipdesk").join("state.json"),
        Err(_) => PathBuf::from("shipdesk_state.json"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn defaults_keep_api_path() {
        let cfg = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.api_base.as_str(), "http://localhost:5245/api/");
        assert_eq!(cfg.api_base.join("Account/login").unwrap().as_str(), "http://localhost:5245/api/Account/login");
        assert!(cfg.request_timeout.is_none());
        assert_eq!(cfg.reconnect_delays.len(), 4);
    }

    #[test]
    fn hub_url_uses_websocket_scheme() {
        let cfg = ClientConfig::from_lookup(lookup(&[("SHIPDESK_API_BASE", "https://ship.example/api")])).unwrap();
        assert_eq!(cfg.hub_url().unwrap().as_str(), "wss://ship.example/api/hub");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ClientConfig::from_lookup(lookup(&[("SHIPDESK_API_BASE", "ftp://x")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("SHIPDESK_HTTP_TIMEOUT_SECS", "soon")])).is_err());
        let cfg = ClientConfig::from_lookup(lookup(&[("SHIPDESK_HUB_RECONNECT_MS", "0, 50,100")])).unwrap();
        assert_eq!(cfg.reconnect_delays, vec![Duration::from_millis(0), Duration::from_millis(50), Duration::from_millis(100)]);
    }
}
