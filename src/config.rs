use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Port the backend listens on, both locally and on LAN peers.
pub const DEFAULT_BACKEND_PORT: u16 = 5000;

/// Client configuration. Every field has a working default so a bare
/// `Config::default()` talks to a backend on this machine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Explicit backend URL; overrides the origin-host rule when set.
    pub api_url: Option<String>,
    /// Host the client is "served from". Loopback hosts target
    /// `localhost`, anything else targets the same host.
    pub origin_host: String,
    pub backend_port: u16,
    /// Path prefix shared by every REST endpoint.
    pub api_prefix: String,
    /// Client-side timeout applied to every request.
    pub timeout: Duration,
    /// How long a success banner stays up (default: 3 seconds).
    pub success_banner: Duration,
    /// Where persisted state lives; `None` uses the platform data dir.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            origin_host: "localhost".into(),
            backend_port: DEFAULT_BACKEND_PORT,
            api_prefix: "/api".into(),
            timeout: Duration::from_secs(10),
            success_banner: Duration::from_secs(3),
            data_dir: None,
        }
    }
}

impl Config {
    pub fn base_url(&self) -> String {
        match &self.api_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => resolve_base_url(&self.origin_host, self.backend_port),
        }
    }
}

/// Loopback origins reach the backend on `localhost`; any other origin is
/// assumed to be a LAN peer running the backend itself.
pub fn resolve_base_url(origin_host: &str, port: u16) -> String {
    let host = origin_host.trim().trim_start_matches('[').trim_end_matches(']');

    if is_loopback(host) {
        return format!("http://localhost:{}", port);
    }

    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(_)) => format!("http://[{}]:{}", host, port),
        _ => format!("http://{}:{}", host, port),
    }
}

fn is_loopback(host: &str) -> bool {
    if host.is_empty() || host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false)
}
