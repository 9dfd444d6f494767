use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory with the built web UI, served as an SPA fallback
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    4000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Hosts the proxy may fetch from. Subdomains are included; empty = any host.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,

    /// Allow every host regardless of `allowed_hosts`
    #[serde(default)]
    pub allow_any: bool,

    /// Deadline for each outbound network operation (default: 15)
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_secs: u64,
}

fn default_upstream_timeout() -> u64 {
    15
}

impl ProxyConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: Vec::new(),
            allow_any: false,
            upstream_timeout_secs: default_upstream_timeout(),
        }
    }
}

/// Share-link resolver settings. `token` and `custom_url` are mutually exclusive.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Access token for the hosted resolver service
    #[serde(default)]
    pub token: Option<String>,

    /// Base URL of a self-hosted resolver; the share link is appended as `url=`
    #[serde(default)]
    pub custom_url: Option<String>,

    /// Endpoint of the hosted resolver service used with `token`
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
}

fn default_token_endpoint() -> String {
    "https://nord.teraboxfast.com/".to_string()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            token: None,
            custom_url: None,
            token_endpoint: default_token_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Length of the rate limit window in seconds (default: 60)
    #[serde(default = "default_window")]
    pub window_secs: u64,

    /// Requests allowed per client within one window (default: 60)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
}

fn default_window() -> u64 {
    60
}

fn default_max_requests() -> u32 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window(),
            max_requests: default_max_requests(),
        }
    }
}

/// A stored movie. The catalog itself is owned by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CatalogEntry {
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub year: Option<u16>,

    /// Direct media URL (MP4 or HLS), never a share page
    pub remote_url: String,
}
