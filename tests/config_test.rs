//! Integration tests for loading configuration files with environment
//! overrides applied.

use std::fs;

use reelgate::config::{load_config, load_config_or_default};
use serial_test::serial;
use tempfile::tempdir;

const ENV_KEYS: &[&str] = &[
    "PORT",
    "TERABOX_NDUS",
    "TERABOX_RESOLVER_URL",
    "ALLOWED_PROXY_HOSTS",
    "ALLOW_PROXY_ANY",
];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

const SAMPLE: &str = r#"
[server]
host = "127.0.0.1"
port = 4100

[proxy]
allowed_hosts = ["cdn.example.com"]
upstream_timeout_secs = 20

[rate_limit]
window_secs = 30
max_requests = 10

[[catalog]]
id = "1"
title = "Sample Movie One"
year = 2024
remote_url = "https://cdn.example.com/video/sample-1.mp4"

[[catalog]]
id = "2"
title = "Sample Movie Two"
remote_url = "https://cdn.example.com/video/sample-2.m3u8"
"#;

#[test]
#[serial]
fn loads_file_without_overrides() {
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("reelgate.toml");
    fs::write(&path, SAMPLE).unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 4100);
    assert_eq!(config.proxy.upstream_timeout_secs, 20);
    assert_eq!(config.rate_limit.max_requests, 10);
    assert_eq!(config.catalog.len(), 2);
    assert_eq!(config.catalog[1].year, None);
    assert!(config.resolver.token.is_none());
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("reelgate.toml");
    fs::write(&path, SAMPLE).unwrap();

    std::env::set_var("PORT", "5000");
    std::env::set_var("TERABOX_NDUS", "ndus-token");
    std::env::set_var("ALLOWED_PROXY_HOSTS", "media.example.org,cdn2.example.org");
    let config = load_config(&path);
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.server.port, 5000);
    assert_eq!(config.resolver.token.as_deref(), Some("ndus-token"));
    assert_eq!(
        config.proxy.allowed_hosts,
        vec!["media.example.org", "cdn2.example.org"]
    );
}

#[test]
#[serial]
fn conflicting_resolvers_from_environment_are_rejected() {
    clear_env();
    std::env::set_var("TERABOX_NDUS", "ndus-token");
    std::env::set_var("TERABOX_RESOLVER_URL", "https://resolver.example.com/api");
    let dir = tempdir().unwrap();
    let path = dir.path().join("reelgate.toml");
    fs::write(&path, "").unwrap();

    let result = load_config_or_default(Some(&path));
    clear_env();

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("mutually exclusive"));
}

#[test]
#[serial]
fn malformed_file_reports_path() {
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[server\nport = ").unwrap();

    let err = load_config(&path).unwrap_err();
    assert!(format!("{err:#}").contains("broken.toml"));
}
