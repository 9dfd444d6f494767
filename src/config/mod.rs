mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    apply_env_overrides(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./reelgate.toml",
        "./config.toml",
        "~/.config/reelgate/config.toml",
        "/etc/reelgate/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    let mut config = Config::default();
    apply_env_overrides(&mut config);
    validate_config(&config)?;
    Ok(config)
}

/// Apply the deployment environment variables on top of file settings.
///
/// `PORT`, `TERABOX_NDUS`, `TERABOX_RESOLVER_URL`, `ALLOWED_PROXY_HOSTS`
/// (comma separated) and `ALLOW_PROXY_ANY` (`true`). Unset or empty
/// variables leave the file value alone.
pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

fn apply_overrides_from<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = lookup("PORT") {
        match port.trim().parse() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
        }
    }

    if let Some(token) = lookup("TERABOX_NDUS") {
        config.resolver.token = Some(token);
    }

    if let Some(url) = lookup("TERABOX_RESOLVER_URL") {
        config.resolver.custom_url = Some(url);
    }

    if let Some(hosts) = lookup("ALLOWED_PROXY_HOSTS") {
        config.proxy.allowed_hosts = split_host_list(&hosts);
    }

    if let Some(flag) = lookup("ALLOW_PROXY_ANY") {
        config.proxy.allow_any = flag.trim() == "true";
    }
}

/// Split a comma-separated host list, trimming and dropping empty entries.
pub fn split_host_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.proxy.upstream_timeout_secs == 0 {
        anyhow::bail!("proxy.upstream_timeout_secs must be greater than 0");
    }

    if config.rate_limit.window_secs == 0 || config.rate_limit.max_requests == 0 {
        anyhow::bail!("rate_limit.window_secs and rate_limit.max_requests must be greater than 0");
    }

    let resolver = &config.resolver;
    if non_empty(&resolver.token) && non_empty(&resolver.custom_url) {
        anyhow::bail!("resolver.token and resolver.custom_url are mutually exclusive");
    }

    if let Some(url) = resolver.custom_url.as_deref().filter(|u| !u.is_empty()) {
        check_http_url(url).context("Invalid resolver.custom_url")?;
    }
    check_http_url(&resolver.token_endpoint).context("Invalid resolver.token_endpoint")?;

    let mut seen = HashSet::new();
    for entry in &config.catalog {
        if !seen.insert(entry.id.as_str()) {
            anyhow::bail!("Duplicate catalog id '{}'", entry.id);
        }
        if url::Url::parse(&entry.remote_url).is_err() {
            tracing::warn!(
                "Catalog entry '{}' has an unparseable remote_url: {}",
                entry.id,
                entry.remote_url
            );
        }
    }

    if config.proxy.allow_any {
        tracing::warn!("proxy.allow_any is set: every upstream host will be proxied");
    }

    Ok(())
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

fn check_http_url(raw: &str) -> Result<()> {
    let url = url::Url::parse(raw).with_context(|| format!("'{}' is not a URL", raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("'{}' must use http or https", raw);
    }
    Ok(())
}
