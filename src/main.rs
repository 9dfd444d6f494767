mod cli;

use reelgate::{config, proxy::Proxy, server};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use url::Url;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags win over the config file and environment
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting Reelgate server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );
    tracing::info!("Catalog has {} entries", config.catalog.len());

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelgate=trace,reelgate_hls=trace,tower_http=debug".to_string()
        } else {
            "reelgate=debug,reelgate_hls=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Resolve { url } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(resolve_link(&url, cli.config.as_deref()))
        }
        Commands::CheckHost { url, base_host } => {
            check_host(&url, base_host.as_deref(), cli.config.as_deref())
        }
        Commands::Version => {
            println!("reelgate {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Configuration is valid!");
    println!();
    println!("Server: {}:{}", config.server.host, config.server.port);
    if let Some(ref dir) = config.server.static_dir {
        println!("Static files: {}", dir.display());
    }
    println!();

    println!(
        "Upstream timeout: {}s",
        config.proxy.upstream_timeout_secs
    );
    if config.proxy.allow_any {
        println!("Allowed hosts: any (ALLOW_PROXY_ANY)");
    } else if config.proxy.allowed_hosts.is_empty() {
        println!("Allowed hosts: any (no allow-list configured)");
    } else {
        println!("Allowed hosts:");
        for host in &config.proxy.allowed_hosts {
            println!("  - {}", host);
        }
    }
    println!();

    let resolver = if config.resolver.token.is_some() {
        format!("token service ({})", config.resolver.token_endpoint)
    } else if let Some(ref custom) = config.resolver.custom_url {
        format!("custom endpoint ({})", custom)
    } else {
        "not configured".to_string()
    };
    println!("Resolver: {}", resolver);
    println!(
        "Rate limit: {} requests / {}s",
        config.rate_limit.max_requests, config.rate_limit.window_secs
    );
    println!();

    println!("Catalog ({}):", config.catalog.len());
    for entry in &config.catalog {
        match entry.year {
            Some(year) => println!("  - {} {} ({})", entry.id, entry.title, year),
            None => println!("  - {} {}", entry.id, entry.title),
        }
    }

    Ok(())
}

async fn resolve_link(input: &str, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let proxy = Proxy::from_config(&config)?;

    let location = proxy.resolve(input).await?;
    println!("{}", serde_json::to_string_pretty(&location)?);

    Ok(())
}

fn check_host(raw: &str, base_host: Option<&str>, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let guard = reelgate::proxy::HostGuard::from_config(&config.proxy);

    let url = Url::parse(raw).with_context(|| format!("Invalid URL: {}", raw))?;
    let host = url.host_str().unwrap_or_default().to_string();

    if guard.allowed_url(&url, base_host) {
        println!("allowed: {}", host);
        Ok(())
    } else {
        anyhow::bail!("Host not allowed: {}", host)
    }
}
