use crate::catalog::{MediaCatalog, StaticCatalog};
use crate::config::Config;
use crate::proxy::Proxy;
use crate::streaming;
use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub mod error;
pub mod rate_limit;
pub mod routes_api;

use rate_limit::{create_limiter, rate_limit_middleware, start_cleanup_task, SharedLimiter};

/// How often idle rate limiter keys are dropped.
const LIMITER_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Guard, resolver and outbound client
    pub proxy: Arc<Proxy>,
    /// Stored movies served by `/api/movies` and `/api/stream/{id}`
    pub catalog: Arc<dyn MediaCatalog>,
    /// Limiter for `GET /api/stream` and `GET /api/stream/{id}`
    pub stream_limiter: SharedLimiter,
    /// Limiter for `POST /api/resolve`
    pub resolve_limiter: SharedLimiter,
}

impl AppContext {
    /// Build the context with the catalog from the config file.
    pub fn from_config(config: Config) -> reelgate_common::Result<Self> {
        let catalog = Arc::new(StaticCatalog::new(config.catalog.clone()));
        Self::with_catalog(config, catalog)
    }

    /// Build the context around an externally owned catalog.
    pub fn with_catalog(
        config: Config,
        catalog: Arc<dyn MediaCatalog>,
    ) -> reelgate_common::Result<Self> {
        let proxy = Proxy::from_config(&config)?;

        Ok(Self {
            stream_limiter: create_limiter(&config.rate_limit),
            resolve_limiter: create_limiter(&config.rate_limit),
            proxy: Arc::new(proxy),
            catalog,
            config: Arc::new(config),
        })
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::RANGE])
        .expose_headers([
            header::CONTENT_RANGE,
            header::CONTENT_LENGTH,
            header::ACCEPT_RANGES,
        ]);

    let mut app = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes(&ctx))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    // SPA fallback: serves index.html for any route that doesn't match a file
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .fallback(ServeFile::new(index_path)),
            );
        } else {
            tracing::warn!("Static directory {:?} does not exist, not serving UI", dir);
        }
    }

    app
}

fn api_routes(ctx: &AppContext) -> Router<AppContext> {
    let resolve_routes = Router::new()
        .route("/resolve", post(routes_api::resolve_link))
        .route_layer(middleware::from_fn_with_state(
            ctx.resolve_limiter.clone(),
            rate_limit_middleware,
        ));

    let stream_routes = streaming::stream_router().route_layer(middleware::from_fn_with_state(
        ctx.stream_limiter.clone(),
        rate_limit_middleware,
    ));

    routes_api::api_routes()
        .merge(resolve_routes)
        .nest("/stream", stream_routes)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let static_dir = config.server.static_dir.clone();
    let ctx = AppContext::from_config(config).context("Failed to initialize proxy")?;

    start_cleanup_task(ctx.stream_limiter.clone(), LIMITER_CLEANUP_INTERVAL);
    start_cleanup_task(ctx.resolve_limiter.clone(), LIMITER_CLEANUP_INTERVAL);

    tracing::info!(
        resolver = ctx.proxy.resolver().strategy().name(),
        allow_any = ctx.proxy.guard().is_open(),
        allowed_hosts = ?ctx.proxy.guard().allowed_hosts(),
        "Proxy configured"
    );

    let app = create_router(ctx, static_dir);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
