//! Media streaming module.
//!
//! Proxies remote media through the server so browsers can play it with
//! seeking support.
//!
//! # Routes
//!
//! - `GET /stream?url={url}` - Resolve, validate and proxy an explicit URL
//! - `GET /stream/{id}` - Proxy the stored URL of a catalog entry
//!
//! Both are nested under `/api` and rate limited by the server.
//! HLS manifests are rewritten so every segment request also comes back
//! through `GET /api/stream?url=`.

mod hls;
pub mod relay;

pub use relay::{stream, StreamRequest};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::Response,
    routing::get,
    Router,
};
use reelgate_common::Error;
use serde::Deserialize;

use crate::server::{error::AppError, AppContext};

/// Create streaming router.
pub fn stream_router() -> Router<AppContext> {
    Router::new()
        .route("/", get(stream_url))
        .route("/:id", get(stream_catalog_item))
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub url: Option<String>,
}

/// Proxy an explicit URL, resolving share links first.
pub async fn stream_url(
    State(ctx): State<AppContext>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let raw = query
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| Error::validation("Missing url query parameter"))?;

    let location = ctx.proxy.resolve(&raw).await?;
    let target = ctx.proxy.validate_target(&location.url)?;

    tracing::debug!(url = %target, resolved = location.resolved, "Streaming URL");

    let request = StreamRequest::new(target, range_header(&headers), ctx.proxy.deadline());
    Ok(stream(&ctx.proxy, request).await?)
}

/// Proxy the stored URL of a catalog entry.
pub async fn stream_catalog_item(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let entry = ctx
        .catalog
        .get(&id)
        .await
        .ok_or_else(|| Error::not_found("Movie", &id))?;

    let target = ctx.proxy.validate_target(&entry.remote_url)?;

    tracing::debug!(id = %id, url = %target, "Streaming catalog entry");

    let request = StreamRequest::new(target, range_header(&headers), ctx.proxy.deadline());
    Ok(stream(&ctx.proxy, request).await?)
}

fn range_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
