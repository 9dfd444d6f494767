use crate::config::CatalogEntry;
use crate::server::{error::AppError, AppContext};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use reelgate_common::{Error, ResolvedLocation};
use serde::{Deserialize, Serialize};

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/movies", get(list_movies))
        .route("/movies/:id", get(get_movie))
}

/// Catalog listing row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieSummary {
    pub id: String,
    pub title: String,
    pub year: Option<u16>,
    pub stream_endpoint: String,
}

impl From<CatalogEntry> for MovieSummary {
    fn from(entry: CatalogEntry) -> Self {
        Self {
            stream_endpoint: format!("/api/stream/{}", entry.id),
            id: entry.id,
            title: entry.title,
            year: entry.year,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDetail {
    pub id: String,
    pub title: String,
    pub year: Option<u16>,
    pub remote_url: String,
}

impl From<CatalogEntry> for MovieDetail {
    fn from(entry: CatalogEntry) -> Self {
        Self {
            id: entry.id,
            title: entry.title,
            year: entry.year,
            remote_url: entry.remote_url,
        }
    }
}

async fn list_movies(State(ctx): State<AppContext>) -> Json<Vec<MovieSummary>> {
    let movies = ctx.catalog.list().await;
    Json(movies.into_iter().map(MovieSummary::from).collect())
}

async fn get_movie(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<MovieDetail>, AppError> {
    let entry = ctx
        .catalog
        .get(&id)
        .await
        .ok_or_else(|| Error::not_found("Movie", &id))?;
    Ok(Json(entry.into()))
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub url: Option<String>,
}

/// Resolve a link once without streaming it.
pub async fn resolve_link(
    State(ctx): State<AppContext>,
    body: Option<Json<ResolveRequest>>,
) -> Result<Json<ResolvedLocation>, AppError> {
    let url = body
        .and_then(|Json(req)| req.url)
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| Error::validation("Missing url"))?;

    let location = ctx.proxy.resolve(&url).await?;

    tracing::debug!(
        url = %location.url,
        source = location.source.as_str(),
        "Resolved link"
    );

    Ok(Json(location))
}
