//! Range-aware upstream relay.
//!
//! Fetches a validated target and relays it to the client. Client `Range`
//! headers are forwarded verbatim, except to `.m3u8` targets; a partial
//! upstream answer is passed through as 206 with its `Content-Range`. Bodies are streamed chunk by chunk, never
//! buffered, and dropping the client connection drops the upstream one.
//! Manifests are handed to [`super::hls`] instead of being relayed raw.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use futures::TryStreamExt;
use reelgate_common::{Error, Result};
use url::Url;

use super::hls;
use crate::proxy::{Deadline, Proxy, RedirectBlocked};

/// Content type used when the upstream does not declare one.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One proxied fetch.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    /// Guard-approved target.
    pub target: Url,
    /// Client `Range` header, forwarded verbatim.
    pub range: Option<String>,
    pub deadline: Deadline,
}

impl StreamRequest {
    pub fn new(target: Url, range: Option<String>, deadline: Deadline) -> Self {
        Self {
            target,
            range,
            deadline,
        }
    }
}

/// The upstream headers the relay cares about, plus the live body.
pub(crate) struct UpstreamResponse {
    pub final_url: Url,
    pub partial: bool,
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    pub content_range: Option<String>,
    pub has_body: bool,
    pub response: reqwest::Response,
}

impl UpstreamResponse {
    fn from_response(response: reqwest::Response) -> Self {
        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let content_type = header(reqwest::header::CONTENT_TYPE);
        let content_length = header(reqwest::header::CONTENT_LENGTH);
        let content_range = header(reqwest::header::CONTENT_RANGE);

        let bodiless_status = matches!(response.status().as_u16(), 204 | 205);
        let has_body = !bodiless_status && response.content_length() != Some(0);

        Self {
            final_url: response.url().clone(),
            partial: response.status() == reqwest::StatusCode::PARTIAL_CONTENT,
            content_type,
            content_length,
            content_range,
            has_body,
            response,
        }
    }

    fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
    }
}

/// Fetch `request.target` and build the client response.
pub async fn stream(proxy: &Proxy, request: StreamRequest) -> Result<Response> {
    let upstream = fetch(proxy, &request).await?;

    if upstream.is_html() {
        tracing::debug!(url = %request.target, "Upstream served HTML, not media");
        return Err(Error::NotDirectMedia);
    }

    let content_type = upstream.content_type.as_deref();
    if reelgate_hls::is_manifest(&request.target, content_type)
        || reelgate_hls::is_manifest(&upstream.final_url, content_type)
    {
        return hls::manifest_response(proxy, &request, upstream).await;
    }

    relay_response(&request, upstream)
}

async fn fetch(proxy: &Proxy, request: &StreamRequest) -> Result<UpstreamResponse> {
    let mut builder = proxy.client().get(request.target.clone());
    // Manifests are always fetched whole
    if let Some(range) = request
        .range
        .as_ref()
        .filter(|_| !reelgate_hls::is_manifest(&request.target, None))
    {
        builder = builder.header(reqwest::header::RANGE, range.as_str());
    }

    let deadline = &request.deadline;
    let response = deadline
        .run(async {
            builder
                .send()
                .await
                .map_err(|e| deadline.classify(e, send_error))
        })
        .await?;

    let status = response.status();
    if !status.is_success() {
        tracing::debug!(url = %request.target, status = status.as_u16(), "Upstream rejected request");
        return Err(Error::upstream(
            Some(status.as_u16()),
            status.canonical_reason().unwrap_or("Upstream request failed"),
        ));
    }

    Ok(UpstreamResponse::from_response(response))
}

/// Map a non-timeout send failure.
fn send_error(err: reqwest::Error) -> Error {
    if err.is_redirect() {
        if let Some(blocked) = find_source::<RedirectBlocked>(&err) {
            return Error::host_not_allowed(blocked.host.clone());
        }
    }
    Error::upstream(err.status().map(|s| s.as_u16()), err.to_string())
}

fn find_source<'a, T: std::error::Error + 'static>(
    err: &'a (dyn std::error::Error + 'static),
) -> Option<&'a T> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(found) = e.downcast_ref::<T>() {
            return Some(found);
        }
        current = e.source();
    }
    None
}

fn relay_response(request: &StreamRequest, upstream: UpstreamResponse) -> Result<Response> {
    if !upstream.has_body {
        return Err(Error::UpstreamEmptyBody);
    }

    let mut builder = Response::builder().header(header::ACCEPT_RANGES, "bytes");

    match (&request.range, &upstream.content_range) {
        (Some(_), Some(content_range)) => {
            builder = builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_RANGE, content_range.as_str());
        }
        _ => {
            builder = builder.status(StatusCode::OK);
        }
    }

    if let Some(length) = &upstream.content_length {
        builder = builder.header(header::CONTENT_LENGTH, length.as_str());
    }

    builder = builder.header(
        header::CONTENT_TYPE,
        upstream
            .content_type
            .as_deref()
            .unwrap_or(DEFAULT_CONTENT_TYPE),
    );

    let target = request.target.clone();
    let body = upstream.response.bytes_stream().inspect_err(move |e| {
        tracing::warn!(url = %target, "Upstream body failed mid-relay: {}", e);
    });

    builder
        .body(Body::from_stream(body))
        .map_err(|e| Error::internal(format!("Failed to build response: {}", e)))
}
