//! Manifest delegation.
//!
//! When the relay recognises an HLS manifest it reads the body under the
//! request deadline, stopping at a fixed size cap, and rewrites every URI so
//! that segments and variant playlists come back through `/api/stream`, each
//! re-validated by the guard. Partial (206) manifests are refused.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use reelgate_common::{Error, Result};
use reelgate_hls::MANIFEST_CONTENT_TYPE;

use super::relay::{StreamRequest, UpstreamResponse};
use crate::proxy::{Deadline, Proxy};

/// Manifests larger than this are refused rather than buffered.
const MAX_MANIFEST_BYTES: usize = 8 * 1024 * 1024;

pub(crate) async fn manifest_response(
    proxy: &Proxy,
    request: &StreamRequest,
    upstream: UpstreamResponse,
) -> Result<Response> {
    if let Some(length) = upstream
        .content_length
        .as_deref()
        .and_then(|l| l.parse::<usize>().ok())
    {
        if length > MAX_MANIFEST_BYTES {
            return Err(Error::upstream(None, "Manifest too large"));
        }
    }

    if upstream.partial {
        return Err(Error::upstream(Some(206), "Upstream returned a partial manifest"));
    }

    let base = upstream.final_url.clone();
    let deadline = &request.deadline;
    let bytes = deadline.run(read_capped(upstream.response, deadline)).await?;

    let text = String::from_utf8_lossy(&bytes);
    let text = text.trim_start_matches('\u{feff}');
    let base_host = base.host_str().map(str::to_string);
    let guard = proxy.guard();

    let rewritten = proxy
        .rewriter()
        .rewrite(text, &base, |segment| {
            guard.allowed_url(segment, base_host.as_deref())
        })
        .map_err(|e| {
            tracing::warn!(manifest = %base, uri = e.uri(), "Manifest rewrite aborted: {}", e);
            Error::SegmentNotAllowed {
                uri: e.uri().to_string(),
            }
        })?;

    tracing::debug!(manifest = %base, bytes = rewritten.len(), "Rewrote HLS manifest");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, MANIFEST_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(rewritten))
        .map_err(|e| Error::internal(format!("Failed to build response: {}", e)))
}

/// Collect the manifest body, giving up as soon as it passes the size cap.
async fn read_capped(mut response: reqwest::Response, deadline: &Deadline) -> Result<Vec<u8>> {
    let capacity = response
        .content_length()
        .map_or(0, |len| len as usize)
        .min(MAX_MANIFEST_BYTES);
    let mut body = Vec::with_capacity(capacity);

    while let Some(chunk) = response.chunk().await.map_err(|e| {
        deadline.classify(e, |e| {
            Error::upstream(None, format!("Failed to read manifest: {}", e))
        })
    })? {
        if body.len() + chunk.len() > MAX_MANIFEST_BYTES {
            tracing::warn!(limit = MAX_MANIFEST_BYTES, "Manifest exceeds size limit");
            return Err(Error::upstream(None, "Manifest too large"));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}
