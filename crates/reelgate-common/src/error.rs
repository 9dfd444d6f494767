//! Unified error type for the reelgate proxy.
//!
//! Every component funnels its failures into [`Error`], which carries enough
//! context for the HTTP layer to derive a status code via [`Error::http_status`]
//! and a stable machine-readable code via [`Error::code`].

use std::fmt;

/// Error taxonomy covering every failure mode of a proxied request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed request input.
    #[error("{0}")]
    Validation(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "movie").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The resolver is misconfigured, unreachable, or returned no usable link.
    #[error("{0}")]
    Resolution(String),

    /// A target host failed the allow-list check.
    #[error("Host not allowed by proxy: {host}")]
    HostNotAllowed {
        /// Host (or raw URL when no host could be parsed) that was rejected.
        host: String,
    },

    /// The upstream served an HTML page instead of media.
    #[error("Provided link is not a direct video file URL. Use a direct MP4/HLS URL.")]
    NotDirectMedia,

    /// A manifest referenced a segment whose host is not allowed.
    #[error("Segment host not allowed by proxy: {uri}")]
    SegmentNotAllowed {
        /// The offending (absolute, when resolvable) segment URI.
        uri: String,
    },

    /// The upstream could not be reached or answered with a failure.
    #[error("Upstream error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Upstream {
        /// Upstream HTTP status, when one was received.
        status: Option<u16>,
        /// Human-readable error description.
        message: String,
    },

    /// The upstream answered without a body.
    #[error("Upstream response has no body")]
    UpstreamEmptyBody,

    /// A network call exceeded its deadline.
    #[error("Upstream request timed out after {after_secs}s")]
    Timeout {
        /// The deadline budget that elapsed, in whole seconds.
        after_secs: u64,
    },

    /// The client exceeded its request quota.
    #[error("Too many requests")]
    RateLimited {
        /// Seconds until the client may retry.
        retry_after_secs: u64,
    },

    /// Catch-all for unexpected internal faults.
    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::NotFound { .. } => 404,
            Error::Resolution(_) => 400,
            Error::HostNotAllowed { .. } => 400,
            Error::NotDirectMedia => 400,
            Error::SegmentNotAllowed { .. } => 502,
            Error::Upstream { .. } => 502,
            Error::UpstreamEmptyBody => 502,
            Error::Timeout { .. } => 504,
            Error::RateLimited { .. } => 429,
            Error::Internal(_) => 500,
        }
    }

    /// Stable code reported alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::NotFound { .. } => "not_found",
            Error::Resolution(_) => "resolution_error",
            Error::HostNotAllowed { .. } => "host_not_allowed",
            Error::NotDirectMedia => "not_direct_media",
            Error::SegmentNotAllowed { .. } => "segment_not_allowed",
            Error::Upstream { .. } => "upstream_error",
            Error::UpstreamEmptyBody => "upstream_empty_body",
            Error::Timeout { .. } => "timeout",
            Error::RateLimited { .. } => "rate_limited",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Whether this error is the deadline signal.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Convenience constructor for [`Error::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Resolution`].
    pub fn resolution(msg: impl Into<String>) -> Self {
        Error::Resolution(msg.into())
    }

    /// Convenience constructor for [`Error::HostNotAllowed`].
    pub fn host_not_allowed(host: impl Into<String>) -> Self {
        Error::HostNotAllowed { host: host.into() }
    }

    /// Convenience constructor for [`Error::Upstream`].
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Error::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Internal`].
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found("movie", "42");
        assert_eq!(err.to_string(), "movie not found: 42");
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn test_upstream_display_includes_status() {
        let err = Error::upstream(Some(503), "Service Unavailable");
        assert_eq!(err.to_string(), "Upstream error (503): Service Unavailable");

        let err = Error::upstream(None, "connection refused");
        assert_eq!(err.to_string(), "Upstream error: connection refused");
    }

    #[test]
    fn test_timeout_is_distinct_from_upstream() {
        let timeout = Error::Timeout { after_secs: 15 };
        let upstream = Error::upstream(Some(500), "boom");
        assert!(timeout.is_timeout());
        assert!(!upstream.is_timeout());
        assert_eq!(timeout.http_status(), 504);
        assert_eq!(upstream.http_status(), 502);
    }

    #[test]
    fn test_client_errors_map_to_400() {
        for err in [
            Error::validation("Missing url query parameter"),
            Error::resolution("No TeraBox resolver configured"),
            Error::host_not_allowed("evil.com"),
            Error::NotDirectMedia,
        ] {
            assert_eq!(err.http_status(), 400, "{err}");
        }
    }

    #[test]
    fn test_gateway_errors_map_to_502() {
        let err = Error::SegmentNotAllowed {
            uri: "https://evil.com/seg1.ts".into(),
        };
        assert_eq!(err.http_status(), 502);
        assert_eq!(Error::UpstreamEmptyBody.http_status(), 502);
    }

    #[test]
    fn test_rate_limited_maps_to_429() {
        let err = Error::RateLimited { retry_after_secs: 3 };
        assert_eq!(err.http_status(), 429);
        assert_eq!(err.to_string(), "Too many requests");
    }
}
