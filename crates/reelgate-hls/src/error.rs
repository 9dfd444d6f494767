//! Error types for reelgate-hls.

use thiserror::Error;

/// Result type for reelgate-hls operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for manifest rewriting.
#[derive(Debug, Error)]
pub enum Error {
    /// A URI reference resolved to a host the caller refused.
    #[error("Segment host not allowed by proxy: {uri}")]
    SegmentNotAllowed { uri: String },

    /// A URI reference could not be resolved against the manifest URL.
    #[error("Invalid segment URI {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },
}

impl Error {
    /// The URI that caused the rewrite to abort.
    pub fn uri(&self) -> &str {
        match self {
            Error::SegmentNotAllowed { uri } | Error::InvalidUri { uri, .. } => uri,
        }
    }
}
