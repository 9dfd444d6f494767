//! Resolver output types.

use serde::{Deserialize, Serialize};

/// Which resolution path produced a [`ResolvedLocation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionSource {
    /// The input was already directly fetchable.
    #[serde(rename = "direct")]
    Direct,
    /// Resolved through the token-authenticated resolver service.
    #[serde(rename = "teraboxfast")]
    TokenService,
    /// Resolved through an operator-configured resolver endpoint.
    #[serde(rename = "custom")]
    CustomEndpoint,
}

impl ResolutionSource {
    /// Wire name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::TokenService => "teraboxfast",
            Self::CustomEndpoint => "custom",
        }
    }
}

/// A directly fetchable media location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub url: String,
    pub resolved: bool,
    pub source: ResolutionSource,
}

impl ResolvedLocation {
    /// A location that needed no resolution.
    pub fn direct(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            resolved: false,
            source: ResolutionSource::Direct,
        }
    }

    /// A location produced by one of the resolver services.
    pub fn resolved(url: impl Into<String>, source: ResolutionSource) -> Self {
        Self {
            url: url.into(),
            resolved: true,
            source,
        }
    }
}
