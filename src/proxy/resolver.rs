//! Share-link resolution.
//!
//! File-hosting share pages do not serve media bytes. Links recognised as
//! share pages are exchanged for a direct download URL through exactly one
//! resolver strategy, chosen once from configuration. Everything else passes
//! through untouched without any network call.

use reelgate_common::{Error, ResolutionSource, ResolvedLocation, Result};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::deadline::Deadline;
use crate::config::ResolverConfig;

/// Predicate recognising indirect share links.
pub type ShareLinkMatcher = fn(&Url) -> bool;

/// Recognises TeraBox share hosts (`terabox.com`, `1024terabox.com`, mirrors).
pub fn is_terabox_share(url: &Url) -> bool {
    url.host_str()
        .map(|host| host.to_ascii_lowercase().contains("terabox"))
        .unwrap_or(false)
}

/// Field names probed, in order, in every resolver response.
const DIRECT_LINK_FIELDS: &[&str] = &["direct_link", "link", "url"];

/// Extra nested fields probed for custom-endpoint responses only.
const NESTED_LINK_FIELDS: &[&str] = &["direct_link", "url"];

/// The active resolution strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverStrategy {
    /// Hosted resolver authenticated by an access token.
    Token { endpoint: String, token: String },
    /// Operator-provided resolver; the share link is appended as `url=`.
    Custom { base_url: String },
    /// No resolver: share links cannot be streamed.
    Unconfigured,
}

impl ResolverStrategy {
    /// Select the strategy from configuration. Empty values count as unset.
    ///
    /// `validate_config` rejects a token and a custom URL set together; if
    /// that check is bypassed the token wins.
    pub fn from_config(config: &ResolverConfig) -> Self {
        let token = config.token.as_deref().filter(|t| !t.is_empty());
        let custom = config.custom_url.as_deref().filter(|u| !u.is_empty());

        match (token, custom) {
            (Some(token), _) => ResolverStrategy::Token {
                endpoint: config.token_endpoint.clone(),
                token: token.to_string(),
            },
            (None, Some(base_url)) => ResolverStrategy::Custom {
                base_url: base_url.to_string(),
            },
            (None, None) => ResolverStrategy::Unconfigured,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResolverStrategy::Token { .. } => "token",
            ResolverStrategy::Custom { .. } => "custom",
            ResolverStrategy::Unconfigured => "unconfigured",
        }
    }

    /// Resolver request URL for `input`, or `None` when unconfigured.
    pub fn request_url(&self, input: &str) -> Option<String> {
        match self {
            ResolverStrategy::Token { endpoint, token } => Some(append_query(
                endpoint,
                &[("ndus", token.as_str()), ("url", input)],
            )),
            ResolverStrategy::Custom { base_url } => {
                Some(append_query(base_url, &[("url", input)]))
            }
            ResolverStrategy::Unconfigured => None,
        }
    }

    fn source(&self) -> ResolutionSource {
        match self {
            ResolverStrategy::Token { .. } => ResolutionSource::TokenService,
            ResolverStrategy::Custom { .. } | ResolverStrategy::Unconfigured => {
                ResolutionSource::CustomEndpoint
            }
        }
    }

    /// Pull the direct link out of a resolver response.
    fn extract_direct_link(&self, body: &Value) -> Option<String> {
        let top_level = DIRECT_LINK_FIELDS
            .iter()
            .find_map(|field| non_empty_str(body.get(field)));

        match self {
            ResolverStrategy::Custom { .. } => top_level.or_else(|| {
                let data = body.get("data")?;
                NESTED_LINK_FIELDS
                    .iter()
                    .find_map(|field| non_empty_str(data.get(field)))
            }),
            _ => top_level,
        }
    }
}

/// Append `params` to `base`, joining with `&` when it already carries a query.
fn append_query(base: &str, params: &[(&str, &str)]) -> String {
    let mut out = base.to_string();
    for (i, (key, value)) in params.iter().enumerate() {
        let joiner = if i == 0 && !base.contains('?') { '?' } else { '&' };
        out.push(joiner);
        out.push_str(key);
        out.push('=');
        out.push_str(&urlencoding::encode(value));
    }
    out
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Turns user-supplied links into directly fetchable locations.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    client: Client,
    strategy: ResolverStrategy,
    matcher: ShareLinkMatcher,
}

impl LinkResolver {
    pub fn new(client: Client, strategy: ResolverStrategy) -> Self {
        Self {
            client,
            strategy,
            matcher: is_terabox_share,
        }
    }

    /// Replace the share-link predicate.
    pub fn with_matcher(mut self, matcher: ShareLinkMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn strategy(&self) -> &ResolverStrategy {
        &self.strategy
    }

    /// Whether `input` is a share link that needs a resolver round-trip.
    pub fn needs_resolution(&self, input: &str) -> bool {
        Url::parse(input).map(|url| (self.matcher)(&url)).unwrap_or(false)
    }

    /// Resolve `input` within `deadline`.
    pub async fn resolve(&self, input: &str, deadline: &Deadline) -> Result<ResolvedLocation> {
        if !self.needs_resolution(input) {
            return Ok(ResolvedLocation::direct(input));
        }

        let Some(request_url) = self.strategy.request_url(input) else {
            tracing::warn!("Share link received but no resolver is configured");
            return Err(Error::resolution("No TeraBox resolver configured"));
        };

        tracing::debug!(strategy = self.strategy.name(), "Resolving share link");

        let body = deadline
            .run(async {
                let response = self
                    .client
                    .get(&request_url)
                    .send()
                    .await
                    .map_err(|e| {
                        deadline.classify(e, |e| {
                            Error::resolution(format!("Resolver unreachable: {}", e))
                        })
                    })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(Error::resolution(format!(
                        "Resolver error ({})",
                        status.as_u16()
                    )));
                }

                response.json::<Value>().await.map_err(|e| {
                    deadline.classify(e, |_| {
                        Error::resolution("Resolver returned an invalid JSON response")
                    })
                })
            })
            .await?;

        let direct = self
            .strategy
            .extract_direct_link(&body)
            .ok_or_else(|| Error::resolution("Resolver response missing direct link"))?;

        tracing::info!(strategy = self.strategy.name(), "Resolved share link");
        Ok(ResolvedLocation::resolved(direct, self.strategy.source()))
    }
}
