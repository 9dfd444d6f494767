//! Proxy core: allow-list guard, share-link resolver and deadlines.
//!
//! [`Proxy`] bundles the process-wide pieces built once from configuration:
//! the outbound HTTP client, the [`HostGuard`], the [`LinkResolver`] and the
//! manifest rewriter. Handlers share it through `Arc` and never mutate it.

pub mod deadline;
pub mod guard;
pub mod resolver;

pub use deadline::Deadline;
pub use guard::HostGuard;
pub use resolver::{is_terabox_share, LinkResolver, ResolverStrategy, ShareLinkMatcher};

use std::sync::Arc;
use std::time::Duration;

use reelgate_common::{Error, ResolvedLocation, Result};
use reelgate_hls::PlaylistRewriter;
use reqwest::{redirect, Client};
use url::Url;

use crate::config::Config;

/// Maximum redirect hops followed for a single fetch.
const MAX_REDIRECTS: usize = 10;

/// Raised by the redirect policy when a hop leaves the allow-list.
#[derive(Debug, thiserror::Error)]
#[error("redirect to disallowed host {host}")]
pub struct RedirectBlocked {
    pub host: String,
}

pub struct Proxy {
    client: Client,
    guard: Arc<HostGuard>,
    resolver: LinkResolver,
    rewriter: PlaylistRewriter,
    upstream_timeout: Duration,
}

impl Proxy {
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            HostGuard::from_config(&config.proxy),
            ResolverStrategy::from_config(&config.resolver),
            config.proxy.upstream_timeout(),
        )
    }

    pub fn new(guard: HostGuard, strategy: ResolverStrategy, upstream_timeout: Duration) -> Result<Self> {
        let guard = Arc::new(guard);
        let client = build_client(guard.clone())
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            resolver: LinkResolver::new(client.clone(), strategy),
            client,
            guard,
            rewriter: PlaylistRewriter::default(),
            upstream_timeout,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn guard(&self) -> &HostGuard {
        &self.guard
    }

    pub fn resolver(&self) -> &LinkResolver {
        &self.resolver
    }

    pub fn rewriter(&self) -> &PlaylistRewriter {
        &self.rewriter
    }

    pub fn upstream_timeout(&self) -> Duration {
        self.upstream_timeout
    }

    /// A fresh deadline for one outbound operation.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.upstream_timeout)
    }

    /// Run the link resolver under its own deadline.
    pub async fn resolve(&self, input: &str) -> Result<ResolvedLocation> {
        self.resolver.resolve(input, &self.deadline()).await
    }

    /// Parse a fetch target and run it through the guard.
    pub fn validate_target(&self, raw: &str) -> Result<Url> {
        let url = Url::parse(raw.trim())
            .map_err(|e| Error::validation(format!("Invalid target URL: {}", e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::validation(format!(
                "Unsupported URL scheme '{}'",
                url.scheme()
            )));
        }

        self.guard.check(&url, None)?;
        Ok(url)
    }
}

/// Outbound client whose redirect policy re-checks every hop against the guard,
/// using the originally requested host as the base host.
fn build_client(guard: Arc<HostGuard>) -> reqwest::Result<Client> {
    let policy = redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }

        let base_host = attempt
            .previous()
            .first()
            .and_then(|u| u.host_str())
            .map(str::to_string);
        let allowed = guard.allowed_url(attempt.url(), base_host.as_deref());

        if allowed {
            attempt.follow()
        } else {
            let host = attempt.url().host_str().unwrap_or_default().to_string();
            tracing::warn!(host = %host, "Blocked redirect to disallowed host");
            attempt.error(RedirectBlocked { host })
        }
    });

    Client::builder()
        .redirect(policy)
        .user_agent(concat!("reelgate/", env!("CARGO_PKG_VERSION")))
        .build()
}
