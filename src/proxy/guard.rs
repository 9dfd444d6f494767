//! Host allow-list guard.
//!
//! Decides whether a URL may be fetched by the proxy. The decision is a pure
//! function of the configured allow-list, the allow-any flag, the candidate
//! URL and the optional base host (the host of the manifest or request that
//! referenced the candidate).

use reelgate_common::{Error, Result};
use url::Url;

use crate::config::ProxyConfig;

#[derive(Debug, Clone, Default)]
pub struct HostGuard {
    allow_any: bool,
    allowed_hosts: Vec<String>,
}

impl HostGuard {
    /// Build a guard from raw host entries. Entries are trimmed, lowercased and
    /// stripped of leading/trailing dots; empty entries are dropped.
    pub fn new<I, S>(allowed_hosts: I, allow_any: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_hosts = allowed_hosts
            .into_iter()
            .map(|h| normalize_host(h.as_ref()))
            .filter(|h| !h.is_empty())
            .collect();

        Self {
            allow_any,
            allowed_hosts,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(&config.allowed_hosts, config.allow_any)
    }

    /// Whether every host passes (allow-any mode or an empty allow-list).
    pub fn is_open(&self) -> bool {
        self.allow_any || self.allowed_hosts.is_empty()
    }

    pub fn allowed_hosts(&self) -> &[String] {
        &self.allowed_hosts
    }

    /// Decide for a raw URL string. Unparseable URLs are rejected unless the
    /// guard is open.
    pub fn allowed(&self, candidate: &str, base_host: Option<&str>) -> bool {
        if self.is_open() {
            return true;
        }

        match Url::parse(candidate) {
            Ok(url) => self.allowed_url(&url, base_host),
            Err(_) => false,
        }
    }

    /// Decide for an already parsed URL.
    pub fn allowed_url(&self, url: &Url, base_host: Option<&str>) -> bool {
        if self.is_open() {
            return true;
        }

        let Some(host) = url.host_str().map(normalize_host) else {
            return false;
        };
        if host.is_empty() {
            return false;
        }

        if let Some(base) = base_host.map(normalize_host) {
            if !base.is_empty() && host == base {
                return true;
            }
        }

        self.allowed_hosts.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    /// Like [`allowed_url`](Self::allowed_url) but reports a rejection as
    /// [`Error::HostNotAllowed`].
    pub fn check(&self, url: &Url, base_host: Option<&str>) -> Result<()> {
        if self.allowed_url(url, base_host) {
            Ok(())
        } else {
            let host = url.host_str().unwrap_or(url.as_str());
            tracing::warn!(host, "Rejected host not on the proxy allow-list");
            Err(Error::host_not_allowed(host))
        }
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cdn_guard() -> HostGuard {
        HostGuard::new(["cdn.example.com"], false)
    }

    #[test]
    fn test_exact_and_subdomain_match() {
        let guard = cdn_guard();
        assert!(guard.allowed("https://cdn.example.com/x", None));
        assert!(guard.allowed("https://sub.cdn.example.com/x", None));
        assert!(!guard.allowed("https://evil.com/x", None));
    }

    #[test]
    fn test_suffix_must_be_a_label_boundary() {
        let guard = cdn_guard();
        assert!(!guard.allowed("https://evilcdn.example.com/x", None));
        assert!(!guard.allowed("https://example.com/x", None));
        assert!(!guard.allowed("https://cdn.example.com.evil.com/x", None));
    }

    #[test]
    fn test_base_host_is_allowed() {
        let guard = cdn_guard();
        assert!(guard.allowed("https://media.other.net/seg.ts", Some("media.other.net")));
        assert!(guard.allowed("https://MEDIA.other.net/seg.ts", Some("media.Other.net")));
        // only the exact base host, not its subdomains
        assert!(!guard.allowed("https://a.media.other.net/seg.ts", Some("media.other.net")));
        assert!(!guard.allowed("https://evil.com/seg.ts", Some("media.other.net")));
    }

    #[test]
    fn test_open_modes() {
        let empty = HostGuard::new(Vec::<String>::new(), false);
        assert!(empty.is_open());
        assert!(empty.allowed("https://anything.example/x", None));

        let any = HostGuard::new(["cdn.example.com"], true);
        assert!(any.is_open());
        assert!(any.allowed("https://evil.com/x", None));
    }

    #[test]
    fn test_malformed_urls_fail_closed() {
        let guard = cdn_guard();
        assert!(!guard.allowed("not a url", None));
        assert!(!guard.allowed("cdn.example.com/x", None));
        assert!(!guard.allowed("data:text/plain,hello", None));
    }

    #[test]
    fn test_entries_are_normalized() {
        let guard = HostGuard::new([" CDN.Example.com ", "", ".media.example.org."], false);
        assert_eq!(guard.allowed_hosts(), ["cdn.example.com", "media.example.org"]);
        assert!(guard.allowed("https://cdn.example.com./x", None));
    }

    #[test]
    fn test_decision_is_deterministic() {
        let guard = cdn_guard();
        let inputs = [
            ("https://cdn.example.com/x", None),
            ("https://evil.com/x", Some("cdn.example.com")),
            ("https://evil.com/x", Some("evil.com")),
        ];
        for (url, base) in inputs {
            let first = guard.allowed(url, base);
            for _ in 0..3 {
                assert_eq!(guard.allowed(url, base), first);
            }
        }
    }

    #[test]
    fn test_check_reports_host() {
        let guard = cdn_guard();
        let url = Url::parse("https://evil.com/movie.mp4").unwrap();
        match guard.check(&url, None) {
            Err(Error::HostNotAllowed { host }) => assert_eq!(host, "evil.com"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
