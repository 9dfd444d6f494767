//! Manifest rewriting.
//!
//! Every URI reference in a manifest (media segment or variant playlist) is
//! resolved against the manifest URL, checked by the caller's predicate and
//! replaced with a reference to the proxy's own stream endpoint. Tags and
//! blank lines pass through untouched, so the rewritten manifest has the same
//! number of lines in the same order.

use url::Url;

use crate::error::{Error, Result};
use crate::playlist::PlaylistLine;

/// Default path of the proxy's URL-carrying stream endpoint.
pub const DEFAULT_PROXY_PATH: &str = "/api/stream";

/// Rewrites manifests so that clients fetch every referenced URI through the proxy.
#[derive(Debug, Clone)]
pub struct PlaylistRewriter {
    proxy_path: String,
}

impl Default for PlaylistRewriter {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_PATH)
    }
}

impl PlaylistRewriter {
    /// Create a rewriter pointing references at `proxy_path`.
    pub fn new(proxy_path: impl Into<String>) -> Self {
        Self {
            proxy_path: proxy_path.into(),
        }
    }

    /// Proxy-relative reference carrying `absolute` as an escaped query parameter.
    pub fn proxy_reference(&self, absolute: &Url) -> String {
        format!(
            "{}?url={}",
            self.proxy_path,
            urlencoding::encode(absolute.as_str())
        )
    }

    /// Rewrite `manifest`, fetched from `base`.
    ///
    /// `allow` is consulted for every resolved URI. The first rejection (or
    /// unresolvable URI) aborts the rewrite; no partial manifest is produced.
    pub fn rewrite<F>(&self, manifest: &str, base: &Url, mut allow: F) -> Result<String>
    where
        F: FnMut(&Url) -> bool,
    {
        let mut out = Vec::with_capacity(manifest.len() / 32 + 1);

        for raw in manifest.split('\n') {
            match PlaylistLine::classify(raw) {
                PlaylistLine::Blank(line) | PlaylistLine::Directive(line) => {
                    out.push(line.to_string());
                }
                PlaylistLine::Uri(reference) => {
                    let absolute = base.join(reference).map_err(|e| Error::InvalidUri {
                        uri: reference.to_string(),
                        reason: e.to_string(),
                    })?;

                    if !allow(&absolute) {
                        return Err(Error::SegmentNotAllowed {
                            uri: absolute.to_string(),
                        });
                    }

                    let mut line = self.proxy_reference(&absolute);
                    // CRLF manifests keep their terminator
                    if raw.ends_with('\r') {
                        line.push('\r');
                    }
                    out.push(line);
                }
            }
        }

        Ok(out.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://cdn.example.com/path/master.m3u8").unwrap()
    }

    fn cdn_only(url: &Url) -> bool {
        url.host_str() == Some("cdn.example.com")
    }

    #[test]
    fn test_rewrites_relative_segment() {
        let rewriter = PlaylistRewriter::default();
        let out = rewriter
            .rewrite("#EXTM3U\n#EXTINF:10,\nseg1.ts", &base(), cdn_only)
            .unwrap();

        let lines: Vec<&str> = out.split('\n').collect();
        assert_eq!(lines[0], "#EXTM3U");
        assert_eq!(lines[1], "#EXTINF:10,");
        assert_eq!(
            lines[2],
            "/api/stream?url=https%3A%2F%2Fcdn.example.com%2Fpath%2Fseg1.ts"
        );
    }

    #[test]
    fn test_rewrites_absolute_and_root_relative_references() {
        let rewriter = PlaylistRewriter::default();
        let manifest = "#EXTM3U\n/other/seg2.ts\nhttps://cdn.example.com/abs/seg3.ts?sig=a&b=c";
        let out = rewriter.rewrite(manifest, &base(), cdn_only).unwrap();
        let lines: Vec<&str> = out.split('\n').collect();
        assert_eq!(
            lines[1],
            "/api/stream?url=https%3A%2F%2Fcdn.example.com%2Fother%2Fseg2.ts"
        );
        assert_eq!(
            lines[2],
            "/api/stream?url=https%3A%2F%2Fcdn.example.com%2Fabs%2Fseg3.ts%3Fsig%3Da%26b%3Dc"
        );
    }

    #[test]
    fn test_master_playlist_variants_are_rewritten_like_segments() {
        let rewriter = PlaylistRewriter::default();
        let manifest = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1280000,RESOLUTION=1280x720\n720p/index.m3u8\n";
        let out = rewriter.rewrite(manifest, &base(), cdn_only).unwrap();
        assert_eq!(
            out,
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1280000,RESOLUTION=1280x720\n\
             /api/stream?url=https%3A%2F%2Fcdn.example.com%2Fpath%2F720p%2Findex.m3u8\n"
        );
    }

    #[test]
    fn test_disallowed_segment_aborts_whole_rewrite() {
        let rewriter = PlaylistRewriter::default();
        let manifest = "#EXTM3U\n#EXTINF:10,\nseg1.ts\n#EXTINF:10,\nhttps://evil.com/seg2.ts";
        let err = rewriter.rewrite(manifest, &base(), cdn_only).unwrap_err();
        match err {
            Error::SegmentNotAllowed { uri } => assert_eq!(uri, "https://evil.com/seg2.ts"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_preserves_crlf_and_blank_lines() {
        let rewriter = PlaylistRewriter::new("/proxy");
        let out = rewriter
            .rewrite("#EXTM3U\r\n\r\nseg1.ts\r\n", &base(), |_| true)
            .unwrap();
        assert_eq!(
            out,
            "#EXTM3U\r\n\r\n/proxy?url=https%3A%2F%2Fcdn.example.com%2Fpath%2Fseg1.ts\r\n"
        );
    }

    #[test]
    fn test_predicate_sees_every_uri_once() {
        let rewriter = PlaylistRewriter::default();
        let mut seen = Vec::new();
        rewriter
            .rewrite("#EXTM3U\na.ts\n#comment\nb.ts", &base(), |url| {
                seen.push(url.to_string());
                true
            })
            .unwrap();
        assert_eq!(
            seen,
            vec![
                "https://cdn.example.com/path/a.ts",
                "https://cdn.example.com/path/b.ts"
            ]
        );
    }
}
