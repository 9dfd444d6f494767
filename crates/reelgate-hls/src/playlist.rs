//! Manifest line classification.

use url::Url;

/// Media type served for rewritten manifests.
pub const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// Content types that identify an HLS manifest regardless of URL shape.
const MANIFEST_CONTENT_TYPES: &[&str] = &[
    MANIFEST_CONTENT_TYPE,
    "application/x-mpegurl",
    "audio/mpegurl",
    "audio/x-mpegurl",
];

/// One line of an M3U8 manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistLine<'a> {
    /// Empty or whitespace-only.
    Blank(&'a str),
    /// Tag or comment (`#EXTM3U`, `#EXTINF:...`, `#EXT-X-STREAM-INF:...`).
    Directive(&'a str),
    /// A segment or variant playlist reference, trimmed.
    Uri(&'a str),
}

impl<'a> PlaylistLine<'a> {
    /// Classify a single raw line.
    pub fn classify(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            PlaylistLine::Blank(line)
        } else if trimmed.starts_with('#') {
            PlaylistLine::Directive(line)
        } else {
            PlaylistLine::Uri(trimmed)
        }
    }
}

/// Whether a fetched resource should be treated as an HLS manifest.
///
/// Either the URL path ends in `.m3u8` or the upstream declared one of the
/// mpegurl content types.
pub fn is_manifest(url: &Url, content_type: Option<&str>) -> bool {
    if let Some(content_type) = content_type {
        let content_type = content_type.to_ascii_lowercase();
        if MANIFEST_CONTENT_TYPES
            .iter()
            .any(|known| content_type.contains(known))
        {
            return true;
        }
    }

    url.path().to_ascii_lowercase().ends_with(".m3u8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_lines() {
        assert_eq!(PlaylistLine::classify(""), PlaylistLine::Blank(""));
        assert_eq!(PlaylistLine::classify("   "), PlaylistLine::Blank("   "));
        assert_eq!(
            PlaylistLine::classify("#EXTM3U"),
            PlaylistLine::Directive("#EXTM3U")
        );
        assert_eq!(
            PlaylistLine::classify("#EXT-X-STREAM-INF:BANDWIDTH=800000"),
            PlaylistLine::Directive("#EXT-X-STREAM-INF:BANDWIDTH=800000")
        );
        assert_eq!(
            PlaylistLine::classify("  seg1.ts\r"),
            PlaylistLine::Uri("seg1.ts")
        );
    }

    #[test]
    fn test_directive_with_leading_space() {
        assert_eq!(
            PlaylistLine::classify("  #EXT-X-ENDLIST"),
            PlaylistLine::Directive("  #EXT-X-ENDLIST")
        );
    }

    #[test]
    fn test_detects_manifest_by_suffix() {
        let url = Url::parse("https://cdn.example.com/path/Master.M3U8?token=1").unwrap();
        assert!(is_manifest(&url, None));

        let url = Url::parse("https://cdn.example.com/video.mp4").unwrap();
        assert!(!is_manifest(&url, Some("video/mp4")));
    }

    #[test]
    fn test_detects_manifest_by_content_type() {
        let url = Url::parse("https://cdn.example.com/playlist").unwrap();
        assert!(is_manifest(
            &url,
            Some("application/vnd.apple.mpegurl; charset=utf-8")
        ));
        assert!(is_manifest(&url, Some("application/x-mpegURL")));
        assert!(!is_manifest(&url, Some("application/octet-stream")));
    }
}
