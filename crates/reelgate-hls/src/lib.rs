//! Reelgate-HLS: manifest classification and proxy rewriting.
//!
//! # Modules
//!
//! - `playlist` - line classification and manifest detection
//! - `rewrite` - routing every URI reference back through the proxy
//!
//! The crate does not know which hosts are allowed. Callers hand the
//! rewriter a predicate; a single rejected URI aborts the whole rewrite.

pub mod error;
pub mod playlist;
pub mod rewrite;

pub use error::{Error, Result};
pub use playlist::{is_manifest, PlaylistLine, MANIFEST_CONTENT_TYPE};
pub use rewrite::{PlaylistRewriter, DEFAULT_PROXY_PATH};
