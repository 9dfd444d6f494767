//! Reelgate-Common: shared error taxonomy and resolver types.
//!
//! This crate provides the pieces every reelgate component agrees on:
//!
//! - **Error Handling**: the proxy [`Error`] taxonomy and its HTTP status mapping
//! - **Resolver Types**: [`ResolvedLocation`] and [`ResolutionSource`]
//!
//! # Examples
//!
//! ```
//! use reelgate_common::{Error, ResolvedLocation};
//!
//! let location = ResolvedLocation::direct("https://cdn.example.com/movie.mp4");
//! assert!(!location.resolved);
//!
//! let err = Error::Timeout { after_secs: 15 };
//! assert_eq!(err.http_status(), 504);
//! ```

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
