//! Reelgate - streaming media proxy
//!
//! This library crate exposes the core functionality for integration testing.

pub mod catalog;
pub mod config;
pub mod proxy;
pub mod server;
pub mod streaming;
