//! Network side of httpcache.
//!
//! This crate provides the reqwest-backed [`Transport`](httpcache_core::Transport)
//! and the request pacing wrapper used by the CLI.

pub mod fetch;
pub mod throttle;

pub use fetch::{FetchConfig, HttpTransport, TransportError};
pub use throttle::Throttle;
