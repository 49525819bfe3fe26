//! Core of httpcache: a persistent fetch cache for web resources.
//!
//! This crate provides:
//! - Record store with SQLite backend
//! - Blob store for payloads kept on disk
//! - Redirect-chain decomposition and resolution
//! - Unified error types
//! - Configuration structures

pub mod blob;
pub mod cache;
pub mod config;
pub mod error;
pub mod hops;
pub mod record;
pub mod slug;
pub mod store;
pub mod transport;

pub use blob::BlobStore;
pub use cache::{Cache, CacheOptions};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use hops::{Hop, HopChain, UnreachablePolicy};
pub use record::{Content, ListEntry, Record};
pub use store::{InsertOutcome, RecordStore};
pub use transport::{Exchange, Fetched, ResponseHeaders, TerminalResponse, Transport, TransportFailure};
