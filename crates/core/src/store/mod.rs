//! SQLite-backed record store.
//!
//! One row per hop URL, unique on `url`. Access is async via
//! tokio-rusqlite, which runs rusqlite on a background thread:
//!
//! - Automatic schema migrations
//! - Inserts never overwrite; a duplicate URL reports a conflict
//! - Every mutation is committed before the call returns

pub mod connection;
pub mod migrations;
pub mod records;

pub use crate::Error;

pub use connection::RecordStore;
pub use records::InsertOutcome;
