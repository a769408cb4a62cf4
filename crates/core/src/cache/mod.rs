//! SQLite-backed store of versioned response generations.
//!
//! A generation is a named container of request/response snapshots. This
//! module provides:
//!
//! - Request-identity keys using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent readers alongside write-back
//! - Whole-generation deletion with cascading entry removal

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{ResponseSnapshot, ResponseType, StoredEntry};
pub use hash::compute_cache_key;
