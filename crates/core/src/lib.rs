//! Core types and shared functionality for waystation.
//!
//! This crate provides:
//! - Versioned response store (generations) with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, ResponseSnapshot, ResponseType, StoredEntry};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
