//! MCP tool implementations.
//!
//! The three lifecycle hooks exposed to the hosting side.

pub mod activate;
pub mod install;
pub mod intercept;
