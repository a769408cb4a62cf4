//! Request interception layer for waystation.
//!
//! This crate provides the network boundary, the bootstrap loader and
//! generation reaper, the per-request router with offline fallback, and
//! the lifecycle controller that sequences them.

pub mod bootstrap;
pub mod fetch;
pub mod lifecycle;
pub mod offline;
pub mod reaper;
pub mod request;
pub mod response;
pub mod router;

#[cfg(test)]
pub(crate) mod testing;

pub use bootstrap::{BootstrapReport, Manifest, bootstrap};
pub use fetch::{FetchConfig, HttpNetwork, Network, NetworkError};
pub use lifecycle::{LifecycleController, LifecycleState, RegisterOutcome, Registration};
pub use offline::OfflinePage;
pub use reaper::{ReapReport, reap};
pub use request::{InterceptedRequest, RequestMode};
pub use response::{Response, ResponseSource, Routed, Served};
pub use router::RequestRouter;

pub use reqwest::{Method, StatusCode, header};
