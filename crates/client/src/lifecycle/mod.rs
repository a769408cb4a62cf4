//! Lifecycle controller for one version of the interception layer.
//!
//! States run `Installing -> Waiting -> Active`, and end in `Redundant` once
//! a newer version takes over. `install` fills the generation from the
//! manifest, `activate` reaps every other generation, and `intercept` only
//! routes requests while `Active`; in any other state it passes them
//! through so whichever layer holds control keeps answering.
//!
//! The host side of the lifecycle (supersession, client claiming) lives in
//! [`registration`].

pub mod registration;

pub use registration::{RegisterOutcome, Registration};

use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use url::Url;
use waystation_core::{AppConfig, CacheDb, Error};

use crate::bootstrap::{BootstrapReport, Manifest, bootstrap};
use crate::fetch::Network;
use crate::offline::OfflinePage;
use crate::reaper::{ReapReport, reap};
use crate::request::InterceptedRequest;
use crate::response::Routed;
use crate::router::RequestRouter;

/// Lifecycle state of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing,
    Waiting,
    Active,
    Redundant,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Installing => "installing",
            LifecycleState::Waiting => "waiting",
            LifecycleState::Active => "active",
            LifecycleState::Redundant => "redundant",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State machine for one layer version, injected with its store and network.
pub struct LifecycleController {
    version: String,
    manifest: Manifest,
    origin: Url,
    skip_waiting: bool,
    db: CacheDb,
    network: Arc<dyn Network>,
    router: RequestRouter,
    state: RwLock<LifecycleState>,
    transition: Mutex<()>,
}

impl LifecycleController {
    pub fn new(
        version: impl Into<String>, manifest: Manifest, origin: Url, db: CacheDb, network: Arc<dyn Network>,
        offline: OfflinePage,
    ) -> Self {
        let version = version.into();
        let router = RequestRouter::new(db.clone(), network.clone(), origin.clone(), version.clone(), offline);
        Self {
            version,
            manifest,
            origin,
            skip_waiting: true,
            db,
            network,
            router,
            state: RwLock::new(LifecycleState::Installing),
            transition: Mutex::new(()),
        }
    }

    /// Build a controller for the configured version.
    pub fn from_config(config: &AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::new(
            config.cache_version.clone(),
            Manifest::from_config(config),
            origin,
            db,
            network,
            OfflinePage::new(&config.app_name),
        )
        .with_skip_waiting(config.skip_waiting))
    }

    /// Whether this version supersedes an active one without waiting.
    pub fn with_skip_waiting(mut self, skip_waiting: bool) -> Self {
        self.skip_waiting = skip_waiting;
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// Install hook: populate this version's generation from the manifest.
    ///
    /// On failure the controller stays `Installing` and may be retried.
    ///
    /// # Errors
    ///
    /// `Error::InvalidState` unless `Installing`; `Error::BootstrapFailed`
    /// if any manifest asset could not be fetched.
    pub async fn install(&self) -> Result<BootstrapReport, Error> {
        let _guard = self.transition.lock().await;
        self.expect_state(LifecycleState::Installing, "install").await?;

        tracing::info!(version = %self.version, "installing");
        let report = bootstrap(&self.db, self.network.clone(), &self.version, &self.manifest, &self.origin).await?;

        *self.state.write().await = LifecycleState::Waiting;
        tracing::info!(version = %self.version, entries = report.entries, "installed, waiting to activate");
        Ok(report)
    }

    /// Activate hook: reap stale generations and start intercepting.
    ///
    /// Reap failures are tolerated; they are in the returned report.
    ///
    /// # Errors
    ///
    /// `Error::InvalidState` unless `Waiting`; storage errors if the
    /// generation list cannot be read.
    pub async fn activate(&self) -> Result<ReapReport, Error> {
        let _guard = self.transition.lock().await;
        self.expect_state(LifecycleState::Waiting, "activate").await?;

        tracing::info!(version = %self.version, "activating");
        let report = reap(&self.db, &self.version).await?;

        *self.state.write().await = LifecycleState::Active;
        tracing::info!(
            version = %self.version,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "active"
        );
        Ok(report)
    }

    /// Intercept hook: route a request if this controller is active.
    pub async fn intercept(&self, request: &InterceptedRequest) -> Result<Routed, Error> {
        if self.state().await != LifecycleState::Active {
            return Ok(Routed::Passthrough);
        }
        self.router.route(request).await
    }

    /// Wait for in-flight write-backs.
    pub async fn settle(&self) {
        self.router.settle().await;
    }

    pub(crate) async fn retire(&self) {
        let _guard = self.transition.lock().await;
        *self.state.write().await = LifecycleState::Redundant;
        tracing::info!(version = %self.version, "superseded");
    }

    async fn expect_state(&self, expected: LifecycleState, hook: &str) -> Result<(), Error> {
        let current = self.state().await;
        if current != expected {
            return Err(Error::InvalidState(format!("{hook} requires state {expected}, controller is {current}")));
        }
        Ok(())
    }
}
