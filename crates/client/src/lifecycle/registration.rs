//! Host side of the lifecycle: which controller is in charge.
//!
//! A `Registration` holds at most one active and one waiting controller for
//! an origin. Registering a new version installs it, then either activates it
//! straight away (skip-waiting, or nothing active yet) or parks it until
//! `activate_waiting`. Activation retires the previous controller and claims
//! every client by publishing the new version on a watch channel.

use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, watch};
use waystation_core::Error;

use super::LifecycleController;
use crate::bootstrap::BootstrapReport;
use crate::fetch::Network;
use crate::reaper::ReapReport;
use crate::request::InterceptedRequest;
use crate::response::{ResponseSource, Routed, Served};

/// What happened to a registered controller.
#[derive(Debug, Clone)]
pub enum RegisterOutcome {
    /// Installed and now controlling all clients.
    Activated { bootstrap: BootstrapReport, reap: ReapReport },
    /// Installed; waiting for the active version to be released.
    Waiting { bootstrap: BootstrapReport },
}

/// Active/waiting controller slots for one origin.
pub struct Registration {
    network: Arc<dyn Network>,
    active: RwLock<Option<Arc<LifecycleController>>>,
    waiting: Mutex<Option<Arc<LifecycleController>>>,
    controller_tx: watch::Sender<Option<String>>,
    updating: Mutex<()>,
}

impl Registration {
    /// `network` answers requests no controller intercepts.
    pub fn new(network: Arc<dyn Network>) -> Self {
        let (controller_tx, _) = watch::channel(None);
        Self {
            network,
            active: RwLock::new(None),
            waiting: Mutex::new(None),
            controller_tx,
            updating: Mutex::new(()),
        }
    }

    /// Install a controller and promote it when allowed.
    ///
    /// # Errors
    ///
    /// Install errors are returned unchanged and leave the current active
    /// controller in charge.
    pub async fn register(&self, controller: Arc<LifecycleController>) -> Result<RegisterOutcome, Error> {
        let _guard = self.updating.lock().await;

        let bootstrap = controller.install().await?;

        let has_active = self.active.read().await.is_some();
        if controller.skip_waiting() || !has_active {
            let reap = self.promote(controller).await?;
            return Ok(RegisterOutcome::Activated { bootstrap, reap });
        }

        let previous = self.waiting.lock().await.replace(controller.clone());
        if let Some(previous) = previous {
            previous.retire().await;
        }
        tracing::info!(version = %controller.version(), "waiting for active version to be released");
        Ok(RegisterOutcome::Waiting { bootstrap })
    }

    /// Promote the waiting controller, if any.
    ///
    /// # Errors
    ///
    /// `Error::InvalidState` when nothing is waiting.
    pub async fn activate_waiting(&self) -> Result<ReapReport, Error> {
        let _guard = self.updating.lock().await;

        let controller = self
            .waiting
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::InvalidState("no version is waiting to activate".to_string()))?;
        self.promote(controller).await
    }

    /// Answer a request the way the page would see it.
    ///
    /// The active controller routes it; passthrough requests, and all
    /// requests while nothing is active, go to the network unmodified.
    pub async fn dispatch(&self, request: &InterceptedRequest) -> Result<Served, Error> {
        let active = self.active.read().await.clone();
        if let Some(controller) = active
            && let Routed::Served(served) = controller.intercept(request).await?
        {
            return Ok(served);
        }

        let response = self.network.fetch(request).await?;
        Ok(Served { response, source: ResponseSource::Network })
    }

    pub async fn active(&self) -> Option<Arc<LifecycleController>> {
        self.active.read().await.clone()
    }

    pub async fn waiting(&self) -> Option<Arc<LifecycleController>> {
        self.waiting.lock().await.clone()
    }

    /// Clients observe the controlling version here.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.controller_tx.subscribe()
    }

    async fn promote(&self, controller: Arc<LifecycleController>) -> Result<ReapReport, Error> {
        let reap = controller.activate().await?;

        let previous = self.active.write().await.replace(controller.clone());
        if let Some(previous) = previous
            && !Arc::ptr_eq(&previous, &controller)
        {
            previous.retire().await;
        }

        // A version parked behind the old active one is older than this one.
        let parked = self.waiting.lock().await.take();
        if let Some(parked) = parked
            && !Arc::ptr_eq(&parked, &controller)
        {
            parked.retire().await;
        }

        self.controller_tx.send_replace(Some(controller.version().to_string()));
        tracing::info!(version = %controller.version(), "claimed clients");
        Ok(reap)
    }
}
