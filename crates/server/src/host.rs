//! Hosting runtime state shared by the tools.

use std::sync::Arc;
use url::Url;
use waystation_client::{LifecycleController, Network, Registration};
use waystation_core::{AppConfig, CacheDb, Error};

/// One origin's store, network and registration.
pub struct Host {
    config: AppConfig,
    origin: Url,
    db: CacheDb,
    network: Arc<dyn Network>,
    registration: Registration,
}

impl Host {
    pub fn new(config: AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let registration = Registration::new(network.clone());
        Ok(Self { config, origin, db, network, registration })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    /// Build a controller for the configured version, or an override.
    pub fn controller(
        &self, version: Option<String>, skip_waiting: Option<bool>,
    ) -> Result<Arc<LifecycleController>, Error> {
        let mut config = self.config.clone();
        if let Some(version) = version {
            config.cache_version = version;
        }
        if let Some(skip_waiting) = skip_waiting {
            config.skip_waiting = skip_waiting;
        }
        config.validate().map_err(|e| Error::InvalidInput(e.to_string()))?;

        let controller = LifecycleController::from_config(&config, self.db.clone(), self.network.clone())?;
        Ok(Arc::new(controller))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_controller_override() {
        let (host, _) = stub::host().await;
        let controller = host.controller(Some("doc-rocker-v2".into()), Some(false)).unwrap();
        assert_eq!(controller.version(), "doc-rocker-v2");
        assert!(!controller.skip_waiting());
    }

    #[tokio::test]
    async fn test_controller_rejects_blank_version() {
        let (host, _) = stub::host().await;
        assert!(matches!(host.controller(Some(" ".into()), None), Err(Error::InvalidInput(_))));
    }
}
