//! Per-request routing: cache-first, network on miss, offline fallback.
//!
//! ### Order of evaluation
//! 1. Non-GET or cross-origin requests pass through without touching the
//!    store.
//! 2. A hit in the current generation is returned as-is. Entries never
//!    expire; only reaping the generation removes them.
//! 3. A miss goes to the network. The response is always returned; a copy is
//!    written back only if it is a `basic` 200 for a URL carrying one of the
//!    cacheable markers.
//! 4. If the network yields nothing, navigations get the offline page and
//!    everything else fails.
//!
//! Write-back runs in a spawned task on a forked copy of the response, so a
//! slow or failing store never delays or alters what the caller receives.

use reqwest::{Method, StatusCode};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use url::Url;
use waystation_core::cache::compute_cache_key;
use waystation_core::{CacheDb, Error, ResponseSnapshot, ResponseType, StoredEntry};

use crate::fetch::{Network, is_same_origin};
use crate::offline::OfflinePage;
use crate::request::InterceptedRequest;
use crate::response::{Response, ResponseSource, Routed, Served};

/// URL fragments that mark a response as a static asset worth keeping.
pub const CACHEABLE_MARKERS: &[&str] = &[".css", ".js", ".png", ".jpg", ".webp", "/favicon."];

/// True if the URL contains one of the cacheable markers anywhere.
pub fn is_cacheable_url(url: &Url) -> bool {
    let s = url.as_str();
    CACHEABLE_MARKERS.iter().any(|marker| s.contains(marker))
}

/// Write-back gate: exactly 200, same-origin `basic`, cacheable URL.
pub fn is_write_back_eligible(request_url: &Url, response: &Response) -> bool {
    response.status == StatusCode::OK && response.response_type == ResponseType::Basic && is_cacheable_url(request_url)
}

/// Routes intercepted requests against one generation.
pub struct RequestRouter {
    db: CacheDb,
    network: Arc<dyn Network>,
    origin: Url,
    version: String,
    offline: OfflinePage,
    write_backs: Mutex<Vec<JoinHandle<()>>>,
}

impl RequestRouter {
    pub fn new(db: CacheDb, network: Arc<dyn Network>, origin: Url, version: String, offline: OfflinePage) -> Self {
        Self { db, network, origin, version, offline, write_backs: Mutex::new(Vec::new()) }
    }

    /// Generation this router reads from and writes to.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Only same-origin GETs are intercepted.
    pub fn is_eligible(&self, request: &InterceptedRequest) -> bool {
        request.method == Method::GET && is_same_origin(&request.url, &self.origin)
    }

    /// Decide how to answer one request.
    ///
    /// # Errors
    ///
    /// Returns `Error::Network` when the network is unreachable for a
    /// non-navigation request that has no cached entry.
    pub async fn route(&self, request: &InterceptedRequest) -> Result<Routed, Error> {
        if !self.is_eligible(request) {
            tracing::debug!(method = %request.method, url = %request.url, "passing through");
            return Ok(Routed::Passthrough);
        }

        if let Some(response) = self.lookup(request).await {
            tracing::debug!("cache hit for {}", request.url);
            return Ok(Routed::Served(Served { response, source: ResponseSource::Cache }));
        }
        tracing::debug!("cache miss for {}", request.url);

        match self.network.fetch(request).await {
            Ok(response) => {
                let response = if is_write_back_eligible(&request.url, &response) {
                    let (response, snapshot) = response.fork();
                    self.spawn_write_back(&request.url, snapshot);
                    response
                } else {
                    response
                };
                Ok(Routed::Served(Served { response, source: ResponseSource::Network }))
            }
            Err(e) if request.is_navigation() => {
                tracing::info!(url = %request.url, error = %e, "network unavailable, serving offline page");
                Ok(Routed::Served(Served { response: self.offline.response(&request.url), source: ResponseSource::Offline }))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Wait for every write-back spawned so far.
    pub async fn settle(&self) {
        let pending = std::mem::take(&mut *self.write_backs.lock().unwrap_or_else(|e| e.into_inner()));
        for handle in pending {
            let _ = handle.await;
        }
    }

    async fn lookup(&self, request: &InterceptedRequest) -> Option<Response> {
        let key = compute_cache_key(request.method.as_str(), request.url.as_str(), "");
        match self.db.match_entry(&self.version, &key).await {
            Ok(Some(snapshot)) => match Response::from_snapshot(snapshot) {
                Ok(response) => Some(response),
                Err(e) => {
                    tracing::warn!(url = %request.url, error = %e, "ignoring unreadable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed, treating as miss");
                None
            }
        }
    }

    fn spawn_write_back(&self, request_url: &Url, snapshot: ResponseSnapshot) {
        let db = self.db.clone();
        let version = self.version.clone();
        let entry = StoredEntry::new(Method::GET.as_str(), request_url.as_str(), snapshot);

        let handle = tokio::spawn(async move {
            match db.put_entry(&version, &entry).await {
                Ok(()) => tracing::debug!("cached {}", entry.request_url),
                Err(e) => tracing::debug!(url = %entry.request_url, error = %e, "write-back dropped"),
            }
        });

        let mut pending = self.write_backs.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }
}
