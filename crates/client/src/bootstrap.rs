//! Bootstrap loader: pre-populates a generation with the asset manifest.
//!
//! Success is all-or-nothing. Every manifest URL is fetched concurrently and
//! must come back with a 2xx status; only then is the whole set written, in
//! a single transaction that also creates the generation.

use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;
use waystation_core::config::DEFAULT_MANIFEST;
use waystation_core::{AppConfig, CacheDb, Error, StoredEntry};

use crate::fetch::{Network, canonicalize};
use crate::request::InterceptedRequest;

/// Ordered list of assets needed to boot the application offline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<String>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new(DEFAULT_MANIFEST.iter().copied())
    }
}

impl Manifest {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { entries: entries.into_iter().map(Into::into).collect() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.manifest.iter().cloned())
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve every entry against the page origin.
    pub fn resolve(&self, origin: &Url) -> Result<Vec<Url>, Error> {
        self.entries
            .iter()
            .map(|entry| canonicalize(entry, origin).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}"))))
            .collect()
    }
}

/// Result of a successful bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub generation: String,
    /// False when an existing generation with this label was refilled.
    pub created: bool,
    /// Distinct entries in the generation afterwards.
    pub entries: u64,
}

/// Fetch the manifest into the generation named `version`.
///
/// # Errors
///
/// Returns `Error::BootstrapFailed` naming the first URL that could not be
/// fetched or answered with a non-2xx status. Nothing is written in that
/// case. Storage errors while committing are returned as-is.
pub async fn bootstrap(
    db: &CacheDb, network: Arc<dyn Network>, version: &str, manifest: &Manifest, origin: &Url,
) -> Result<BootstrapReport, Error> {
    let urls = manifest.resolve(origin)?;
    let existed = db.has_generation(version).await?;

    let mut join_set = JoinSet::new();
    for (index, url) in urls.into_iter().enumerate() {
        let network = network.clone();
        join_set.spawn(async move {
            let request = InterceptedRequest::get(url);
            let result = network.fetch(&request).await;
            (index, request.url, result)
        });
    }

    let mut fetched = Vec::with_capacity(manifest.len());
    while let Some(joined) = join_set.join_next().await {
        let (index, url, result) = joined.map_err(|e| Error::BootstrapFailed {
            url: "<manifest>".to_string(),
            reason: format!("fetch task failed: {e}"),
        })?;

        let failure = match result {
            Ok(response) if response.status.is_success() => {
                fetched.push((index, StoredEntry::new("GET", url.as_str(), response.to_snapshot())));
                continue;
            }
            Ok(response) => format!("status {}", response.status.as_u16()),
            Err(e) => e.to_string(),
        };

        join_set.shutdown().await;
        tracing::warn!(version, url = %url, reason = %failure, "bootstrap failed");
        return Err(Error::BootstrapFailed { url: url.to_string(), reason: failure });
    }

    fetched.sort_by_key(|(index, _)| *index);
    let entries: Vec<StoredEntry> = fetched.into_iter().map(|(_, entry)| entry).collect();
    db.put_entries(version, entries).await?;

    let report = BootstrapReport { generation: version.to_string(), created: !existed, entries: db.generation_len(version).await? };
    tracing::info!(version, entries = report.entries, created = report.created, "bootstrap complete");
    Ok(report)
}
