//! Generation reaper: drops every generation except the current one.

use waystation_core::{CacheDb, Error};

/// Outcome of one reap pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Generations left in place because they match the current version.
    pub kept: Vec<String>,
    pub deleted: Vec<String>,
    /// Generations that could not be deleted, with the reason.
    pub failed: Vec<(String, String)>,
}

impl ReapReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delete all generations not named `version`.
///
/// Deletions are independent: one failure does not stop the others, and
/// failures are reported rather than returned as errors.
///
/// # Errors
///
/// Only fails if the generation names cannot be listed at all.
pub async fn reap(db: &CacheDb, version: &str) -> Result<ReapReport, Error> {
    let mut report = ReapReport::default();

    for name in db.generation_names().await? {
        if name == version {
            report.kept.push(name);
            continue;
        }

        match db.delete_generation(&name).await {
            Ok(_) => {
                tracing::info!(generation = %name, "deleted stale generation");
                report.deleted.push(name);
            }
            Err(e) => {
                tracing::warn!(generation = %name, error = %e, "failed to delete stale generation");
                report.failed.push((name, e.to_string()));
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::db;

    #[tokio::test]
    async fn test_reap_keeps_only_current() {
        let db = db().await;
        for name in ["doc-rocker-v0", "doc-rocker-v1", "doc-rocker-v2", "unrelated"] {
            db.create_generation(name).await.unwrap();
        }

        let report = reap(&db, "doc-rocker-v2").await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.kept, vec!["doc-rocker-v2".to_string()]);
        assert_eq!(report.deleted.len(), 3);
        assert_eq!(db.generation_names().await.unwrap(), vec!["doc-rocker-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_reap_without_current_generation() {
        let db = db().await;
        db.create_generation("v1").await.unwrap();

        let report = reap(&db, "v2").await.unwrap();

        assert!(report.kept.is_empty());
        assert_eq!(report.deleted, vec!["v1".to_string()]);
        assert!(db.generation_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reap_failure_does_not_stop_others() {
        let db = db().await;
        for name in ["v0", "v1", "v2"] {
            db.create_generation(name).await.unwrap();
        }
        db.execute_batch(
            "CREATE TRIGGER pin_v0 BEFORE DELETE ON generations WHEN OLD.name = 'v0'
             BEGIN SELECT RAISE(ABORT, 'v0 is pinned'); END;",
        )
        .await
        .unwrap();

        let report = reap(&db, "v2").await.unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "v0");
        assert_eq!(report.deleted, vec!["v1".to_string()]);
        assert_eq!(report.kept, vec!["v2".to_string()]);
        assert_eq!(db.generation_names().await.unwrap(), vec!["v0".to_string(), "v2".to_string()]);
    }

    #[tokio::test]
    async fn test_reap_empty_store() {
        let db = db().await;
        let report = reap(&db, "v1").await.unwrap();
        assert_eq!(report, ReapReport::default());
    }
}
