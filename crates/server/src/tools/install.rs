//! install tool implementation.
//!
//! Installs a layer version: bootstraps its generation from the manifest,
//! then activates it right away unless it has to wait for the active one.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waystation_client::RegisterOutcome;
use waystation_core::Error;

use crate::host::Host;

/// Parameters for the install tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct InstallParams {
    /// Version label to install (default: configured cache_version).
    #[serde(default)]
    pub version: Option<String>,

    /// Supersede the active version immediately (default: configured skip_waiting).
    #[serde(default)]
    pub skip_waiting: Option<bool>,
}

/// Output from the install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallOutput {
    /// Installed version label.
    pub version: String,
    /// Lifecycle state after install: "active" or "waiting".
    pub state: String,
    /// Entries in the version's generation.
    pub entries: u64,
    /// Whether a fresh generation was created.
    pub created: bool,
    /// Stale generations deleted during activation.
    pub deleted_generations: Vec<String>,
    /// Stale generations that could not be deleted.
    pub failed_generations: Vec<String>,
}

/// Implementation of the install tool.
pub async fn install_impl(host: &Host, params: InstallParams) -> Result<CallToolResult, McpError> {
    let controller = host.controller(params.version, params.skip_waiting)?;
    let version = controller.version().to_string();

    let outcome = host.registration().register(controller.clone()).await?;
    let state = controller.state().await.to_string();

    let output = match outcome {
        RegisterOutcome::Activated { bootstrap, reap } => InstallOutput {
            version,
            state,
            entries: bootstrap.entries,
            created: bootstrap.created,
            deleted_generations: reap.deleted,
            failed_generations: reap.failed.into_iter().map(|(name, _)| name).collect(),
        },
        RegisterOutcome::Waiting { bootstrap } => InstallOutput {
            version,
            state,
            entries: bootstrap.entries,
            created: bootstrap.created,
            deleted_generations: Vec::new(),
            failed_generations: Vec::new(),
        },
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::stub;
    use std::sync::atomic::Ordering;

    fn output(result: CallToolResult) -> InstallOutput {
        let text = result.content.first().and_then(|c| c.as_text()).unwrap().text.clone();
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_install_default_version() {
        let (host, _) = stub::host().await;

        let result = install_impl(&host, InstallParams::default()).await.unwrap();
        let output = output(result);

        assert_eq!(output.version, "doc-rocker-v1");
        assert_eq!(output.state, "active");
        assert_eq!(output.entries, 5);
        assert!(output.created);
    }

    #[tokio::test]
    async fn test_install_new_version_reaps_old() {
        let (host, _) = stub::host().await;
        install_impl(&host, InstallParams::default()).await.unwrap();

        let params = InstallParams { version: Some("doc-rocker-v2".into()), skip_waiting: None };
        let output = output(install_impl(&host, params).await.unwrap());

        assert_eq!(output.deleted_generations, vec!["doc-rocker-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_install_offline_fails() {
        let (host, network) = stub::host().await;
        network.offline.store(true, Ordering::SeqCst);

        let result = install_impl(&host, InstallParams::default()).await;

        let err = result.unwrap_err();
        assert_eq!(err.code.0, -32020);
        assert!(host.registration().active().await.is_none());
    }
}
