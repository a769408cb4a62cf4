//! activate tool implementation.
//!
//! Promotes the version waiting behind the active one.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waystation_core::Error;

use crate::host::Host;

/// Output from the activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivateOutput {
    /// Version now controlling all clients.
    pub version: String,
    /// Stale generations deleted.
    pub deleted_generations: Vec<String>,
    /// Stale generations that could not be deleted.
    pub failed_generations: Vec<String>,
}

/// Implementation of the activate tool.
pub async fn activate_impl(host: &Host) -> Result<CallToolResult, McpError> {
    let reap = host.registration().activate_waiting().await?;
    let version = host
        .registration()
        .active()
        .await
        .map(|c| c.version().to_string())
        .ok_or_else(|| Error::InvalidState("no active version after activation".into()))?;

    let output = ActivateOutput {
        version,
        deleted_generations: reap.deleted,
        failed_generations: reap.failed.into_iter().map(|(name, _)| name).collect(),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
