//! intercept tool implementation.
//!
//! Runs one outgoing page request through the layer and reports what the
//! page would receive.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use waystation_client::fetch::canonicalize;
use waystation_client::header::{HeaderMap, HeaderName, HeaderValue};
use waystation_client::{InterceptedRequest, Method, RequestMode};
use waystation_core::Error;

use crate::host::Host;

/// Parameters for the intercept tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InterceptParams {
    /// Request URL, absolute or relative to the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate" for page loads, anything else is a subresource.
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Request headers to forward.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".into()
}

fn default_mode() -> String {
    "subresource".into()
}

/// Output from the intercept tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InterceptOutput {
    /// URL of the response.
    pub url: String,
    pub status: u16,
    /// Where the response came from: "cache", "network" or "offline".
    pub source: String,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// Body as text, or base64 when it is not valid UTF-8.
    pub body: String,
    /// How `body` is encoded: "utf-8" or "base64".
    pub encoding: String,
    pub body_bytes: usize,
}

fn build_request(host: &Host, params: &InterceptParams) -> Result<InterceptedRequest, Error> {
    let url = canonicalize(&params.url, host.origin()).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("invalid method: {}", params.method)))?;
    let mode: RequestMode = params.mode.parse()?;

    let mut headers = HeaderMap::with_capacity(params.headers.len());
    for (name, value) in &params.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid header name: {name}")))?;
        let value =
            HeaderValue::from_str(value).map_err(|_| Error::InvalidInput(format!("invalid value for {name}")))?;
        headers.append(name, value);
    }

    Ok(InterceptedRequest::new(method, url, mode).with_headers(headers))
}

fn encode_body(body: &[u8]) -> (String, &'static str) {
    match std::str::from_utf8(body) {
        Ok(text) => (text.to_string(), "utf-8"),
        Err(_) => (STANDARD.encode(body), "base64"),
    }
}

/// Implementation of the intercept tool.
pub async fn intercept_impl(host: &Host, params: InterceptParams) -> Result<CallToolResult, McpError> {
    let request = build_request(host, &params)?;
    let served = host.registration().dispatch(&request).await?;

    let response = &served.response;
    let headers = response
        .headers
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
        .collect();

    let (body, encoding) = encode_body(&response.body);
    let output = InterceptOutput {
        url: response.url.to_string(),
        status: response.status.as_u16(),
        source: served.source.as_str().to_string(),
        content_type: response.content_type().map(str::to_string),
        headers,
        body,
        encoding: encoding.to_string(),
        body_bytes: response.body.len(),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
