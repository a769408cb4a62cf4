//! Intercepted request values.

use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use url::Url;
use waystation_core::Error;

/// How the page issued the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    /// Full-document page load.
    Navigate,
    /// Anything else: scripts, styles, images, XHR.
    #[default]
    Subresource,
}

impl FromStr for RequestMode {
    type Err = Error;

    /// Accepts the fetch `Request.mode` spellings; every non-navigation mode
    /// collapses to `Subresource`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "navigate" => Ok(RequestMode::Navigate),
            "subresource" | "same-origin" | "no-cors" | "cors" => Ok(RequestMode::Subresource),
            other => Err(Error::InvalidInput(format!("unknown request mode: {other}"))),
        }
    }
}

/// A request observed by the interception layer.
///
/// Lives only for the duration of one routing decision.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: HeaderMap,
}

impl InterceptedRequest {
    pub fn new(method: Method, url: Url, mode: RequestMode) -> Self {
        Self { method, url, mode, headers: HeaderMap::new() }
    }

    /// A subresource GET.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Subresource)
    }

    /// A navigation GET.
    pub fn navigate(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Navigate)
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!("navigate".parse::<RequestMode>().unwrap(), RequestMode::Navigate);
        assert_eq!("NAVIGATE".parse::<RequestMode>().unwrap(), RequestMode::Navigate);
        assert_eq!("no-cors".parse::<RequestMode>().unwrap(), RequestMode::Subresource);
        assert!("teleport".parse::<RequestMode>().is_err());
    }

    #[test]
    fn test_constructors() {
        let url = Url::parse("http://localhost:4000/").unwrap();
        let nav = InterceptedRequest::navigate(url.clone());
        assert!(nav.is_navigation());
        assert_eq!(nav.method, Method::GET);

        let sub = InterceptedRequest::get(url);
        assert!(!sub.is_navigation());
        assert!(sub.headers.is_empty());
    }
}
