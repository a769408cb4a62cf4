//! Responses handed back to the page.
//!
//! A `Response` owns a fully materialized body. Write-back never shares the
//! caller's value: `fork` splits it into the response to deliver and an
//! independent snapshot for the store.

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use url::Url;
use waystation_core::{Error, ResponseSnapshot, ResponseType};

/// A response with its body read into memory.
#[derive(Debug, Clone)]
pub struct Response {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub response_type: ResponseType,
}

impl Response {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Copy this response into a storable snapshot.
    pub fn to_snapshot(&self) -> ResponseSnapshot {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();

        ResponseSnapshot {
            url: self.url.to_string(),
            status: self.status.as_u16(),
            headers,
            body: self.body.to_vec(),
            response_type: self.response_type,
        }
    }

    /// Split into the response to deliver and a snapshot for the store.
    pub fn fork(self) -> (Response, ResponseSnapshot) {
        let snapshot = self.to_snapshot();
        (self, snapshot)
    }

    /// Rebuild a response from a stored snapshot.
    ///
    /// Header pairs that are no longer valid HTTP are dropped.
    pub fn from_snapshot(snapshot: ResponseSnapshot) -> Result<Self, Error> {
        let url = Url::parse(&snapshot.url).map_err(|e| Error::CorruptEntry(format!("url {}: {e}", snapshot.url)))?;
        let status = StatusCode::from_u16(snapshot.status)
            .map_err(|_| Error::CorruptEntry(format!("status {}", snapshot.status)))?;

        let mut headers = HeaderMap::with_capacity(snapshot.headers.len());
        for (name, value) in snapshot.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::debug!(header = %name, "dropping invalid stored header"),
            }
        }

        Ok(Self { url, status, headers, body: Bytes::from(snapshot.body), response_type: snapshot.response_type })
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    /// Synthesized offline page.
    Offline,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::Offline => "offline",
        }
    }
}

/// A response together with its provenance.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
}

/// Outcome of routing one request.
#[derive(Debug, Clone)]
pub enum Routed {
    /// The layer declined the request; the host handles it as if no layer
    /// were installed.
    Passthrough,
    Served(Served),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_response() -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/javascript"));
        headers.append("x-build", HeaderValue::from_static("a"));
        headers.append("x-build", HeaderValue::from_static("b"));
        Response {
            url: Url::parse("http://localhost:4000/app.js").unwrap(),
            status: StatusCode::OK,
            headers,
            body: Bytes::from_static(b"console.log(1)"),
            response_type: ResponseType::Basic,
        }
    }

    #[test]
    fn test_fork_yields_independent_copies() {
        let (served, snapshot) = make_response().fork();
        assert_eq!(served.body.as_ref(), snapshot.body.as_slice());
        assert_eq!(snapshot.status, 200);
        assert_eq!(snapshot.content_type(), Some("application/javascript"));
        drop(served);
        assert_eq!(snapshot.body, b"console.log(1)");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let original = make_response();
        let restored = Response::from_snapshot(original.to_snapshot()).unwrap();
        assert_eq!(restored.url, original.url);
        assert_eq!(restored.status, original.status);
        assert_eq!(restored.body, original.body);
        assert_eq!(restored.headers, original.headers);
        assert_eq!(restored.response_type, ResponseType::Basic);
    }

    #[test]
    fn test_from_snapshot_drops_invalid_headers() {
        let mut snapshot = make_response().to_snapshot();
        snapshot.headers.push(("bad header".to_string(), "x".to_string()));
        let restored = Response::from_snapshot(snapshot).unwrap();
        assert!(restored.headers.get("bad header").is_none());
        assert_eq!(restored.content_type(), Some("application/javascript"));
    }

    #[test]
    fn test_from_snapshot_rejects_bad_status() {
        let mut snapshot = make_response().to_snapshot();
        snapshot.status = 42;
        assert!(matches!(Response::from_snapshot(snapshot), Err(Error::CorruptEntry(_))));
    }
}
