//! Scriptable `Network` for unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use url::Url;
use waystation_core::{CacheDb, ResponseType};

use crate::fetch::{Network, NetworkError};
use crate::request::InterceptedRequest;
use crate::response::Response;

pub const ORIGIN: &str = "http://localhost:4000";

pub fn origin() -> Url {
    Url::parse(ORIGIN).unwrap()
}

pub fn url(path: &str) -> Url {
    origin().join(path).unwrap()
}

pub async fn db() -> CacheDb {
    CacheDb::open_in_memory().await.unwrap()
}

#[derive(Clone)]
struct Route {
    status: StatusCode,
    content_type: &'static str,
    body: Bytes,
    response_type: ResponseType,
}

/// Serves registered routes, 404 otherwise; can be switched offline.
#[derive(Default)]
pub struct StubNetwork {
    routes: Mutex<HashMap<String, Route>>,
    failing: Mutex<Vec<String>>,
    offline: AtomicBool,
    calls: AtomicUsize,
    seen: Mutex<Vec<(Method, String, HeaderMap)>>,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, path: &str, content_type: &'static str, body: &'static [u8]) -> &Self {
        self.serve_status(path, StatusCode::OK, content_type, body)
    }

    pub fn serve_status(&self, path: &str, status: StatusCode, content_type: &'static str, body: &'static [u8]) -> &Self {
        self.routes.lock().unwrap().insert(
            url(path).to_string(),
            Route { status, content_type, body: Bytes::from_static(body), response_type: ResponseType::Basic },
        );
        self
    }

    pub fn serve_typed(&self, path: &str, response_type: ResponseType, body: &'static [u8]) -> &Self {
        self.routes.lock().unwrap().insert(
            url(path).to_string(),
            Route { status: StatusCode::OK, content_type: "text/plain", body: Bytes::from_static(body), response_type },
        );
        self
    }

    /// Make one URL fail at the connection level.
    pub fn fail(&self, path: &str) -> &Self {
        self.failing.lock().unwrap().push(url(path).to_string());
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<(Method, String, HeaderMap)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<Response, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((request.method.clone(), request.url.to_string(), request.headers.clone()));

        let key = request.url.to_string();
        if self.offline.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(&key) {
            return Err(NetworkError::Connect(format!("unreachable: {key}")));
        }

        let route = self.routes.lock().unwrap().get(&key).cloned().unwrap_or(Route {
            status: StatusCode::NOT_FOUND,
            content_type: "text/plain",
            body: Bytes::from_static(b"not found"),
            response_type: ResponseType::Basic,
        });

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(route.content_type));
        Ok(Response {
            url: request.url.clone(),
            status: route.status,
            headers,
            body: route.body,
            response_type: route.response_type,
        })
    }
}
