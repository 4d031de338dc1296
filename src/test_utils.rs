//! Test utilities: scripted transport and in-memory platform collaborators
//!
//! These mocks record every call so tests can verify dispatch order,
//! prompt counts and request contents without a network or a real album.

use crate::{
    error::{RemoveBgError, Result},
    platform::{FileTransfer, PermissionProvider, PermissionScope, PhotoAlbum},
    transport::{ApiRequest, ApiResponse, HttpTransport},
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

enum Scripted {
    Response(ApiResponse),
    TransportError(String),
}

/// Transport that replays scripted responses in order
#[derive(Default)]
pub(crate) struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_response<B: Into<Bytes>>(
        &self,
        status: u16,
        headers: Vec<(&'static str, &'static str)>,
        body: B,
    ) {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(
                HeaderName::from_static(leak_lowercase(name)),
                HeaderValue::from_static(value),
            );
        }
        let response = ApiResponse {
            status: StatusCode::from_u16(status).expect("valid status code"),
            headers: map,
            body: body.into(),
        };
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Response(response));
    }

    pub(crate) fn push_transport_error(&self, message: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::TransportError(message.to_string()));
    }

    /// Requests received so far
    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn leak_lowercase(name: &str) -> &'static str {
    Box::leak(name.to_ascii_lowercase().into_boxed_str())
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.requests.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::TransportError(message)) => Err(RemoveBgError::transport(
                "Request failed",
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, message),
            )),
            None => panic!("MockTransport: no scripted response left"),
        }
    }
}

/// Headers of a typical 200 removal response
#[must_use]
pub(crate) fn removal_headers() -> Vec<(&'static str, &'static str)> {
    vec![
        ("X-Type", "animal"),
        ("X-Width", "640"),
        ("X-Height", "480"),
        ("X-Credits-Charged", "1"),
        ("X-RateLimit-Limit", "500"),
        ("X-RateLimit-Remaining", "499"),
        ("X-RateLimit-Reset", "1700000000"),
        ("X-Foreground-Top", "10"),
        ("X-Foreground-Left", "20"),
        ("X-Foreground-Width", "320"),
        ("X-Foreground-Height", "240"),
    ]
}

/// Account document with the given balance
#[must_use]
pub(crate) fn account_body(total: f64, free_calls: u64) -> String {
    format!(
        r#"{{"data":{{"attributes":{{"credits":{{"total":{total},"subscription":{sub},"payg":{payg}}},"api":{{"free_calls":{free_calls},"sizes":"all"}}}}}}}}"#,
        total = total,
        sub = total / 2.0,
        payg = total / 2.0,
        free_calls = free_calls,
    )
}

/// Downloader writing nothing; `url` maps to `/downloads/<url>`
#[derive(Default)]
pub(crate) struct MockTransfer {
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    started: Mutex<Vec<String>>,
}

impl MockTransfer {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub(crate) fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    #[must_use]
    pub(crate) fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// URLs in the order their downloads started
    pub(crate) fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileTransfer for MockTransfer {
    async fn download(&self, url: &str) -> Result<PathBuf> {
        self.started.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(url) {
            return Err(RemoveBgError::platform(format!("download failed: {}", url)));
        }
        Ok(PathBuf::from("/downloads").join(url))
    }
}

/// Album recording saved paths; `path` maps to `/album/<file name>`
#[derive(Default)]
pub(crate) struct MockAlbum {
    failing: HashSet<PathBuf>,
    saved: Mutex<Vec<PathBuf>>,
}

impl MockAlbum {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub(crate) fn failing<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.failing.insert(path.into());
        self
    }

    pub(crate) fn saved(&self) -> Vec<PathBuf> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl PhotoAlbum for MockAlbum {
    async fn save_image(&self, path: &Path) -> Result<PathBuf> {
        if self.failing.contains(path) {
            return Err(RemoveBgError::platform(format!(
                "save failed: {}",
                path.display()
            )));
        }
        self.saved.lock().unwrap().push(path.to_path_buf());
        let name = path.file_name().map(PathBuf::from).unwrap_or_default();
        Ok(PathBuf::from("/album").join(name))
    }
}

/// Permission provider with a mutable setting and call counters
pub(crate) struct MockPermissions {
    setting: Mutex<Option<bool>>,
    grant_on_request: bool,
    fail_queries: bool,
    fail_requests: bool,
    authorize_calls: Mutex<usize>,
    guide_calls: Mutex<usize>,
}

impl MockPermissions {
    #[must_use]
    pub(crate) fn new(setting: Option<bool>, grant_on_request: bool) -> Self {
        Self {
            setting: Mutex::new(setting),
            grant_on_request,
            fail_queries: false,
            fail_requests: false,
            authorize_calls: Mutex::new(0),
            guide_calls: Mutex::new(0),
        }
    }

    #[must_use]
    pub(crate) fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    #[must_use]
    pub(crate) fn failing_requests(mut self) -> Self {
        self.fail_requests = true;
        self
    }

    pub(crate) fn set(&self, setting: Option<bool>) {
        *self.setting.lock().unwrap() = setting;
    }

    pub(crate) fn authorize_calls(&self) -> usize {
        *self.authorize_calls.lock().unwrap()
    }

    pub(crate) fn guide_calls(&self) -> usize {
        *self.guide_calls.lock().unwrap()
    }
}

#[async_trait]
impl PermissionProvider for MockPermissions {
    async fn setting(&self, _scope: PermissionScope) -> Result<Option<bool>> {
        if self.fail_queries {
            return Err(RemoveBgError::platform("settings unavailable"));
        }
        Ok(*self.setting.lock().unwrap())
    }

    async fn authorize(&self, _scope: PermissionScope) -> Result<bool> {
        *self.authorize_calls.lock().unwrap() += 1;
        if self.fail_requests {
            return Err(RemoveBgError::platform("permission dialog failed"));
        }
        *self.setting.lock().unwrap() = Some(self.grant_on_request);
        Ok(self.grant_on_request)
    }

    async fn show_guide(&self, _scope: PermissionScope) -> Result<()> {
        *self.guide_calls.lock().unwrap() += 1;
        Ok(())
    }
}
