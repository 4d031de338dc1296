//! Shared fixtures for the integration tests
//!
//! Mocks only implement the public collaborator traits, so these tests see
//! the crate exactly as a downstream user does.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use removebg_saver::{
    ApiRequest, ApiResponse, ClientConfig, FileTransfer, HttpTransport, RemoveBgClient,
    RemoveBgError, Result,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Transport replaying canned responses; `None` entries fail without a response
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Option<ApiResponse>>>,
    seen: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn respond(&self, status: u16, headers: &[(&str, &str)], body: impl Into<Bytes>) {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        self.responses.lock().unwrap().push_back(Some(ApiResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: map,
            body: body.into(),
        }));
    }

    pub fn drop_connection(&self) {
        self.responses.lock().unwrap().push_back(None);
    }

    pub fn seen(&self) -> Vec<ApiRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.seen.lock().unwrap().push(request);
        match self.responses.lock().unwrap().pop_front() {
            Some(Some(response)) => Ok(response),
            Some(None) => Err(RemoveBgError::transport(
                "Request failed",
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset"),
            )),
            None => panic!("ScriptedTransport ran out of responses"),
        }
    }
}

pub fn client_with(transport: Arc<ScriptedTransport>) -> RemoveBgClient {
    let config = ClientConfig::builder()
        .api_key("integration-key")
        .base_url("https://api.example.test/v1.0")
        .build()
        .unwrap();
    RemoveBgClient::with_transport(config, transport).unwrap()
}

pub const ERROR_BODY: &str =
    r#"{"errors":[{"title":"Something went wrong","detail":"details here","code":"unknown_foreground"}]}"#;

pub fn account_json(total: f64) -> String {
    format!(
        r#"{{"data":{{"attributes":{{"credits":{{"total":{t},"subscription":{t},"payg":0}},"api":{{"free_calls":50,"sizes":"all"}}}}}}}}"#,
        t = total
    )
}

/// Downloader writing `contents` into a real directory; fails for listed URLs
pub struct DiskTransfer {
    dir: PathBuf,
    failing: HashSet<String>,
}

impl DiskTransfer {
    pub fn new(dir: &Path, failing: &[&str]) -> Self {
        Self {
            dir: dir.to_path_buf(),
            failing: failing.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl FileTransfer for DiskTransfer {
    async fn download(&self, url: &str) -> Result<PathBuf> {
        if self.failing.contains(url) {
            return Err(RemoveBgError::platform(format!("404 for {}", url)));
        }
        let name = url.rsplit('/').next().unwrap_or("image");
        let path = self.dir.join(name);
        tokio::fs::write(&path, url.as_bytes()).await?;
        Ok(path)
    }
}
