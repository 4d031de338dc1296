//! HTTP transport abstraction
//!
//! The client builds an [`ApiRequest`] and hands it to an [`HttpTransport`].
//! Production code uses [`ReqwestTransport`]; tests plug in a scripted
//! transport to exercise the status-code mapping without a network.

use crate::error::{RemoveBgError, Result};
use crate::params::{FieldValue, FormField};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::time::Duration;

/// HTTP method used by the two endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Fully built request, including authentication headers
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    /// Multipart body, `None` for bodyless requests
    pub form: Option<Vec<FormField>>,
}

impl ApiRequest {
    /// Header value by case-insensitive name
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Response as received from the wire, before status mapping
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    /// Header value as a string, `None` if absent or not visible ASCII
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Header value parsed as a number
    #[must_use]
    pub fn header_num<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        self.header_str(name).and_then(|v| v.trim().parse().ok())
    }
}

/// Issues a single request. Resolves with any HTTP response, including
/// error statuses; only failures without a response are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// [`HttpTransport`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with an optional request timeout
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RemoveBgError::transport("Failed to create HTTP client", e))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build_form(fields: Vec<FormField>) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for field in fields {
            form = match field.value {
                FieldValue::Text(text) => form.text(field.name, text),
                FieldValue::File { data, file_name } => {
                    let mime = guess_mime(&file_name);
                    let part = reqwest::multipart::Part::bytes(data.to_vec())
                        .file_name(file_name)
                        .mime_str(mime)
                        .map_err(|e| {
                            RemoveBgError::invalid_request(format!("Invalid MIME type: {}", e))
                        })?;
                    form.part(field.name, part)
                },
            };
        }
        Ok(form)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if let Some(fields) = request.form {
            builder = builder.multipart(Self::build_form(fields)?);
        }

        let response = builder.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("Request to {} timed out", request.url)
            } else {
                format!("Request to {} failed", request.url)
            };
            RemoveBgError::transport(message, e)
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            RemoveBgError::transport(format!("Failed to read response from {}", request.url), e)
        })?;

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

fn guess_mime(file_name: &str) -> &'static str {
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}
