//! remove.bg API client
//!
//! Both endpoints go through one authenticated request primitive,
//! [`RemoveBgClient::execute`], which maps every HTTP status onto either a
//! response to parse or a typed [`RemoveBgError`]:
//!
//! | status | outcome |
//! |--------|---------|
//! | 200 | parsed result |
//! | 400 | [`RemoveBgError::InvalidParameters`] |
//! | 402 | [`RemoveBgError::InsufficientCredits`] |
//! | 403 | [`RemoveBgError::AuthFailure`] |
//! | 429 | [`RemoveBgError::RateLimited`], with `Retry-After` and the body |
//! | other | [`RemoveBgError::UnexpectedStatus`] |
//!
//! Failures without a response surface as [`RemoveBgError::Transport`].

use crate::config::{ClientConfig, ResponseEncoding};
use crate::error::{RemoveBgError, Result};
use crate::params::RemoveBackgroundParams;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Method, ReqwestTransport};
use crate::types::{
    AccountInfo, DetectedType, ErrorResponse, ForegroundBox, ImageData, RateLimit,
    RemoveBackgroundResult,
};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;

const REMOVEBG_PATH: &str = "removebg";
const ACCOUNT_PATH: &str = "account";

/// Response header names of the removal endpoint
pub mod headers {
    pub const API_KEY: &str = "X-Api-Key";
    pub const TYPE: &str = "X-Type";
    pub const WIDTH: &str = "X-Width";
    pub const HEIGHT: &str = "X-Height";
    pub const CREDITS_CHARGED: &str = "X-Credits-Charged";
    pub const RATE_LIMIT_LIMIT: &str = "X-RateLimit-Limit";
    pub const RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";
    pub const RATE_LIMIT_RESET: &str = "X-RateLimit-Reset";
    pub const RETRY_AFTER: &str = "Retry-After";
    pub const FOREGROUND_TOP: &str = "X-Foreground-Top";
    pub const FOREGROUND_LEFT: &str = "X-Foreground-Left";
    pub const FOREGROUND_WIDTH: &str = "X-Foreground-Width";
    pub const FOREGROUND_HEIGHT: &str = "X-Foreground-Height";
}

/// Typed client for the remove.bg REST API
pub struct RemoveBgClient {
    config: ClientConfig,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for RemoveBgClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoveBgClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RemoveBgClient {
    /// Create a client that talks HTTP through `reqwest`
    ///
    /// # Errors
    /// - Invalid configuration
    /// - Failed to create HTTP client
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.timeout())?;
        Ok(Self {
            config,
            transport: Arc::new(transport),
        })
    }

    /// Create a client on top of a custom transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, transport })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Remove the background of one image
    ///
    /// The image comes back inline, base64 or binary depending on
    /// [`ClientConfig::response_encoding`].
    ///
    /// # Errors
    /// - [`RemoveBgError::InvalidRequest`] if the parameters fail local validation
    /// - the status-mapped errors listed in the module docs
    pub async fn remove_background(
        &self,
        params: &RemoveBackgroundParams,
    ) -> Result<RemoveBackgroundResult> {
        self.remove_background_with(params, self.config.response_encoding)
            .await
    }

    /// Remove the background and write the image to `output`
    ///
    /// The returned result carries no inline image.
    pub async fn remove_background_to_file<P: AsRef<Path>>(
        &self,
        params: &RemoveBackgroundParams,
        output: P,
    ) -> Result<RemoveBackgroundResult> {
        let output = output.as_ref();
        let mut result = self
            .remove_background_with(params, ResponseEncoding::Binary)
            .await?;

        let bytes = match result.image.take() {
            Some(image) => image.to_bytes()?,
            None => {
                return Err(RemoveBgError::malformed_response(
                    "Response did not contain image data",
                ))
            },
        };

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| RemoveBgError::file_io_error("create directory", parent, &e))?;
            }
        }
        tokio::fs::write(output, &bytes)
            .await
            .map_err(|e| RemoveBgError::file_io_error("write result", output, &e))?;

        tracing::debug!(
            output = %output.display(),
            bytes = bytes.len(),
            "Result written to file"
        );
        Ok(result)
    }

    /// Fetch the current account balance. Never cached.
    pub async fn get_account(&self) -> Result<AccountInfo> {
        let request = self.request(Method::Get, ACCOUNT_PATH, "application/json", None);
        let span = tracing::info_span!("get_account");
        async {
            let response = self.execute(request).await?;
            let account = AccountInfo::from_json(&response.body)?;
            tracing::debug!(
                total_credits = account.credits.total,
                free_calls = account.api.free_calls,
                "Account fetched"
            );
            Ok(account)
        }
        .instrument(span)
        .await
    }

    async fn remove_background_with(
        &self,
        params: &RemoveBackgroundParams,
        encoding: ResponseEncoding,
    ) -> Result<RemoveBackgroundResult> {
        params.validate()?;

        let request = self.request(
            Method::Post,
            REMOVEBG_PATH,
            encoding.accept_header(),
            Some(params.to_form_fields()),
        );
        let span = tracing::info_span!(
            "remove_background",
            source = params.source.kind(),
            encoding = ?encoding
        );
        async {
            let response = self.execute(request).await?;
            let result = parse_removal(&response, encoding)?;
            tracing::info!(
                detected_type = %result.detected_type,
                width = result.result_width,
                height = result.result_height,
                credits_charged = result.credits_charged,
                rate_limit_remaining = result.rate_limit.remaining,
                "Background removed"
            );
            Ok(result)
        }
        .instrument(span)
        .await
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        accept: &str,
        form: Option<Vec<crate::params::FormField>>,
    ) -> ApiRequest {
        ApiRequest {
            method,
            url: self.config.endpoint(path),
            headers: vec![
                (headers::API_KEY, self.config.api_key.clone()),
                ("Accept", accept.to_string()),
            ],
            form,
        }
    }

    /// Send an authenticated request and map its status
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = request.url.clone();
        let response = self.transport.send(request).await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Request failed without a response");
            e
        })?;
        tracing::debug!(url = %url, status = response.status.as_u16(), "Response received");
        check_status(response)
    }
}

/// Map a response status onto success or a typed error
pub fn check_status(response: ApiResponse) -> Result<ApiResponse> {
    let status = response.status.as_u16();
    if status == 200 {
        return Ok(response);
    }

    let fallback_title = response
        .status
        .canonical_reason()
        .unwrap_or("Unexpected response");
    let errors = ErrorResponse::from_body(&response.body, fallback_title);

    let error = match status {
        400 => RemoveBgError::InvalidParameters(errors),
        402 => RemoveBgError::InsufficientCredits(errors),
        403 => RemoveBgError::AuthFailure(errors),
        429 => RemoveBgError::RateLimited {
            retry_after: response.header_num(headers::RETRY_AFTER),
            errors,
        },
        _ => RemoveBgError::UnexpectedStatus { status, errors },
    };
    tracing::warn!(status, error = %error, "API call rejected");
    Err(error)
}

#[derive(Deserialize)]
struct RemovalEnvelope {
    data: RemovalData,
}

#[derive(Deserialize)]
struct RemovalData {
    result_b64: String,
    #[serde(default)]
    foreground_top: Option<u32>,
    #[serde(default)]
    foreground_left: Option<u32>,
    #[serde(default)]
    foreground_width: Option<u32>,
    #[serde(default)]
    foreground_height: Option<u32>,
}

/// Build a [`RemoveBackgroundResult`] from a 200 response
fn parse_removal(response: &ApiResponse, encoding: ResponseEncoding) -> Result<RemoveBackgroundResult> {
    let header_box = ForegroundBox {
        top: response.header_num(headers::FOREGROUND_TOP).unwrap_or(0),
        left: response.header_num(headers::FOREGROUND_LEFT).unwrap_or(0),
        width: response.header_num(headers::FOREGROUND_WIDTH).unwrap_or(0),
        height: response.header_num(headers::FOREGROUND_HEIGHT).unwrap_or(0),
    };

    let (image, foreground) = match encoding {
        ResponseEncoding::Json => {
            let envelope: RemovalEnvelope =
                serde_json::from_slice(&response.body).map_err(|e| {
                    RemoveBgError::malformed_response(format!(
                        "Invalid removal response body: {}",
                        e
                    ))
                })?;
            let data = envelope.data;
            let foreground = ForegroundBox {
                top: data.foreground_top.unwrap_or(header_box.top),
                left: data.foreground_left.unwrap_or(header_box.left),
                width: data.foreground_width.unwrap_or(header_box.width),
                height: data.foreground_height.unwrap_or(header_box.height),
            };
            (ImageData::Base64(data.result_b64), foreground)
        },
        ResponseEncoding::Binary => (ImageData::Binary(response.body.clone()), header_box),
    };

    if image.is_empty() {
        return Err(RemoveBgError::malformed_response(
            "Response did not contain image data",
        ));
    }

    let rate_limit = RateLimit {
        limit: response.header_num(headers::RATE_LIMIT_LIMIT).unwrap_or(0),
        remaining: response.header_num(headers::RATE_LIMIT_REMAINING).unwrap_or(0),
        reset: response.header_num(headers::RATE_LIMIT_RESET).unwrap_or(0),
        retry_after: response.header_num(headers::RETRY_AFTER),
    };

    Ok(RemoveBackgroundResult {
        image: Some(image),
        detected_type: response
            .header_str(headers::TYPE)
            .map_or(DetectedType::Other, DetectedType::from_header),
        result_width: response.header_num(headers::WIDTH).unwrap_or(0),
        result_height: response.header_num(headers::HEIGHT).unwrap_or(0),
        credits_charged: response.header_num(headers::CREDITS_CHARGED).unwrap_or(0.0),
        rate_limit,
        foreground,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{account_body, removal_headers, MockTransport};
    use crate::types::ErrorCode;
    use bytes::Bytes;

    fn client(transport: Arc<MockTransport>) -> RemoveBgClient {
        let config = ClientConfig::new("test-key").unwrap();
        RemoveBgClient::with_transport(config, transport).unwrap()
    }

    fn url_params() -> RemoveBackgroundParams {
        RemoveBackgroundParams::from_url("https://example.com/dog.jpg")
    }

    #[tokio::test]
    async fn test_remove_background_json_success() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(
            200,
            removal_headers(),
            r#"{"data":{"result_b64":"aGVsbG8=","foreground_top":5,"foreground_left":6,"foreground_width":70,"foreground_height":80}}"#,
        );

        let result = client(transport.clone())
            .remove_background(&url_params())
            .await
            .unwrap();

        assert_eq!(result.image, Some(ImageData::Base64("aGVsbG8=".to_string())));
        assert_eq!(result.detected_type, DetectedType::Animal);
        assert_eq!((result.result_width, result.result_height), (640, 480));
        assert!((result.credits_charged - 1.0).abs() < f64::EPSILON);
        assert_eq!(result.rate_limit.limit, 500);
        assert_eq!(result.rate_limit.remaining, 499);
        assert_eq!(result.rate_limit.retry_after, None);
        assert_eq!(
            result.foreground,
            ForegroundBox {
                top: 5,
                left: 6,
                width: 70,
                height: 80
            }
        );

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let request = requests.first().unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "https://api.remove.bg/v1.0/removebg");
        assert_eq!(request.header("X-Api-Key"), Some("test-key"));
        assert_eq!(request.header("Accept"), Some("application/json"));
        let form = request.form.as_ref().unwrap();
        assert_eq!(form.first().and_then(|f| f.as_text()), Some("https://example.com/dog.jpg"));
    }

    #[tokio::test]
    async fn test_remove_background_binary_uses_headers() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, removal_headers(), Bytes::from_static(b"\x89PNG-data"));

        let config = ClientConfig::builder()
            .api_key("test-key")
            .response_encoding(ResponseEncoding::Binary)
            .build()
            .unwrap();
        let client = RemoveBgClient::with_transport(config, transport.clone()).unwrap();
        let result = client.remove_background(&url_params()).await.unwrap();

        assert_eq!(
            result.image,
            Some(ImageData::Binary(Bytes::from_static(b"\x89PNG-data")))
        );
        assert_eq!(result.foreground.width, 320);
        assert_eq!(result.foreground.height, 240);
        assert_eq!(
            transport.requests().first().unwrap().header("Accept"),
            Some("image/*, application/zip")
        );
    }

    #[tokio::test]
    async fn test_status_400_is_invalid_parameters() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(
            400,
            Vec::new(),
            r#"{"errors":[{"title":"Invalid size","code":"invalid_parameters"}]}"#,
        );
        let err = client(transport).remove_background(&url_params()).await.unwrap_err();
        match err {
            RemoveBgError::InvalidParameters(errors) => {
                assert!(errors.has_code(ErrorCode::InvalidParameters));
            },
            other => panic!("expected InvalidParameters, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_402_is_insufficient_credits_without_image() {
        let transport = Arc::new(MockTransport::new());
        // even if a 402 carried a payload, it must not resolve as a result
        transport.push_response(
            402,
            removal_headers(),
            r#"{"errors":[{"title":"Insufficient credits","code":"insufficient_credits"}],"data":{"result_b64":"aGVsbG8="}}"#,
        );
        let result = client(transport).remove_background(&url_params()).await;
        assert!(matches!(result, Err(RemoveBgError::InsufficientCredits(_))));
    }

    #[tokio::test]
    async fn test_status_403_is_auth_failure() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(403, Vec::new(), "");
        let err = client(transport).get_account().await.unwrap_err();
        match err {
            RemoveBgError::AuthFailure(errors) => assert_eq!(errors.first().title, "Forbidden"),
            other => panic!("expected AuthFailure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_429_carries_retry_after_and_body() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(
            429,
            vec![("Retry-After", "42")],
            r#"{"errors":[{"title":"Rate limit exceeded","code":"rate_limit_exceeded"}]}"#,
        );
        let err = client(transport).remove_background(&url_params()).await.unwrap_err();
        match err {
            RemoveBgError::RateLimited {
                retry_after,
                errors,
            } => {
                assert_eq!(retry_after, Some(42));
                assert!(errors.has_code(ErrorCode::RateLimitExceeded));
            },
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unlisted_status_is_unexpected() {
        for status in [201u16, 404, 500, 503] {
            let transport = Arc::new(MockTransport::new());
            transport.push_response(status, Vec::new(), "oops");
            let err = client(transport).get_account().await.unwrap_err();
            assert_eq!(err.status(), Some(status));
            assert!(matches!(err, RemoveBgError::UnexpectedStatus { .. }));
        }
    }

    #[tokio::test]
    async fn test_transport_failure_propagates_cause() {
        let transport = Arc::new(MockTransport::new());
        transport.push_transport_error("connection refused");
        let err = client(transport).get_account().await.unwrap_err();
        assert!(matches!(err, RemoveBgError::Transport { .. }));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_invalid_params_never_reach_transport() {
        let transport = Arc::new(MockTransport::new());
        let params = RemoveBackgroundParams::from_url("");
        let err = client(transport.clone())
            .remove_background(&params)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoveBgError::InvalidRequest(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, removal_headers(), "not json");
        let err = client(transport).remove_background(&url_params()).await.unwrap_err();
        assert!(matches!(err, RemoveBgError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_get_account() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, Vec::new(), account_body(120.5, 7));
        let client = client(transport.clone());
        let account = client.get_account().await.unwrap();

        assert!((account.credits.total - 120.5).abs() < f64::EPSILON);
        assert_eq!(account.api.free_calls, 7);

        let request = transport.requests().into_iter().next().unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.url, "https://api.remove.bg/v1.0/account");
        assert!(request.form.is_none());
    }

    #[tokio::test]
    async fn test_remove_background_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("nested").join("out.png");

        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, removal_headers(), Bytes::from_static(b"\x89PNG-bytes"));

        let result = client(transport)
            .remove_background_to_file(&url_params(), &output)
            .await
            .unwrap();

        assert!(result.image.is_none());
        assert_eq!(result.detected_type, DetectedType::Animal);
        assert_eq!(tokio::fs::read(&output).await.unwrap(), b"\x89PNG-bytes");
    }

    #[test]
    fn test_missing_rate_limit_headers_default_to_zero() {
        let response = ApiResponse {
            status: reqwest::StatusCode::OK,
            headers: reqwest::header::HeaderMap::new(),
            body: Bytes::from_static(br#"{"data":{"result_b64":"aGk="}}"#),
        };
        let result = parse_removal(&response, ResponseEncoding::Json).unwrap();
        assert_eq!(result.rate_limit, RateLimit::default());
        assert_eq!(result.detected_type, DetectedType::Other);
    }
}
