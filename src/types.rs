//! Response types returned by the remove.bg API

use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Foreground class detected by the service (`X-Type` header)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedType {
    Person,
    Product,
    Animal,
    Car,
    Transportation,
    Graphic,
    #[serde(other)]
    Other,
}

impl DetectedType {
    /// Parse the header value. Unknown classes fall back to `Other`.
    #[must_use]
    pub fn from_header(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "person" => Self::Person,
            "product" => Self::Product,
            "animal" => Self::Animal,
            "car" => Self::Car,
            "transportation" => Self::Transportation,
            "graphic" => Self::Graphic,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Product => "product",
            Self::Animal => "animal",
            Self::Car => "car",
            Self::Transportation => "transportation",
            Self::Graphic => "graphic",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for DetectedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate-limit snapshot taken from the response headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RateLimit {
    /// Requests allowed per minute
    pub limit: u64,
    /// Requests left in the current window
    pub remaining: u64,
    /// Unix timestamp at which the window resets
    pub reset: u64,
    /// Seconds to wait, only present when the limit was exceeded
    pub retry_after: Option<u64>,
}

impl RateLimit {
    /// Reset time as a UTC timestamp
    #[must_use]
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.reset).ok()?;
        Utc.timestamp_opt(secs, 0).single()
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.retry_after.is_some() || (self.limit > 0 && self.remaining == 0)
    }
}

/// Bounding box of the detected foreground, in result-image pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ForegroundBox {
    pub top: u32,
    pub left: u32,
    pub width: u32,
    pub height: u32,
}

/// Processed image returned inline with the response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageData {
    /// `data.result_b64` from a JSON response
    Base64(String),
    /// Raw body of a binary response
    Binary(Bytes),
}

impl ImageData {
    /// Decoded image bytes
    pub fn to_bytes(&self) -> crate::Result<Bytes> {
        match self {
            Self::Binary(bytes) => Ok(bytes.clone()),
            Self::Base64(encoded) => base64::engine::general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map(Bytes::from)
                .map_err(|e| {
                    crate::RemoveBgError::malformed_response(format!(
                        "result_b64 is not valid base64: {}",
                        e
                    ))
                }),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Base64(encoded) => encoded.is_empty(),
            Self::Binary(bytes) => bytes.is_empty(),
        }
    }
}

/// Successful background removal
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveBackgroundResult {
    /// Inline image, `None` when the result was written straight to a file
    pub image: Option<ImageData>,
    pub detected_type: DetectedType,
    pub result_width: u32,
    pub result_height: u32,
    pub credits_charged: f64,
    pub rate_limit: RateLimit,
    pub foreground: ForegroundBox,
}

/// Credit balances of the account
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Credits {
    pub total: f64,
    #[serde(default)]
    pub subscription: f64,
    #[serde(default)]
    pub payg: f64,
}

/// API access information of the account
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApiInfo {
    pub free_calls: u64,
    /// Output sizes available to the account, e.g. `"all"`
    pub sizes: String,
}

/// Account snapshot, fetched fresh on every query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountInfo {
    pub credits: Credits,
    pub api: ApiInfo,
    /// Enterprise credits, only reported for enterprise accounts
    pub enterprise: Option<f64>,
}

#[derive(Deserialize)]
struct AccountEnvelope {
    data: AccountData,
}

#[derive(Deserialize)]
struct AccountData {
    attributes: AccountAttributes,
}

#[derive(Deserialize)]
struct AccountAttributes {
    credits: CreditsWithEnterprise,
    api: ApiInfo,
    #[serde(default)]
    enterprise: Option<f64>,
}

#[derive(Deserialize)]
struct CreditsWithEnterprise {
    #[serde(flatten)]
    credits: Credits,
    #[serde(default)]
    enterprise: Option<f64>,
}

impl AccountInfo {
    /// Parse the `{"data":{"attributes":{...}}}` account document
    pub fn from_json(body: &[u8]) -> crate::Result<Self> {
        let envelope: AccountEnvelope = serde_json::from_slice(body).map_err(|e| {
            crate::RemoveBgError::malformed_response(format!("Invalid account document: {}", e))
        })?;
        let attributes = envelope.data.attributes;
        Ok(Self {
            credits: attributes.credits.credits,
            api: attributes.api,
            enterprise: attributes.enterprise.or(attributes.credits.enterprise),
        })
    }
}

/// Machine-readable reason attached to an error entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MissingApiKey,
    InvalidApiKey,
    InsufficientCredits,
    RateLimitExceeded,
    InvalidImage,
    InvalidParameters,
    FileSizeExceeded,
    ResolutionExceeded,
    InternalError,
    #[serde(other)]
    Unknown,
}

/// One entry of an error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorEntry {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

static EMPTY_ENTRY: ApiErrorEntry = ApiErrorEntry {
    title: String::new(),
    detail: None,
    code: None,
};

/// Non-empty list of errors returned with any non-2xx response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    errors: Vec<ApiErrorEntry>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ApiErrorEntry>,
}

impl ErrorResponse {
    #[must_use]
    pub fn single(entry: ApiErrorEntry) -> Self {
        Self {
            errors: vec![entry],
        }
    }

    /// Build from entries, `None` if the list is empty
    #[must_use]
    pub fn from_entries(errors: Vec<ApiErrorEntry>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    /// Parse an error body. A missing, empty or non-JSON body yields a single
    /// entry titled with `fallback_title` and carrying the raw text as detail.
    #[must_use]
    pub fn from_body(body: &[u8], fallback_title: &str) -> Self {
        serde_json::from_slice::<ErrorEnvelope>(body)
            .ok()
            .and_then(|envelope| Self::from_entries(envelope.errors))
            .unwrap_or_else(|| {
                let text = String::from_utf8_lossy(body).trim().to_string();
                Self::single(ApiErrorEntry {
                    title: fallback_title.to_string(),
                    detail: if text.is_empty() { None } else { Some(text) },
                    code: None,
                })
            })
    }

    #[must_use]
    pub fn entries(&self) -> &[ApiErrorEntry] {
        &self.errors
    }

    /// First entry; always present
    #[must_use]
    pub fn first(&self) -> &ApiErrorEntry {
        // constructors guarantee at least one entry
        self.errors.first().unwrap_or(&EMPTY_ENTRY)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether any entry carries the given code
    #[must_use]
    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == Some(code))
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, entry) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            f.write_str(&entry.title)?;
            if let Some(detail) = &entry.detail {
                write!(f, " ({})", detail)?;
            }
        }
        Ok(())
    }
}
