//! REST client for call snapshots.

use async_trait::async_trait;
use callwatch_protocol::endpoint::validate_resource_id;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// REST errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or decoding failure.
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The token was rejected.
    #[error("Not authorized")]
    Unauthorized,

    /// No such call.
    #[error("Call not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    /// The call id cannot be placed in a URL.
    #[error("Invalid call id: {0}")]
    InvalidId(&'static str),
}

/// One transcript segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    #[serde(default)]
    pub text: String,
}

/// Transcript of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: String,
    /// Recogniser confidence in `0..=1`; null until scored.
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// Analysis of a call. Every text column is nullable on the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub category_display: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub word_frequency: HashMap<String, u64>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Full record of a call as returned by `GET /calls/calls/{id}/`.
///
/// Fields the view does not use (`user`, `notes`, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallDetail {
    pub id: String,
    #[serde(default)]
    pub user_name: String,
    /// Seconds; null until the audio has been probed.
    #[serde(default)]
    pub duration: Option<f64>,
    /// `pending`, `processing`, `completed` or `failed`.
    pub status: String,
    #[serde(default)]
    pub status_display: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub source_display: String,
    #[serde(default)]
    pub audio_file: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub has_transcription: bool,
    #[serde(default)]
    pub has_analysis: bool,
    #[serde(default)]
    pub transcription: Option<Transcription>,
    #[serde(default)]
    pub analysis: Option<Analysis>,
}

impl CallDetail {
    /// Whether the backend is still working on the call.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.status == "processing"
    }
}

/// Source of call snapshots.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the current state of a call.
    async fn call_detail(&self, call_id: &str) -> Result<CallDetail, ApiError>;
}

/// HTTP client for the REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `http://localhost:8000/api`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// URL of a call's detail endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is not a valid path segment.
    pub fn call_detail_url(&self, call_id: &str) -> Result<String, ApiError> {
        validate_resource_id(call_id).map_err(ApiError::InvalidId)?;
        Ok(format!(
            "{}/calls/calls/{}/",
            self.base_url.trim_end_matches('/'),
            call_id
        ))
    }

    /// Fetch a call.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or a non-success status.
    pub async fn get_call_detail(&self, call_id: &str) -> Result<CallDetail, ApiError> {
        let url = self.call_detail_url(call_id)?;
        debug!(url = %url, "Fetching call");

        let mut request = self
            .http
            .get(&url)
            .header("Content-Type", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => ApiError::Unauthorized,
                404 => ApiError::NotFound(call_id.to_string()),
                code => ApiError::Status {
                    status: code,
                    body: response.text().await.unwrap_or_default(),
                },
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl SnapshotSource for ApiClient {
    async fn call_detail(&self, call_id: &str) -> Result<CallDetail, ApiError> {
        self.get_call_detail(call_id).await
    }
}
