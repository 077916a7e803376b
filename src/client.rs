use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::Settings;
use crate::models::{AltTextResponse, ImageUpload, UpstreamErrorBody, WordLimit};

// ── Constants ────────────────────────────────────────────────────────────────

const USER_AGENT: &str = "alt-text-form/0.1";
const GENERATE_PATH: &str = "generate-alt-text";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_DETAIL_LEN: usize = 300;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    InvalidEndpoint(String),
    #[error("TimeoutError: {0}")]
    Timeout(String),
    #[error("ConnectError: {0}")]
    Connect(String),
    #[error("RequestError: {0}")]
    Request(String),
    #[error("Upstream returned HTTP {status}")]
    Upstream { status: u16, detail: Option<String> },
    #[error("Invalid response body: {0}")]
    Decode(String),
    #[error("Request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout(e.to_string())
        } else if e.is_connect() {
            ClientError::Connect(e.to_string())
        } else if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Request(e.to_string())
        }
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Talks to the remote `POST /generate-alt-text` endpoint.
#[derive(Debug, Clone)]
pub struct AltTextClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl AltTextClient {
    pub fn new(settings: &Settings) -> Result<Self, ClientError> {
        let endpoint = endpoint_url(&settings.api_base_url)?;

        let http = reqwest::ClientBuilder::new()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(settings.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClientError::Request(e.to_string()))?;

        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Uploads the image and word limit. Resolves early with
    /// `ClientError::Cancelled` once `cancel` fires.
    pub async fn generate(
        &self,
        upload: &ImageUpload,
        word_limit: WordLimit,
        cancel: &CancellationToken,
    ) -> Result<AltTextResponse, ClientError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = self.post(upload, word_limit) => result,
        }
    }

    async fn post(
        &self,
        upload: &ImageUpload,
        word_limit: WordLimit,
    ) -> Result<AltTextResponse, ClientError> {
        let form = build_form(upload, word_limit)?;

        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Upstream {
                status: status.as_u16(),
                detail: upstream_detail(&body),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

// ── Request construction ─────────────────────────────────────────────────────

fn build_form(upload: &ImageUpload, word_limit: WordLimit) -> Result<Form, ClientError> {
    let mut part = Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone());
    if let Some(content_type) = upload.content_type.as_deref() {
        part = part
            .mime_str(content_type)
            .map_err(|e| ClientError::Request(format!("bad content type: {}", e)))?;
    }

    Ok(Form::new()
        .part("file", part)
        .text("word_limit", word_limit.value().to_string()))
}

fn endpoint_url(base: &str) -> Result<Url, ClientError> {
    let mut parsed = Url::parse(base.trim())
        .map_err(|_| ClientError::InvalidEndpoint(format!("Invalid API URL: {}", base)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ClientError::InvalidEndpoint(
            "Only http and https API URLs are allowed".to_string(),
        ));
    }

    // Without a trailing slash `join` would replace the last path segment.
    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }

    parsed
        .join(GENERATE_PATH)
        .map_err(|e| ClientError::InvalidEndpoint(e.to_string()))
}

/// Best-effort description of a failing response, for the logs only.
fn upstream_detail(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<UpstreamErrorBody>(body) {
        if let Some(error) = parsed.error {
            return Some(error);
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_DETAIL_LEN).collect())
}
