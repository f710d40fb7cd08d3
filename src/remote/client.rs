//! Perplexity API HTTP client
//!
//! Thin async wrapper over reqwest: bearer auth, JSON bodies, a bounded
//! request timeout, and error mapping into [`ApiError`]. Constructed once
//! per process and passed down, never memoized in a module global.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use url::Url;

use super::error::{extract_message, ApiError};
use super::stream::{sse_chunks, ChunkStream};
use super::types::{AsyncJob, ChatRequest, ChatResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Something that can report the status of an async job.
///
/// Seam for the research poll loop; tests substitute a scripted source.
#[async_trait]
pub trait JobSource {
    async fn job_status(&self, id: &str) -> Result<AsyncJob, ApiError>;
}

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl Client {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid API base URL: {base_url}"))?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|err| ApiError::Protocol(format!("invalid endpoint {path}: {err}")))
    }

    /// Synchronous chat completion.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        let url = self.url("chat/completions")?;
        tracing::debug!(model = %request.model, "chat completion request");

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        Self::parse(resp).await
    }

    /// Streaming chat completion. The request must have `stream: true`.
    pub async fn chat_stream(&self, request: &ChatRequest) -> Result<ChunkStream, ApiError> {
        let url = self.url("chat/completions")?;
        tracing::debug!(model = %request.model, "streaming chat completion request");

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }

        Ok(sse_chunks(resp))
    }

    /// Submit an asynchronous job. Returns immediately with an id.
    pub async fn submit_job(&self, request: &ChatRequest) -> Result<AsyncJob, ApiError> {
        let url = self.url("async/chat/completions")?;
        tracing::debug!(model = %request.model, "submitting async job");

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "request": request }))
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        Self::parse(resp).await
    }

    /// Fetch an async job by id (status and, once complete, the result).
    pub async fn job(&self, id: &str) -> Result<AsyncJob, ApiError> {
        let url = self.url(&format!("async/chat/completions/{id}"))?;

        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        Self::parse(resp).await
    }

    async fn parse<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }

        resp.json()
            .await
            .map_err(|err| ApiError::Protocol(err.to_string()))
    }

    async fn error_from(resp: Response) -> ApiError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        ApiError::from_status(status, extract_message(&body))
    }
}

#[async_trait]
impl JobSource for Client {
    async fn job_status(&self, id: &str) -> Result<AsyncJob, ApiError> {
        self.job(id).await
    }
}
