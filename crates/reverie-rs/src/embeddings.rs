//! OpenAI-compatible embedding client.

use async_trait::async_trait;
use log::debug;
use reverie_rs_config::EmbeddingsConfig;
use reverie_rs_memory::{EmbeddingProvider, UpstreamError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Stands in for an error body that could not be read.
const UNREADABLE_BODY: &str = "<unreadable body>";

/// Failures talking to the embeddings endpoint.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Building the client or sending the request failed.
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The endpoint answered with a non-success status.
    #[error("embedding API error {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    /// The response carried no embedding.
    #[error("embedding response contained no data")]
    EmptyResponse,
    /// `api_key_env` names a variable that is not set.
    #[error("environment variable {0} is not set")]
    MissingApiKey(String),
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding provider posting to `{base_url}/v1/embeddings`.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingProvider {
    base_url: String,
    model: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl HttpEmbeddingProvider {
    /// Build a client with an optional bearer token and request timeout.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingClientError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            http_client,
        })
    }

    /// Build a client from config, reading the token from `api_key_env` when set.
    pub fn from_config(config: &EmbeddingsConfig) -> Result<Self, EmbeddingClientError> {
        let api_key = match config.api_key_env.as_deref() {
            Some(name) => Some(
                std::env::var(name)
                    .map_err(|_| EmbeddingClientError::MissingApiKey(name.to_string()))?,
            ),
            None => None,
        };
        Self::new(
            config.base_url.clone(),
            config.model.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Model name sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: &self.model,
            input: text,
        };
        let mut http_req = self.http_client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            http_req = http_req.bearer_auth(key);
        }

        let response = http_req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| UNREADABLE_BODY.to_string());
            return Err(EmbeddingClientError::Status { status, body });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or(EmbeddingClientError::EmptyResponse)?;
        debug!(
            "embedded text (model={}, text_len={}, dimensions={})",
            self.model,
            text.len(),
            embedding.len()
        );
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, UpstreamError> {
        Ok(self.request(text).await?)
    }
}
