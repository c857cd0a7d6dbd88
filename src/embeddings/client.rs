//! Embedder backed by an OpenAI-compatible `/v1/embeddings` endpoint.

use super::types::{EmbeddingRequest, EmbeddingResponse};
use super::{Embedder, Vector};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;

pub struct HttpEmbedder {
    http_client: reqwest::Client,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    dimensions: Option<usize>,
    max_batch_size: usize,
}

impl HttpEmbedder {
    pub fn builder() -> HttpEmbedderBuilder {
        HttpEmbedderBuilder::new()
    }

    async fn execute(&self, texts: Vec<String>) -> Result<Vec<Vector>> {
        let expected = texts.len();
        let mut request = EmbeddingRequest::batch(&self.model, texts);
        if let Some(dims) = self.dimensions {
            request = request.with_dimensions(dims);
        }
        let mut call = self
            .http_client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(ref key) = self.api_key {
            call = call.bearer_auth(key);
        }
        let response = call.send().await.map_err(|e| {
            Error::embedder_with_context(
                format!("Embedding request failed: {}", e),
                ErrorContext::new()
                    .with_source("http_embedder")
                    .with_details(self.endpoint.clone()),
            )
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Error::embedder_with_context(
                format!("Failed to read response: {}", e),
                ErrorContext::new().with_source("http_embedder"),
            )
        })?;
        if !status.is_success() {
            return Err(Error::embedder_with_context(
                format!("Embedding API error ({}): {}", status, body),
                ErrorContext::new().with_source("http_embedder"),
            ));
        }
        let parsed: EmbeddingResponse = serde_json::from_str(&body)?;
        parsed.into_ordered_vectors(expected)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vector>> {
        if texts.len() <= self.max_batch_size {
            return self.execute(texts.to_vec()).await;
        }
        let mut all = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.max_batch_size) {
            all.extend(self.execute(chunk.to_vec()).await?);
        }
        Ok(all)
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

pub struct HttpEmbedderBuilder {
    model: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    dimensions: Option<usize>,
    max_batch_size: usize,
    timeout_secs: u64,
}

impl HttpEmbedderBuilder {
    pub fn new() -> Self {
        Self {
            model: None,
            api_key: None,
            base_url: None,
            dimensions: None,
            max_batch_size: 100,
            timeout_secs: 60,
        }
    }
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
    pub fn dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<HttpEmbedder> {
        let model = self
            .model
            .ok_or_else(|| Error::configuration("Embedding model must be specified"))?;
        if self.max_batch_size == 0 {
            return Err(Error::configuration_with_context(
                "max_batch_size must be at least 1",
                ErrorContext::new().with_field_path("embedder.max_batch_size"),
            ));
        }
        let base_url = self
            .base_url
            .unwrap_or_else(|| crate::config::DEFAULT_EMBEDDINGS_URL.to_string());
        let parsed = url::Url::parse(&base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("Invalid embeddings base URL: {}", e),
                ErrorContext::new()
                    .with_field_path("embedder.base_url")
                    .with_details(base_url.clone()),
            )
        })?;
        let endpoint = format!("{}/v1/embeddings", parsed.as_str().trim_end_matches('/'));
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(HttpEmbedder {
            http_client,
            model,
            endpoint,
            api_key: self.api_key,
            dimensions: self.dimensions,
            max_batch_size: self.max_batch_size,
        })
    }
}

impl Default for HttpEmbedderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
