//! Wire types for OpenAI-compatible embedding endpoints.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};

/// Request body for `POST /v1/embeddings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub input: Vec<String>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding_format: Option<String>,
}

impl EmbeddingRequest {
    pub fn batch(model: impl Into<String>, texts: Vec<String>) -> Self {
        Self {
            input: texts,
            model: model.into(),
            dimensions: None,
            encoding_format: Some("float".to_string()),
        }
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingData {
    pub index: usize,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Response body of an embedding endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: Option<EmbeddingUsage>,
}

impl EmbeddingResponse {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Vectors ordered by their `index` field.
    ///
    /// Servers may answer out of order; the index is authoritative. Fails if
    /// the indices are not exactly `0..expected`.
    pub fn into_ordered_vectors(mut self, expected: usize) -> Result<Vec<Vec<f32>>> {
        self.data.sort_by_key(|d| d.index);
        let contiguous = self.data.len() == expected
            && self.data.iter().enumerate().all(|(i, d)| d.index == i);
        if !contiguous {
            return Err(Error::embedder_with_context(
                "Embedding response does not cover every input",
                ErrorContext::new()
                    .with_source("http_embedder")
                    .with_details(format!("expected {} vectors, got {}", expected, self.data.len())),
            ));
        }
        Ok(self.data.into_iter().map(|d| d.embedding).collect())
    }
}
