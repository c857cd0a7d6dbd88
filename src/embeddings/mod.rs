//! Embedding support for the semantic store.
//!
//! This module provides:
//! - The [`Embedder`] collaborator trait
//! - [`HttpEmbedder`] for OpenAI-compatible embedding servers
//! - [`HashingEmbedder`], a deterministic offline embedder
//! - Vector helpers (distance, normalization)

mod client;
mod hashing;
mod types;
mod vectors;

pub use client::{HttpEmbedder, HttpEmbedderBuilder};
pub use hashing::HashingEmbedder;
pub use types::{EmbeddingRequest, EmbeddingResponse};
pub use vectors::{
    cosine_distance, dot_product, inner_product_distance, magnitude, normalize_vector,
    squared_l2_distance, Vector,
};

use crate::config::EmbedderConfig;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Converts text into fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. Must return exactly one vector per input, in order.
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vector>>;

    /// Embed a single text.
    async fn encode_one(&self, text: &str) -> Result<Vector> {
        let mut vectors = self.encode(&[text.to_string()]).await?;
        match vectors.pop() {
            Some(v) if vectors.is_empty() => Ok(v),
            _ => Err(Error::embedder_with_context(
                "Embedder returned an unexpected number of vectors for a single text",
                ErrorContext::new().with_source(self.model_name()),
            )),
        }
    }

    /// Vector width, when known before the first call.
    fn dimensions(&self) -> Option<usize>;

    fn model_name(&self) -> &str;
}

/// Name prefix selecting the built-in [`HashingEmbedder`].
pub const HASHING_EMBEDDER: &str = "hashing";

/// Build the embedder selected by `config.name`.
///
/// `hashing` and `hashing:<dims>` load the offline [`HashingEmbedder`]; any
/// other name is treated as a model served by an OpenAI-compatible endpoint.
pub fn load_embedder(config: &EmbedderConfig) -> Result<Arc<dyn Embedder>> {
    if let Some(rest) = config.name.strip_prefix(HASHING_EMBEDDER) {
        let dims = match rest.strip_prefix(':') {
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                Error::configuration_with_context(
                    "Invalid hashing embedder width",
                    ErrorContext::new()
                        .with_field_path("embedder.name")
                        .with_details(format!("expected hashing:<dims>, got {}", config.name)),
                )
            })?,
            None if rest.is_empty() => hashing::DEFAULT_DIMENSIONS,
            None => return load_http(config),
        };
        return Ok(Arc::new(HashingEmbedder::new(dims)?));
    }
    load_http(config)
}

fn load_http(config: &EmbedderConfig) -> Result<Arc<dyn Embedder>> {
    let mut builder = HttpEmbedder::builder()
        .model(&config.name)
        .base_url(&config.base_url)
        .max_batch_size(config.max_batch_size)
        .timeout_secs(config.timeout_secs);
    if let Some(ref key) = config.api_key {
        builder = builder.api_key(key);
    }
    Ok(Arc::new(builder.build()?))
}
