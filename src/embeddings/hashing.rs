//! Offline embedder based on signed feature hashing.
//!
//! Each lowercase word and each adjacent word pair is hashed with SHA-256
//! into one of `dimensions` buckets with a ±1 sign, and the resulting vector
//! is L2-normalized. Output is deterministic across runs and machines, so it
//! is suitable for tests and for stores that must work without a model
//! server. Texts that share words land close to each other; there is no
//! semantic generalization beyond that.

use super::{normalize_vector, Embedder, Vector};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Width of `all-MiniLM-L6-v2`, the model this embedder usually stands in for.
pub(crate) const DEFAULT_DIMENSIONS: usize = 384;

const BIGRAM_WEIGHT: f32 = 0.5;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("static regex"));

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
    name: String,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::configuration_with_context(
                "Hashing embedder needs at least one dimension",
                ErrorContext::new().with_field_path("embedder.name"),
            ));
        }
        let name = if dimensions == DEFAULT_DIMENSIONS {
            super::HASHING_EMBEDDER.to_string()
        } else {
            format!("{}:{}", super::HASHING_EMBEDDER, dimensions)
        };
        Ok(Self { dimensions, name })
    }

    /// Embed one text synchronously.
    pub fn embed_text(&self, text: &str) -> Vector {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = WORD.find_iter(&lowered).map(|m| m.as_str()).collect();
        let mut vector = vec![0.0f32; self.dimensions];
        for token in &tokens {
            self.accumulate(&mut vector, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let feature = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut vector, feature.as_bytes(), BIGRAM_WEIGHT);
        }
        normalize_vector(&vector)
    }

    fn accumulate(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let digest = Sha256::digest(feature);
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
            name: super::HASHING_EMBEDDER.to_string(),
        }
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vector>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimensions)
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{magnitude, squared_l2_distance};

    #[test]
    fn test_deterministic_and_normalized() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed_text("I enjoy hiking and mountain climbing.");
        let b = embedder.embed_text("I enjoy hiking and mountain climbing.");
        assert_eq!(a, b);
        assert_eq!(a.len(), 384);
        assert!((magnitude(&a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let embedder = HashingEmbedder::new(64).unwrap();
        assert_eq!(
            embedder.embed_text("Running, Swimming!"),
            embedder.embed_text("running swimming")
        );
    }

    #[test]
    fn test_shared_words_are_closer() {
        let embedder = HashingEmbedder::new(256).unwrap();
        let query = embedder.embed_text("running and swimming");
        let near = embedder.embed_text("Swimming and running are my favorite activities.");
        let far = embedder.embed_text("A detailed explanation of quantum mechanics");
        let d_near = squared_l2_distance(&query, &near).unwrap();
        let d_far = squared_l2_distance(&query, &far).unwrap();
        assert!(d_near < d_far, "{} !< {}", d_near, d_far);
    }

    #[test]
    fn test_text_without_words_is_zero_vector() {
        let embedder = HashingEmbedder::new(8).unwrap();
        assert_eq!(embedder.embed_text("?!"), vec![0.0; 8]);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(HashingEmbedder::new(0).is_err());
    }

    #[test]
    fn test_encode_preserves_order() {
        let embedder = HashingEmbedder::new(32).unwrap();
        let texts = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let vectors = tokio_test::block_on(embedder.encode(&texts)).unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[1], embedder.embed_text("beta"));
        assert_eq!(embedder.model_name(), "hashing:32");
    }
}
