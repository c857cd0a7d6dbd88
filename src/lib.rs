//! # semantic-store
//!
//! A small semantic record store: text goes in, is embedded, and is upserted
//! with optional metadata into a named, persistent vector collection; queries
//! return the nearest records, closest first.
//!
//! ## Overview
//!
//! The crate is a façade over two collaborators:
//!
//! - an [`Embedder`](embeddings::Embedder) that turns text into fixed-length vectors
//! - a [`VectorStore`](store::VectorStore) that persists collections and answers
//!   nearest-neighbor queries with optional metadata filters
//!
//! Both are traits. The crate ships an HTTP embedder for OpenAI-compatible
//! embedding servers, an offline hashing embedder, and a local store that
//! keeps one JSON snapshot per collection.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use semantic_store::facade::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> semantic_store::Result<()> {
//!     let store = SemanticStore::open(
//!         StoreConfig::new()
//!             .with_persist_directory("semantic_db")
//!             .with_embedder_name("hashing"),
//!     )
//!     .await?;
//!     let interests = store.set_active_collection("interests").await?;
//!
//!     let mut metadata = Metadata::new();
//!     metadata.insert("name".into(), "Alice".into());
//!     let id = interests
//!         .insert("I enjoy hiking and mountain climbing.", Some(metadata), None)
//!         .await?;
//!
//!     let hits = interests
//!         .query("physical activity, sports, and fitness", DEFAULT_TOP_K, None)
//!         .await?;
//!     assert!(hits.iter().any(|h| h.id == id));
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`facade`] | [`SemanticStore`] and per-collection [`CollectionHandle`] |
//! | [`embeddings`] | Embedder trait, HTTP and hashing embedders, vector math |
//! | [`store`] | Vector store traits, filter grammar, local persistent store |
//! | [`types`] | Records, query hits and scalar metadata |
//! | [`config`] | Store configuration (code, YAML, environment) |

pub mod config;
pub mod embeddings;
pub mod facade;
pub mod store;
pub mod types;

pub use config::{EmbedderConfig, StoreConfig};
pub use facade::{CollectionHandle, SemanticStore};
pub use types::{Metadata, MetadataValue, QueryHit, Record};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
