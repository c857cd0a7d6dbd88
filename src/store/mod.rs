//! Vector collection store collaborator.
//!
//! # Vector Store Module
//!
//! The façade never computes distances or touches disk itself. It talks to a
//! [`VectorStore`], which hands out named [`VectorCollection`]s supporting
//! upsert-by-id, get-by-id, delete-by-id and nearest-neighbor queries with an
//! optional metadata filter.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`VectorStore`] | Get-or-create, list and drop named collections |
//! | [`VectorCollection`] | Record-level operations on one collection |
//! | [`LocalVectorStore`] | Exact-scan store persisting one JSON snapshot per collection |
//! | [`Where`] | Parsed metadata filter (`$eq`, `$in`, `$and`, ...) |
//!
//! Request and response shapes are column-oriented: parallel vectors of ids,
//! embeddings, documents and metadatas. Query results are nested one level
//! deeper, one inner vector per query embedding.

mod filter;
mod local;
mod persistence;

pub use filter::{Comparison, Where};
pub use local::{validate_collection_name, LocalCollection, LocalVectorStore};

use crate::embeddings::Vector;
use crate::types::Metadata;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Distance function of a collection. Smaller is always closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Squared Euclidean distance.
    #[default]
    #[serde(rename = "l2")]
    L2,
    /// `1 - cosine similarity`.
    #[serde(rename = "cosine")]
    Cosine,
    /// `1 - inner product`.
    #[serde(rename = "ip")]
    InnerProduct,
}

impl DistanceMetric {
    pub fn distance(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        use crate::embeddings::{cosine_distance, inner_product_distance, squared_l2_distance};
        match self {
            DistanceMetric::L2 => squared_l2_distance(a, b),
            DistanceMetric::Cosine => cosine_distance(a, b),
            DistanceMetric::InnerProduct => inner_product_distance(a, b),
        }
    }
}

/// Insert-or-replace request. All present vectors are parallel to `ids`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertRequest {
    pub ids: Vec<String>,
    /// `None` keeps the stored embedding of existing ids.
    pub embeddings: Option<Vec<Vector>>,
    pub documents: Vec<Option<String>>,
    /// `None` clears metadata on every upserted record.
    pub metadatas: Option<Vec<Option<Metadata>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub query_embeddings: Vec<Vector>,
    pub n_results: usize,
    /// Opaque filter expression, interpreted by the store.
    pub where_filter: Option<serde_json::Value>,
}

/// Nearest-neighbor results, one inner vector per query embedding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub ids: Vec<Vec<String>>,
    pub documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    pub metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    pub distances: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetResponse {
    pub ids: Vec<String>,
    pub documents: Vec<Option<String>>,
    #[serde(default)]
    pub metadatas: Option<Vec<Option<Metadata>>>,
}

impl GetResponse {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One named collection of records.
#[async_trait]
pub trait VectorCollection: Send + Sync {
    fn name(&self) -> &str;
    async fn upsert(&self, request: UpsertRequest) -> Result<()>;
    async fn query(&self, request: QueryRequest) -> Result<QueryResponse>;
    /// Fetch by exact id. Unknown ids are omitted from the response.
    async fn get(&self, ids: &[String]) -> Result<GetResponse>;
    /// Remove by id. Unknown ids are ignored.
    async fn delete(&self, ids: &[String]) -> Result<()>;
    async fn count(&self) -> Result<usize>;
}

/// Addressable set of persistent collections.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn get_or_create_collection(&self, name: &str) -> Result<Arc<dyn VectorCollection>>;
    async fn list_collections(&self) -> Result<Vec<String>>;
    /// Returns whether a collection was removed.
    async fn delete_collection(&self, name: &str) -> Result<bool>;
    fn name(&self) -> &'static str;
}
