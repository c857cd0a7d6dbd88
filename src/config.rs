//! Store configuration.
//!
//! Configuration can be built in code, loaded from a YAML file, and
//! overridden from the environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `SEMANTIC_STORE_DIR` | `persist_directory` |
//! | `SEMANTIC_STORE_COLLECTION` | `collection_name` |
//! | `SEMANTIC_STORE_EMBEDDER` | `embedder.name` |
//! | `SEMANTIC_STORE_EMBEDDINGS_URL` | `embedder.base_url` |
//! | `SEMANTIC_STORE_API_KEY` | `embedder.api_key` |

use crate::store::DistanceMetric;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PERSIST_DIRECTORY: &str = "semantic_db";
pub const DEFAULT_COLLECTION: &str = "my_collection";
pub const DEFAULT_EMBEDDER: &str = "all-MiniLM-L6-v2";
/// Default port of text-embeddings-inference.
pub const DEFAULT_EMBEDDINGS_URL: &str = "http://localhost:8080";

/// Embedder selection and connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedderConfig {
    /// `hashing`, `hashing:<dims>`, or a model name served over HTTP.
    #[serde(default = "default_embedder")]
    pub name: String,
    #[serde(default = "default_embeddings_url")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_embedder() -> String {
    DEFAULT_EMBEDDER.to_string()
}

fn default_embeddings_url() -> String {
    DEFAULT_EMBEDDINGS_URL.to_string()
}

fn default_max_batch_size() -> usize {
    100
}

fn default_timeout_secs() -> u64 {
    60
}

impl EmbedderConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            name: default_embedder(),
            base_url: default_embeddings_url(),
            api_key: None,
            max_batch_size: default_max_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Top-level configuration for [`SemanticStore::open`](crate::SemanticStore::open).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding collection snapshots; created if absent.
    #[serde(default = "default_persist_directory")]
    pub persist_directory: PathBuf,
    /// Collection activated on open. `None` opens no collection.
    #[serde(default = "default_collection")]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub embedder: EmbedderConfig,
    /// Metric for newly created collections.
    #[serde(default)]
    pub distance: DistanceMetric,
}

fn default_persist_directory() -> PathBuf {
    PathBuf::from(DEFAULT_PERSIST_DIRECTORY)
}

fn default_collection() -> Option<String> {
    Some(DEFAULT_COLLECTION.to_string())
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            persist_directory: default_persist_directory(),
            collection_name: default_collection(),
            embedder: EmbedderConfig::default(),
            distance: DistanceMetric::default(),
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_persist_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persist_directory = dir.into();
        self
    }

    pub fn with_collection(mut self, name: impl Into<String>) -> Self {
        self.collection_name = Some(name.into());
        self
    }

    pub fn without_collection(mut self) -> Self {
        self.collection_name = None;
        self
    }

    /// Shorthand for selecting the embedder by name.
    pub fn with_embedder_name(mut self, name: impl Into<String>) -> Self {
        self.embedder.name = name.into();
        self
    }

    pub fn with_embedder(mut self, embedder: EmbedderConfig) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn with_distance(mut self, distance: DistanceMetric) -> Self {
        self.distance = distance;
        self
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).map_err(|e| {
            Error::configuration_with_context(
                format!("Invalid store configuration: {}", e),
                ErrorContext::new().with_source("config"),
            )
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("Failed to read configuration: {}", e),
                ErrorContext::new().with_details(path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Apply `SEMANTIC_STORE_*` environment overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    pub(crate) fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup("SEMANTIC_STORE_DIR") {
            self.persist_directory = PathBuf::from(dir);
        }
        if let Some(name) = lookup("SEMANTIC_STORE_COLLECTION") {
            self.collection_name = Some(name);
        }
        if let Some(name) = lookup("SEMANTIC_STORE_EMBEDDER") {
            self.embedder.name = name;
        }
        if let Some(url) = lookup("SEMANTIC_STORE_EMBEDDINGS_URL") {
            self.embedder.base_url = url;
        }
        if let Some(key) = lookup("SEMANTIC_STORE_API_KEY") {
            self.embedder.api_key = Some(key);
        }
        self
    }
}
