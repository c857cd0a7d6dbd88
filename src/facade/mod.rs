//! The semantic store façade.
//!
//! [`SemanticStore`] owns the embedder and the vector store. Record
//! operations go through a [`CollectionHandle`], obtained from
//! [`SemanticStore::open_collection`] or [`SemanticStore::set_active_collection`].
//! Handles are cheap to clone and independent of each other, so several
//! collections can be used concurrently from one process.

mod collection;
pub mod prelude;

pub use collection::{CollectionHandle, DEFAULT_TOP_K};

use crate::config::StoreConfig;
use crate::embeddings::{load_embedder, Embedder, Vector};
use crate::store::{LocalVectorStore, VectorStore};
use crate::{Error, ErrorContext, Result};
use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// Default chunk size of [`SemanticStore::embed_batch`].
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 16;

pub struct SemanticStore {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    active: ArcSwapOption<CollectionHandle>,
}

impl SemanticStore {
    /// Create the persistence directory, load the embedder, open the local
    /// store and activate `config.collection_name` if set.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.persist_directory)
            .await
            .map_err(|e| {
                Error::configuration_with_context(
                    format!("Cannot create persist directory: {}", e),
                    ErrorContext::new()
                        .with_field_path("persist_directory")
                        .with_details(config.persist_directory.display().to_string()),
                )
            })?;
        let embedder = load_embedder(&config.embedder)?;
        let store = LocalVectorStore::open(&config.persist_directory, config.distance).await?;
        tracing::info!(
            "Opened semantic store at {} (embedder: {})",
            config.persist_directory.display(),
            embedder.model_name()
        );
        let facade = Self::from_parts(embedder, Arc::new(store));
        if let Some(ref name) = config.collection_name {
            facade.set_active_collection(name).await?;
        }
        Ok(facade)
    }

    /// Build a façade over caller-supplied collaborators. No collection is active.
    pub fn from_parts(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            active: ArcSwapOption::empty(),
        }
    }

    /// Get-or-create a collection without changing the active one.
    pub async fn open_collection(&self, name: &str) -> Result<CollectionHandle> {
        let collection = self.store.get_or_create_collection(name).await?;
        Ok(CollectionHandle::new(collection, self.embedder.clone()))
    }

    /// Get-or-create a collection and make it the active one.
    pub async fn set_active_collection(&self, name: &str) -> Result<CollectionHandle> {
        let handle = self.open_collection(name).await?;
        self.active.store(Some(Arc::new(handle.clone())));
        tracing::debug!("Active collection is now '{}'", name);
        Ok(handle)
    }

    /// The active collection, if one was set.
    pub fn active(&self) -> Option<CollectionHandle> {
        self.active.load_full().map(|h| (*h).clone())
    }

    /// The active collection, or a validation error when none is set.
    pub fn require_active(&self) -> Result<CollectionHandle> {
        self.active().ok_or_else(|| {
            Error::validation_with_context(
                "No active collection; call set_active_collection first",
                ErrorContext::new().with_source("facade"),
            )
        })
    }

    pub async fn list_collections(&self) -> Result<Vec<String>> {
        self.store.list_collections().await
    }

    /// Drop a collection. Clears the active handle if it pointed there;
    /// handles opened before the drop fail with [`Error::Store`] afterwards.
    pub async fn delete_collection(&self, name: &str) -> Result<bool> {
        let removed = self.store.delete_collection(name).await?;
        if self.active().is_some_and(|h| h.name() == name) {
            self.active.store(None);
        }
        Ok(removed)
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub async fn embed(&self, text: &str) -> Result<Vector> {
        self.embedder.encode_one(text).await
    }

    pub async fn embed_batch(
        &self,
        texts: &[String],
        batch_size: usize,
        show_progress: bool,
    ) -> Result<Vec<Vector>> {
        embed_in_batches(self.embedder.as_ref(), texts, batch_size, show_progress).await
    }
}

/// Embed `texts` in chunks of `batch_size`, one vector per text, in order.
pub(crate) async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
    show_progress: bool,
) -> Result<Vec<Vector>> {
    if batch_size == 0 {
        return Err(Error::validation_with_context(
            "batch_size must be at least 1",
            ErrorContext::new().with_field_path("batch_size"),
        ));
    }
    let total_batches = texts.len().div_ceil(batch_size);
    let mut vectors = Vec::with_capacity(texts.len());
    for (i, chunk) in texts.chunks(batch_size).enumerate() {
        let batch = embedder.encode(chunk).await?;
        if batch.len() != chunk.len() {
            return Err(Error::embedder_with_context(
                "Embedder returned an unexpected number of vectors",
                ErrorContext::new()
                    .with_source(embedder.model_name())
                    .with_details(format!("expected {}, got {}", chunk.len(), batch.len())),
            ));
        }
        vectors.extend(batch);
        if show_progress {
            tracing::info!(
                "Batches: {}/{} ({} of {} texts embedded)",
                i + 1,
                total_batches,
                vectors.len(),
                texts.len()
            );
        }
    }
    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records the size of every encode call.
    struct CountingEmbedder {
        calls: Mutex<Vec<usize>>,
        drop_last: bool,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn encode(&self, texts: &[String]) -> Result<Vec<Vector>> {
            self.calls.lock().unwrap().push(texts.len());
            let mut out: Vec<Vector> = texts.iter().map(|t| vec![t.len() as f32]).collect();
            if self.drop_last {
                out.pop();
            }
            Ok(out)
        }
        fn dimensions(&self) -> Option<usize> {
            Some(1)
        }
        fn model_name(&self) -> &str {
            "counting"
        }
    }

    fn counting(drop_last: bool) -> CountingEmbedder {
        CountingEmbedder {
            calls: Mutex::new(Vec::new()),
            drop_last,
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| "x".repeat(i + 1)).collect()
    }

    #[tokio::test]
    async fn test_chunks_and_preserves_order() {
        let embedder = counting(false);
        let input = texts(37);
        let vectors = embed_in_batches(&embedder, &input, 16, false).await.unwrap();
        assert_eq!(*embedder.calls.lock().unwrap(), vec![16, 16, 5]);
        let lengths: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
        let expected: Vec<f32> = (1..=37).map(|n| n as f32).collect();
        assert_eq!(lengths, expected);
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_validation_error() {
        let err = embed_in_batches(&counting(false), &texts(2), 0, true)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_short_embedder_output_is_collaborator_error() {
        let err = embed_in_batches(&counting(true), &texts(3), 16, false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Embedder { .. }));
    }

    #[tokio::test]
    async fn test_active_collection_switching() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVectorStore::open(dir.path(), Default::default())
            .await
            .unwrap();
        let facade = SemanticStore::from_parts(
            Arc::new(HashingEmbedder::new(16).unwrap()),
            Arc::new(store),
        );
        assert!(facade.active().is_none());
        assert!(facade.require_active().unwrap_err().is_validation());

        facade.set_active_collection("first").await.unwrap();
        let second = facade.open_collection("second").await.unwrap();
        assert_eq!(facade.active().unwrap().name(), "first");
        assert_eq!(second.name(), "second");

        facade.set_active_collection("second").await.unwrap();
        assert_eq!(facade.require_active().unwrap().name(), "second");

        assert!(facade.delete_collection("second").await.unwrap());
        assert!(facade.active().is_none());
        assert_eq!(facade.list_collections().await.unwrap(), vec!["first"]);
    }
}
