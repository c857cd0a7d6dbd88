//! Persistent exact-scan vector store.

use super::filter::Where;
use super::persistence::{
    load_snapshot, save_snapshot, snapshot_path, CollectionData, StoredEntry, SNAPSHOT_EXTENSION,
};
use super::{
    DistanceMetric, GetResponse, QueryRequest, QueryResponse, UpsertRequest, VectorCollection,
    VectorStore,
};
use crate::types::validate_metadata;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

fn store_error(msg: impl Into<String>, collection: &str) -> Error {
    Error::store_with_context(
        msg,
        ErrorContext::new()
            .with_source("local_store")
            .with_details(format!("collection: {}", collection)),
    )
}

/// Collection names: 3-63 characters of `[A-Za-z0-9._-]`, alphanumeric at both ends.
pub fn validate_collection_name(name: &str) -> Result<()> {
    let len_ok = (3..=63).contains(&name.len());
    let chars_ok = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    let ends_ok = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric())
        && name
            .chars()
            .last()
            .is_some_and(|c| c.is_ascii_alphanumeric());
    if len_ok && chars_ok && ends_ok && !name.contains("..") {
        return Ok(());
    }
    Err(Error::validation_with_context(
        "Collection names must be 3-63 characters of [A-Za-z0-9._-], starting and ending alphanumeric",
        ErrorContext::new()
            .with_field_path("collection_name")
            .with_details(name.to_string())
            .with_source("local_store"),
    ))
}

/// Load slot for one collection name. Empty until first opened.
type Slot = Arc<Mutex<Option<Arc<LocalCollection>>>>;

/// Store keeping every collection in memory and mirroring it to
/// `<root>/<name>.json` after each mutation.
pub struct LocalVectorStore {
    root: PathBuf,
    metric: DistanceMetric,
    // The outer lock only guards the map; snapshot I/O happens under the
    // per-name slot lock.
    slots: Mutex<HashMap<String, Slot>>,
}

impl LocalVectorStore {
    /// Open (and create if needed) the store directory. Snapshots load lazily.
    pub async fn open(root: impl Into<PathBuf>, metric: DistanceMetric) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            metric,
            slots: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    async fn slot(&self, name: &str) -> Slot {
        self.slots
            .lock()
            .await
            .entry(name.to_string())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn get_or_create_collection(&self, name: &str) -> Result<Arc<dyn VectorCollection>> {
        validate_collection_name(name)?;
        let slot = self.slot(name).await;
        let mut loaded = slot.lock().await;
        if let Some(ref existing) = *loaded {
            return Ok(existing.clone());
        }
        let path = snapshot_path(&self.root, name);
        let data = if tokio::fs::try_exists(&path).await? {
            load_snapshot(&path).await?
        } else {
            let data = CollectionData::new(name, self.metric);
            save_snapshot(&path, &data).await?;
            tracing::info!("Created collection '{}' ({:?})", name, self.metric);
            data
        };
        let collection = Arc::new(LocalCollection {
            name: name.to_string(),
            path,
            state: RwLock::new(data),
            dropped: AtomicBool::new(false),
        });
        *loaded = Some(collection.clone());
        Ok(collection)
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        // Every created collection has a snapshot on disk.
        let mut names = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some(SNAPSHOT_EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if validate_collection_name(stem).is_ok() => {
                    names.push(stem.to_string())
                }
                _ => tracing::warn!("Skipping unrecognized file in store: {:?}", path),
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete_collection(&self, name: &str) -> Result<bool> {
        validate_collection_name(name)?;
        let slot = self.slot(name).await;
        let mut loaded = slot.lock().await;
        let cached = match loaded.take() {
            Some(collection) => {
                // Waits for in-flight writes, then refuses later ones.
                let _state = collection.state.write().await;
                collection.dropped.store(true, Ordering::Release);
                true
            }
            None => false,
        };
        let path = snapshot_path(&self.root, name);
        let on_disk = tokio::fs::try_exists(&path).await?;
        if on_disk {
            tokio::fs::remove_file(&path).await?;
        }
        if cached || on_disk {
            tracing::info!("Deleted collection '{}'", name);
        }
        Ok(cached || on_disk)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

pub struct LocalCollection {
    name: String,
    path: PathBuf,
    state: RwLock<CollectionData>,
    /// Set once the collection is deleted from its store.
    dropped: AtomicBool,
}

impl LocalCollection {
    pub async fn metric(&self) -> DistanceMetric {
        self.state.read().await.metric
    }

    pub async fn dimension(&self) -> Option<usize> {
        self.state.read().await.dimension
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::Acquire)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_dropped() {
            return Err(store_error(
                format!("Collection '{}' has been deleted", self.name),
                &self.name,
            ));
        }
        Ok(())
    }

    fn check_upsert_shape(&self, request: &UpsertRequest) -> Result<()> {
        let n = request.ids.len();
        if n == 0 {
            return Err(store_error("Expected IDs to be a non-empty list", &self.name));
        }
        if request.documents.len() != n {
            return Err(store_error(
                format!("Expected {} documents, got {}", n, request.documents.len()),
                &self.name,
            ));
        }
        if let Some(ref embeddings) = request.embeddings {
            if embeddings.len() != n {
                return Err(store_error(
                    format!("Expected {} embeddings, got {}", n, embeddings.len()),
                    &self.name,
                ));
            }
        }
        if let Some(ref metadatas) = request.metadatas {
            if metadatas.len() != n {
                return Err(store_error(
                    format!("Expected {} metadatas, got {}", n, metadatas.len()),
                    &self.name,
                ));
            }
        }
        if let Some(ref embeddings) = request.embeddings {
            if let Some(i) = embeddings
                .iter()
                .position(|e| e.iter().any(|x| !x.is_finite()))
            {
                return Err(store_error(
                    format!("Embedding for id '{}' contains non-finite values", request.ids[i]),
                    &self.name,
                ));
            }
        }
        if let Some(ref metadatas) = request.metadatas {
            for (id, metadata) in request.ids.iter().zip(metadatas) {
                if let Some(m) = metadata {
                    validate_metadata(m, "metadata").map_err(|e| {
                        store_error(format!("Metadata for id '{}': {}", id, e), &self.name)
                    })?;
                }
            }
        }
        let mut seen = HashSet::with_capacity(n);
        let duplicates: Vec<&str> = request
            .ids
            .iter()
            .filter(|id| !seen.insert(id.as_str()))
            .map(|id| id.as_str())
            .collect();
        if !duplicates.is_empty() {
            return Err(store_error(
                format!(
                    "Expected IDs to be unique, found duplicates of: {}",
                    duplicates.join(", ")
                ),
                &self.name,
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorCollection for LocalCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, request: UpsertRequest) -> Result<()> {
        self.check_upsert_shape(&request)?;
        let mut state = self.state.write().await;
        self.ensure_live()?;
        // Mutate a copy so a failed write leaves memory and disk in agreement.
        let mut next = state.clone();
        let UpsertRequest {
            ids,
            embeddings,
            documents,
            metadatas,
        } = request;
        let count = ids.len();
        let mut embeddings = embeddings.map(|e| e.into_iter());
        let mut metadatas = metadatas.map(|m| m.into_iter());
        for (id, document) in ids.into_iter().zip(documents) {
            let metadata = metadatas.as_mut().and_then(|m| m.next()).flatten();
            let embedding = match embeddings.as_mut().and_then(|e| e.next()) {
                Some(embedding) => embedding,
                None => match next.entries.get(&id) {
                    Some(existing) => existing.embedding.clone(),
                    None => {
                        return Err(store_error(
                            format!("No embedding supplied for new id '{}'", id),
                            &self.name,
                        ))
                    }
                },
            };
            match next.dimension {
                Some(dim) if dim != embedding.len() => {
                    return Err(store_error(
                        format!(
                            "Embedding dimension {} does not match collection dimensionality {}",
                            embedding.len(),
                            dim
                        ),
                        &self.name,
                    ))
                }
                Some(_) => {}
                None => next.dimension = Some(embedding.len()),
            }
            next.entries.insert(
                id,
                StoredEntry {
                    embedding,
                    document,
                    metadata,
                },
            );
        }
        save_snapshot(&self.path, &next).await?;
        *state = next;
        tracing::debug!("Upserted {} records into '{}'", count, self.name);
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryResponse> {
        if request.n_results == 0 {
            return Err(store_error(
                "Expected n_results to be a positive integer",
                &self.name,
            ));
        }
        let filter = request.where_filter.as_ref().map(Where::parse).transpose()?;
        let state = self.state.read().await;
        self.ensure_live()?;
        let mut response = QueryResponse {
            metadatas: Some(Vec::with_capacity(request.query_embeddings.len())),
            ..QueryResponse::default()
        };
        for query in &request.query_embeddings {
            if let Some(dim) = state.dimension {
                if dim != query.len() {
                    return Err(store_error(
                        format!(
                            "Query embedding dimension {} does not match collection dimensionality {}",
                            query.len(),
                            dim
                        ),
                        &self.name,
                    ));
                }
            }
            let mut scored: Vec<(f32, &String, &StoredEntry)> = Vec::new();
            for (id, entry) in &state.entries {
                if let Some(ref f) = filter {
                    if !f.matches(entry.metadata.as_ref()) {
                        continue;
                    }
                }
                scored.push((state.metric.distance(query, &entry.embedding)?, id, entry));
            }
            scored.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));
            scored.truncate(request.n_results);

            response.ids.push(scored.iter().map(|(_, id, _)| (*id).clone()).collect());
            response
                .documents
                .push(scored.iter().map(|(_, _, e)| e.document.clone()).collect());
            response.distances.push(scored.iter().map(|(d, _, _)| *d).collect());
            if let Some(ref mut metadatas) = response.metadatas {
                metadatas.push(scored.iter().map(|(_, _, e)| e.metadata.clone()).collect());
            }
        }
        Ok(response)
    }

    async fn get(&self, ids: &[String]) -> Result<GetResponse> {
        let state = self.state.read().await;
        self.ensure_live()?;
        let mut response = GetResponse {
            metadatas: Some(Vec::new()),
            ..GetResponse::default()
        };
        for id in ids {
            if let Some(entry) = state.entries.get(id) {
                response.ids.push(id.clone());
                response.documents.push(entry.document.clone());
                if let Some(ref mut metadatas) = response.metadatas {
                    metadatas.push(entry.metadata.clone());
                }
            }
        }
        Ok(response)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut state = self.state.write().await;
        self.ensure_live()?;
        if !ids.iter().any(|id| state.entries.contains_key(id)) {
            return Ok(());
        }
        let mut next = state.clone();
        for id in ids {
            next.entries.remove(id);
        }
        save_snapshot(&self.path, &next).await?;
        *state = next;
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let state = self.state.read().await;
        self.ensure_live()?;
        Ok(state.entries.len())
    }
}
