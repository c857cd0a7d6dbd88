//! Record operations against one collection.

use super::{embed_in_batches, DEFAULT_EMBED_BATCH_SIZE};
use crate::embeddings::{Embedder, Vector};
use crate::store::{QueryRequest, QueryResponse, UpsertRequest, VectorCollection};
use crate::types::{validate_metadata, Metadata, QueryHit, Record};
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use uuid::Uuid;

/// Number of results `query` callers usually ask for.
pub const DEFAULT_TOP_K: usize = 5;

/// Handle to one named collection plus the embedder that feeds it.
#[derive(Clone)]
pub struct CollectionHandle {
    collection: Arc<dyn VectorCollection>,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for CollectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionHandle").finish_non_exhaustive()
    }
}

fn validation(msg: impl Into<String>, field: impl Into<String>) -> Error {
    Error::validation_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(field)
            .with_source("facade"),
    )
}

fn length_mismatch(field: &str, expected: usize, actual: usize) -> Error {
    Error::validation_with_context(
        format!("The number of '{}' must match the number of 'texts'", field),
        ErrorContext::new()
            .with_field_path(field)
            .with_details(format!("expected {}, got {}", expected, actual))
            .with_source("facade"),
    )
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Empty maps are stored as "no metadata".
fn non_empty(metadata: Option<Metadata>) -> Option<Metadata> {
    metadata.filter(|m| !m.is_empty())
}

impl CollectionHandle {
    pub(crate) fn new(collection: Arc<dyn VectorCollection>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            collection,
            embedder,
        }
    }

    pub fn name(&self) -> &str {
        self.collection.name()
    }

    pub async fn count(&self) -> Result<usize> {
        self.collection.count().await
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

    /// Insert or replace one record. Returns the id used, generating a UUID
    /// when none is given.
    pub async fn insert(
        &self,
        text: &str,
        metadata: Option<Metadata>,
        id: Option<String>,
    ) -> Result<String> {
        if text.is_empty() {
            return Err(validation("The text content cannot be empty", "text"));
        }
        let metadata = non_empty(metadata);
        if let Some(ref m) = metadata {
            validate_metadata(m, "metadata")?;
        }
        let id = id.unwrap_or_else(generate_id);
        let embedding = self.embed(text).await?;
        self.collection
            .upsert(UpsertRequest {
                ids: vec![id.clone()],
                embeddings: Some(vec![embedding]),
                documents: vec![Some(text.to_string())],
                metadatas: metadata.clone().map(|m| vec![Some(m)]),
            })
            .await?;
        tracing::info!(
            "Upserted text with ID: {}, Metadata: {:?} (collection: {})",
            id,
            metadata,
            self.name()
        );
        Ok(id)
    }

    /// Insert or replace many records with one embedding pass and one upsert.
    ///
    /// `ids` may contain `None` slots, which receive generated ids. Returns
    /// the ids in the order of `texts`.
    pub async fn batch_insert(
        &self,
        texts: &[String],
        metadatas: Option<Vec<Option<Metadata>>>,
        ids: Option<Vec<Option<String>>>,
    ) -> Result<Vec<String>> {
        if texts.is_empty() {
            return Err(validation(
                "The 'texts' parameter must be a non-empty list of strings",
                "texts",
            ));
        }
        if let Some(i) = texts.iter().position(|t| t.is_empty()) {
            return Err(validation(
                "The text content cannot be empty",
                format!("texts[{}]", i),
            ));
        }
        let ids: Vec<String> = match ids {
            None => texts.iter().map(|_| generate_id()).collect(),
            Some(ids) if ids.len() != texts.len() => {
                return Err(length_mismatch("ids", texts.len(), ids.len()))
            }
            Some(ids) => ids
                .into_iter()
                .map(|id| id.unwrap_or_else(generate_id))
                .collect(),
        };
        let metadatas = match metadatas {
            Some(m) if m.len() != texts.len() => {
                return Err(length_mismatch("metadatas", texts.len(), m.len()))
            }
            Some(m) => Some(m.into_iter().map(non_empty).collect::<Vec<_>>()),
            None => None,
        };
        for (i, m) in metadatas.iter().flatten().enumerate() {
            if let Some(m) = m {
                validate_metadata(m, &format!("metadatas[{}]", i))?;
            }
        }

        let embeddings = self
            .embed_batch(texts, DEFAULT_EMBED_BATCH_SIZE, true)
            .await?;
        self.collection
            .upsert(UpsertRequest {
                ids: ids.clone(),
                embeddings: Some(embeddings),
                documents: texts.iter().cloned().map(Some).collect(),
                metadatas,
            })
            .await?;
        tracing::info!(
            "Upserted {} texts into the database (collection: {})",
            texts.len(),
            self.name()
        );
        Ok(ids)
    }

    /// Nearest neighbors of `query_text`, closest first.
    ///
    /// `where_filter` is handed to the collection untouched; its grammar is
    /// the store's.
    pub async fn query(
        &self,
        query_text: &str,
        top_k: usize,
        where_filter: Option<&serde_json::Value>,
    ) -> Result<Vec<QueryHit>> {
        let embedding = self.embed(query_text).await?;
        let response = self
            .collection
            .query(QueryRequest {
                query_embeddings: vec![embedding],
                n_results: top_k,
                where_filter: where_filter.cloned(),
            })
            .await?;
        let hits = flatten_first(response, self.name())?;
        tracing::debug!(
            "Query returned {} hits (top_k: {}, collection: {})",
            hits.len(),
            top_k,
            self.name()
        );
        Ok(hits)
    }

    pub async fn get(&self, id: &str) -> Result<Record> {
        let response = self.collection.get(&[id.to_string()]).await?;
        let text = match response.documents.into_iter().next() {
            Some(text) => text,
            None => return Err(Error::not_found(id, self.name())),
        };
        let metadata = response
            .metadatas
            .and_then(|m| m.into_iter().next())
            .flatten();
        Ok(Record {
            id: id.to_string(),
            text,
            metadata,
        })
    }

    /// Remove a record. Unknown ids are not an error.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.collection.delete(&[id.to_string()]).await?;
        tracing::info!("Deleted entry with ID: {} (collection: {})", id, self.name());
        Ok(())
    }

    /// Replace the text and metadata of an existing record.
    ///
    /// Both fields are overwritten, not merged: passing `text = None` leaves
    /// the record without text (its embedding is kept), and `metadata = None`
    /// clears its metadata.
    pub async fn update(
        &self,
        id: &str,
        text: Option<&str>,
        metadata: Option<Metadata>,
    ) -> Result<()> {
        if id.is_empty() {
            return Err(validation(
                "Must use valid id, id should not be empty",
                "id",
            ));
        }
        if text.is_some_and(str::is_empty) {
            return Err(validation("The text content cannot be empty", "text"));
        }
        let metadata = non_empty(metadata);
        if let Some(ref m) = metadata {
            validate_metadata(m, "metadata")?;
        }
        let existing = self.collection.get(&[id.to_string()]).await?;
        if existing.is_empty() {
            return Err(Error::not_found(id, self.name()));
        }
        let embeddings = match text {
            Some(t) => Some(vec![self.embed(t).await?]),
            None => None,
        };
        self.collection
            .upsert(UpsertRequest {
                ids: vec![id.to_string()],
                embeddings,
                documents: vec![text.map(str::to_string)],
                metadatas: metadata.clone().map(|m| vec![Some(m)]),
            })
            .await?;
        tracing::info!(
            "Updated entry with ID: {}, Metadata: {:?} (collection: {})",
            id,
            metadata,
            self.name()
        );
        Ok(())
    }
}

/// Flatten the first (only) query of a nested response into hits.
fn flatten_first(response: QueryResponse, collection: &str) -> Result<Vec<QueryHit>> {
    let QueryResponse {
        ids,
        documents,
        metadatas,
        distances,
    } = response;
    let ids = ids.into_iter().next().unwrap_or_default();
    let documents = documents.into_iter().next().unwrap_or_default();
    let distances = distances.into_iter().next().unwrap_or_default();
    let metadatas = metadatas.map(|m| m.into_iter().next().unwrap_or_default());

    let consistent = documents.len() == ids.len()
        && distances.len() == ids.len()
        && metadatas.as_ref().map_or(true, |m| m.len() == ids.len());
    if !consistent {
        return Err(Error::store_with_context(
            "Malformed query response: result columns differ in length",
            ErrorContext::new()
                .with_source("facade")
                .with_details(format!("collection: {}", collection)),
        ));
    }

    let mut metadatas = metadatas.map(|m| m.into_iter());
    Ok(ids
        .into_iter()
        .zip(documents)
        .zip(distances)
        .map(|((id, text), distance)| QueryHit {
            id,
            text,
            metadata: metadatas.as_mut().and_then(|m| m.next()).flatten(),
            distance,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetadataValue;

    fn meta(name: &str) -> Metadata {
        let mut m = Metadata::new();
        m.insert("name".into(), MetadataValue::from(name));
        m
    }

    #[test]
    fn test_flatten_without_metadata_column() {
        let response = QueryResponse {
            ids: vec![vec!["a".into(), "b".into()]],
            documents: vec![vec![Some("A".into()), Some("B".into())]],
            metadatas: None,
            distances: vec![vec![0.1, 0.2]],
        };
        let hits = flatten_first(response, "c").unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.metadata.is_none()));
        assert_eq!(hits[1].text.as_deref(), Some("B"));
        assert_eq!(hits[1].distance, 0.2);
    }

    #[test]
    fn test_flatten_with_metadata_column() {
        let response = QueryResponse {
            ids: vec![vec!["a".into(), "b".into()]],
            documents: vec![vec![Some("A".into()), None]],
            metadatas: Some(vec![vec![Some(meta("Alice")), None]]),
            distances: vec![vec![0.1, 0.2]],
        };
        let hits = flatten_first(response, "c").unwrap();
        assert_eq!(hits[0].metadata, Some(meta("Alice")));
        assert_eq!(hits[1].metadata, None);
        assert_eq!(hits[1].text, None);
    }

    #[test]
    fn test_flatten_empty_response() {
        assert!(flatten_first(QueryResponse::default(), "c")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_flatten_rejects_ragged_columns() {
        let response = QueryResponse {
            ids: vec![vec!["a".into()]],
            documents: vec![vec![]],
            metadatas: None,
            distances: vec![vec![0.1]],
        };
        assert!(matches!(
            flatten_first(response, "c"),
            Err(Error::Store { .. })
        ));
    }

    #[test]
    fn test_empty_metadata_is_dropped() {
        assert_eq!(non_empty(Some(Metadata::new())), None);
        assert_eq!(non_empty(Some(meta("Bob"))), Some(meta("Bob")));
    }
}
