//! Collection snapshots on disk.
//!
//! Each collection lives in `<dir>/<name>.json`. Writes go to a temp file
//! that is then renamed over the snapshot, so a crash leaves either the old
//! or the new state.

use super::DistanceMetric;
use crate::embeddings::Vector;
use crate::types::Metadata;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub(crate) const SNAPSHOT_EXTENSION: &str = "json";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoredEntry {
    pub embedding: Vector,
    pub document: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CollectionData {
    pub format_version: u32,
    pub name: String,
    pub metric: DistanceMetric,
    /// Fixed by the first upsert.
    pub dimension: Option<usize>,
    pub entries: BTreeMap<String, StoredEntry>,
}

impl CollectionData {
    pub fn new(name: impl Into<String>, metric: DistanceMetric) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            name: name.into(),
            metric,
            dimension: None,
            entries: BTreeMap::new(),
        }
    }

    /// Structural checks run after loading a snapshot.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.format_version != FORMAT_VERSION {
            return Err(format!("unsupported format version {}", self.format_version));
        }
        match self.dimension {
            None if !self.entries.is_empty() => {
                Err("entries present but no dimension recorded".to_string())
            }
            Some(dim) => match self.entries.iter().find(|(_, e)| e.embedding.len() != dim) {
                Some((id, e)) => Err(format!(
                    "entry '{}' has dimension {}, expected {}",
                    id,
                    e.embedding.len(),
                    dim
                )),
                None => Ok(()),
            },
            None => Ok(()),
        }
    }
}

pub(crate) fn snapshot_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, SNAPSHOT_EXTENSION))
}

pub(crate) async fn save_snapshot(path: &Path, data: &CollectionData) -> Result<()> {
    let bytes = serde_json::to_vec(data)?;
    let tmp_path = path.with_extension(format!("{}.tmp", SNAPSHOT_EXTENSION));
    tokio::fs::write(&tmp_path, &bytes).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    tracing::debug!(
        "Saved collection '{}' ({} records, {} bytes)",
        data.name,
        data.entries.len(),
        bytes.len()
    );
    Ok(())
}

pub(crate) async fn load_snapshot(path: &Path) -> Result<CollectionData> {
    let raw = tokio::fs::read(path).await?;
    let data: CollectionData = serde_json::from_slice(&raw)?;
    data.validate().map_err(|reason| {
        Error::store_with_context(
            format!("Snapshot validation failed: {}", reason),
            ErrorContext::new()
                .with_source("local_store")
                .with_details(path.display().to_string()),
        )
    })?;
    tracing::info!(
        "Loaded collection '{}' ({} records)",
        data.name,
        data.entries.len()
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(embedding: Vector) -> StoredEntry {
        StoredEntry {
            embedding,
            document: Some("doc".into()),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = snapshot_path(dir.path(), "notes");
        let mut data = CollectionData::new("notes", DistanceMetric::Cosine);
        data.dimension = Some(2);
        data.entries.insert("a".into(), entry(vec![0.5, 0.5]));
        save_snapshot(&path, &data).await.unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(load_snapshot(&path).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_inconsistent_dimension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = snapshot_path(dir.path(), "broken");
        let mut data = CollectionData::new("broken", DistanceMetric::L2);
        data.dimension = Some(3);
        data.entries.insert("a".into(), entry(vec![1.0]));
        save_snapshot(&path, &data).await.unwrap();
        let err = load_snapshot(&path).await.unwrap_err();
        assert!(matches!(err, Error::Store { .. }));
    }

    #[tokio::test]
    async fn test_garbage_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = snapshot_path(dir.path(), "garbage");
        tokio::fs::write(&path, b"not json").await.unwrap();
        assert!(matches!(
            load_snapshot(&path).await.unwrap_err(),
            Error::Serialization(_)
        ));
    }
}
