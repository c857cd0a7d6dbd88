//! Record and query result shapes returned by the façade.

use super::metadata::Metadata;
use serde::{Deserialize, Serialize};

/// A stored record as returned by `get`.
///
/// `text` is optional because `update` without text clears it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// One flattened nearest-neighbor match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    pub id: String,
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Distance reported by the collection; smaller is closer.
    pub distance: f32,
}

impl Record {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}
