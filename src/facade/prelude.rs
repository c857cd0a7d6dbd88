//! Convenience imports for application code.
//!
//! ```rust
//! use semantic_store::facade::prelude::*;
//! ```

pub use crate::config::{EmbedderConfig, StoreConfig};
pub use crate::facade::{CollectionHandle, SemanticStore, DEFAULT_TOP_K};
pub use crate::types::{
    metadata_from_json, validate_metadata, Metadata, MetadataValue, QueryHit, Record,
};
pub use crate::{Error, Result};
