//! Core record types: metadata values, stored records and query hits.

pub mod metadata;
pub mod record;

pub use metadata::{metadata_from_json, validate_metadata, Metadata, MetadataValue};
pub use record::{QueryHit, Record};
