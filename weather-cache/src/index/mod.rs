//! Search-engine index used as the station and feature cache.
//!
//! Talks to an Elasticsearch-compatible engine over REST: document counts,
//! existence checks by ID, bulk upserts and full listings. Documents are
//! keyed by the last path segment of their identifier URL.

mod bulk;
mod document;
mod error;
mod store;
mod types;

pub use bulk::{BulkConfig, BulkIndexer, BulkStats};
pub use document::{FeatureDocument, StationDocument, document_id};
pub use error::IndexError;
pub use store::{IndexConfig, IndexStore};
pub use types::ClusterInfo;
