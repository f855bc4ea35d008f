//! Index engine REST DTOs.
//!
//! Only the fields this service reads are modelled. The engine speaks the
//! Elasticsearch REST dialect.

use std::collections::HashMap;

use serde::Deserialize;

/// Response from `GET /`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterInfo {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub cluster_name: String,

    #[serde(default)]
    pub version: ClusterVersion,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterVersion {
    #[serde(default)]
    pub number: String,
}

/// Response from `/{index}/_count`.
#[derive(Debug, Clone, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Response from `POST /_bulk`.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponse {
    /// One entry per action, in request order, keyed by action name.
    pub items: Vec<HashMap<String, BulkItemResult>>,
}

/// Outcome of a single bulk action.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkItemResult {
    #[serde(rename = "_id", default)]
    pub id: String,

    pub status: u16,

    pub error: Option<ErrorCause>,
}

impl BulkItemResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Response from `POST /{index}/_search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse<T> {
    pub hits: Hits<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hits<T> {
    pub total: Option<TotalHits>,
    pub hits: Vec<Hit<T>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TotalHits {
    pub value: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hit<T> {
    #[serde(rename = "_source")]
    pub source: T,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorCause,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorCause {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub reason: String,
}
