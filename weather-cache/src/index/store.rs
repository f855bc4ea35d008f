//! Index engine client.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::bulk::{BulkConfig, BulkIndexer, BulkStats};
use super::document::{FeatureDocument, StationDocument};
use super::error::IndexError;
use super::types::{ClusterInfo, CountResponse, SearchResponse};
use crate::weather::Feature;

/// Default engine address.
const DEFAULT_BASE_URL: &str = "http://localhost:9200";

/// The engine's default `index.max_result_window`.
const DEFAULT_MAX_HITS: usize = 10_000;

/// Configuration for the index store.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Base URL of the engine, e.g. `http://localhost:9200`
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Upper bound on documents returned by a listing
    pub max_hits: usize,
    /// Bulk session parameters
    pub bulk: BulkConfig,
}

impl IndexConfig {
    /// Create a config for the engine at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs: 30,
            max_hits: DEFAULT_MAX_HITS,
            bulk: BulkConfig::default(),
        }
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the listing bound.
    pub fn with_max_hits(mut self, max_hits: usize) -> Self {
        self.max_hits = max_hits;
        self
    }

    /// Set bulk session parameters.
    pub fn with_bulk(mut self, bulk: BulkConfig) -> Self {
        self.bulk = bulk;
        self
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Connection to the index engine.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct IndexStore {
    http: reqwest::Client,
    base_url: String,
    max_hits: usize,
    bulk: BulkConfig,
}

impl IndexStore {
    /// Create a new index store client.
    pub fn new(config: IndexConfig) -> Result<Self, IndexError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            max_hits: config.max_hits,
            bulk: config.bulk,
        })
    }

    /// Query engine identity (`GET /`).
    pub async fn info(&self) -> Result<ClusterInfo, IndexError> {
        let response = self.http.get(&self.base_url).send().await?;
        let info: ClusterInfo = decode(response).await?;
        info!(
            cluster = %info.cluster_name,
            node = %info.name,
            version = %info.version.number,
            "connected to index engine"
        );
        Ok(info)
    }

    /// Number of documents in `index`. A missing index holds 0 documents.
    pub async fn document_count(&self, index: &str) -> Result<u64, IndexError> {
        let url = format!("{}/{}/_count", self.base_url, index);
        let response = self.http.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(index, "index missing, counting as empty");
            return Ok(0);
        }

        let count: CountResponse = decode(response).await?;
        Ok(count.count)
    }

    /// Whether exactly one document in `index` has ID `id`.
    pub async fn exists(&self, index: &str, id: &str) -> Result<bool, IndexError> {
        let url = format!("{}/{}/_count", self.base_url, index);
        let query = serde_json::json!({ "query": { "ids": { "values": [id] } } });
        let response = self.http.post(&url).json(&query).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }

        let count: CountResponse = decode(response).await?;
        Ok(count.count == 1)
    }

    /// Open a bulk session against `index`.
    pub fn bulk_indexer(&self, index: &str) -> BulkIndexer {
        BulkIndexer::new(self.http.clone(), &self.base_url, index, &self.bulk)
    }

    /// Upsert every document in one bulk session.
    ///
    /// `id_of` derives each document's ID. Rejected documents are counted
    /// in the returned stats and do not stop the rest of the batch.
    pub async fn bulk_write<T, I, F>(
        &self,
        index: &str,
        documents: I,
        id_of: F,
    ) -> Result<BulkStats, IndexError>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> String,
    {
        let session = self.bulk_indexer(index);

        for document in documents {
            let id = id_of(&document);
            session.add(&id, &document).await?;
        }

        let stats = session.close().await?;

        if stats.failed > 0 {
            warn!(
                index,
                written = stats.written,
                failed = stats.failed,
                "Indexed [{}] documents with [{}] errors",
                stats.written,
                stats.failed
            );
        } else {
            info!(
                index,
                requests = stats.requests,
                "Successfully indexed [{}] documents",
                stats.written
            );
        }

        Ok(stats)
    }

    /// Every document in `index`, deserialized as `T`.
    ///
    /// Returns at most `max_hits` documents. A missing index is empty.
    pub async fn list_all<T: DeserializeOwned>(&self, index: &str) -> Result<Vec<T>, IndexError> {
        let url = format!("{}/{}/_search", self.base_url, index);
        let query = serde_json::json!({
            "size": self.max_hits,
            "track_total_hits": true,
            "query": { "match_all": {} },
        });
        let response = self.http.post(&url).json(&query).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let result: SearchResponse<T> = decode(response).await?;
        if let Some(total) = &result.hits.total
            && total.value > result.hits.hits.len() as u64
        {
            warn!(
                index,
                total = total.value,
                returned = result.hits.hits.len(),
                "listing truncated"
            );
        }

        Ok(result.hits.hits.into_iter().map(|hit| hit.source).collect())
    }

    /// Station identifier URLs held in the stations index.
    pub async fn list_stations(&self, index: &str) -> Result<Vec<String>, IndexError> {
        let docs: Vec<StationDocument> = self.list_all(index).await?;
        Ok(docs.into_iter().map(|d| d.station).collect())
    }

    /// Features held in the features index.
    pub async fn list_features(&self, index: &str) -> Result<Vec<Feature>, IndexError> {
        let docs: Vec<FeatureDocument> = self.list_all(index).await?;
        Ok(docs.into_iter().map(|d| d.feature).collect())
    }
}

/// Check the status and decode a JSON response body.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, IndexError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(IndexError::from_response(status.as_u16(), &body));
    }

    serde_json::from_str(&body).map_err(|e| IndexError::Decode {
        message: e.to_string(),
    })
}
