//! Index-backed cache in front of the weather API.
//!
//! Each entity type (stations, features) is either uncached (its index
//! holds no documents) or cached. Reads of an uncached type go straight to
//! the weather API and are not persisted. Only the explicit load
//! operations write to the index; nothing expires or refreshes on its own.

use tracing::{debug, info, warn};

use crate::index::{BulkStats, FeatureDocument, IndexError, IndexStore, StationDocument};
use crate::weather::{Feature, WeatherClient, WeatherError};

/// Errors from the cache layer.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Index names for each entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexNames {
    pub stations: String,
    pub features: String,
}

impl Default for IndexNames {
    fn default() -> Self {
        Self {
            stations: "stations".to_string(),
            features: "features".to_string(),
        }
    }
}

/// Whether an entity type is currently served from the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Uncached,
    Cached,
}

impl CacheState {
    fn from_count(count: u64) -> Self {
        if count == 0 {
            CacheState::Uncached
        } else {
            CacheState::Cached
        }
    }
}

/// Where a read was answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Live,
    Index,
}

/// A read result together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Sourced<T> {
    pub data: T,
    pub source: Source,
}

/// Weather client with an index-backed cache.
///
/// Wraps a `WeatherClient` and an `IndexStore`.
#[derive(Debug, Clone)]
pub struct CachedWeatherClient {
    weather: WeatherClient,
    store: IndexStore,
    indices: IndexNames,
}

impl CachedWeatherClient {
    /// Create a new cached client.
    pub fn new(weather: WeatherClient, store: IndexStore, indices: IndexNames) -> Self {
        Self {
            weather,
            store,
            indices,
        }
    }

    /// Cache state of the stations index.
    pub async fn stations_state(&self) -> Result<CacheState, IndexError> {
        let count = self.store.document_count(&self.indices.stations).await?;
        Ok(CacheState::from_count(count))
    }

    /// Cache state of the features index.
    pub async fn features_state(&self) -> Result<CacheState, IndexError> {
        let count = self.store.document_count(&self.indices.features).await?;
        Ok(CacheState::from_count(count))
    }

    /// Station identifier URLs, from the index if cached, else live.
    pub async fn get_stations(&self) -> Result<Sourced<Vec<String>>, SyncError> {
        match self.stations_state().await? {
            CacheState::Uncached => {
                debug!("stations uncached, fetching live");
                let stations = self.weather.fetch_station_list().await?;
                Ok(Sourced {
                    data: stations.into_inner(),
                    source: Source::Live,
                })
            }
            CacheState::Cached => {
                let stations = self.store.list_stations(&self.indices.stations).await?;
                Ok(Sourced {
                    data: stations,
                    source: Source::Index,
                })
            }
        }
    }

    /// Fetch the station list live and upsert it into the stations index.
    pub async fn load_stations(&self) -> Result<BulkStats, SyncError> {
        let stations = self.weather.fetch_station_list().await?;
        if stations.is_empty() {
            warn!(index = %self.indices.stations, "upstream listed no stations");
        }
        info!(
            index = %self.indices.stations,
            stations = stations.len(),
            "loading stations"
        );

        let documents = stations.into_inner().into_iter().map(StationDocument::new);
        let stats = self
            .store
            .bulk_write(&self.indices.stations, documents, |d| d.id().to_string())
            .await?;

        Ok(stats.ensure_complete(&self.indices.stations)?)
    }

    /// One station's feature. Always live.
    pub async fn get_feature(&self, station_id: &str) -> Result<Feature, SyncError> {
        Ok(self.weather.fetch_feature(station_id).await?)
    }

    /// All features, from the index if cached, else live.
    pub async fn get_features(&self) -> Result<Sourced<Vec<Feature>>, SyncError> {
        match self.features_state().await? {
            CacheState::Uncached => {
                debug!("features uncached, fetching live");
                let features = self.weather.fetch_all_features().await?;
                Ok(Sourced {
                    data: features,
                    source: Source::Live,
                })
            }
            CacheState::Cached => {
                let features = self.store.list_features(&self.indices.features).await?;
                Ok(Sourced {
                    data: features,
                    source: Source::Index,
                })
            }
        }
    }

    /// Fetch all features live and upsert them into the features index.
    pub async fn load_features(&self) -> Result<BulkStats, SyncError> {
        let features = self.weather.fetch_all_features().await?;
        info!(
            index = %self.indices.features,
            features = features.len(),
            "loading features"
        );

        let documents = features.into_iter().map(FeatureDocument::new);
        let stats = self
            .store
            .bulk_write(&self.indices.features, documents, |d| d.id().to_string())
            .await?;

        Ok(stats.ensure_complete(&self.indices.features)?)
    }

    /// Whether the stations index holds `station_id`.
    pub async fn contains_station(&self, station_id: &str) -> Result<bool, IndexError> {
        self.store.exists(&self.indices.stations, station_id).await
    }

    /// Whether the features index holds `station_id`.
    pub async fn contains_feature(&self, station_id: &str) -> Result<bool, IndexError> {
        self.store.exists(&self.indices.features, station_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::index::IndexConfig;
    use crate::mock::{FakeIndexEngine, FakeWeatherApi, feature};
    use crate::weather::WeatherConfig;

    async fn setup(codes: &[&str]) -> (CachedWeatherClient, FakeWeatherApi, FakeIndexEngine) {
        let api = FakeWeatherApi::start(codes.iter().map(|c| feature(c)).collect()).await;
        let engine = FakeIndexEngine::start().await;

        let weather = WeatherClient::new(WeatherConfig::new().with_base_url(api.base_url())).unwrap();
        let store = IndexStore::new(IndexConfig::new(engine.base_url())).unwrap();
        let client = CachedWeatherClient::new(weather, store, IndexNames::default());

        (client, api, engine)
    }

    #[tokio::test]
    async fn uncached_stations_come_live_and_are_not_persisted() {
        let (client, _api, engine) = setup(&["KSFO", "KBOS"]).await;

        assert_eq!(client.stations_state().await.unwrap(), CacheState::Uncached);

        let stations = client.get_stations().await.unwrap();
        assert_eq!(stations.source, Source::Live);
        assert_eq!(stations.data.len(), 2);

        assert!(engine.ids("stations").is_empty());
        assert_eq!(client.stations_state().await.unwrap(), CacheState::Uncached);
    }

    #[tokio::test]
    async fn load_then_get_serves_from_index() {
        let (client, api, _engine) = setup(&["KSFO", "KBOS", "KCRG"]).await;

        let stats = client.load_stations().await.unwrap();
        assert_eq!(stats.written, 3);
        assert_eq!(client.stations_state().await.unwrap(), CacheState::Cached);

        let before = api.requests();
        let stations = client.get_stations().await.unwrap();
        assert_eq!(stations.source, Source::Index);
        assert_eq!(api.requests(), before);

        let unique: HashSet<_> = stations.data.iter().collect();
        assert_eq!(stations.data.len(), 3);
        assert_eq!(unique.len(), 3);
        assert!(client.contains_station("KCRG").await.unwrap());
        assert!(!client.contains_station("edwinfailed").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_upstream_ids_are_cached_once() {
        let (client, _api, engine) = setup(&["KSFO", "KBOS", "KSFO"]).await;

        let stats = client.load_stations().await.unwrap();
        assert_eq!(stats.added, 3);
        assert_eq!(stats.failed, 0);
        assert_eq!(engine.ids("stations"), vec!["KBOS", "KSFO"]);

        let stations = client.get_stations().await.unwrap();
        assert_eq!(stations.source, Source::Index);
        assert_eq!(stations.data.len(), 2);
        let ksfo = stations
            .data
            .iter()
            .filter(|s| s.as_str() == "https://api.weather.gov/stations/KSFO")
            .count();
        assert_eq!(ksfo, 1);
    }

    #[tokio::test]
    async fn load_always_fetches_live() {
        let (client, api, _engine) = setup(&["KSFO"]).await;

        client.load_stations().await.unwrap();
        let before = api.requests();
        client.load_stations().await.unwrap();
        assert_eq!(api.requests(), before + 1);
    }

    #[tokio::test]
    async fn load_stations_upstream_failure() {
        let (client, api, engine) = setup(&["KSFO"]).await;
        api.fail_with(500);

        let err = client.load_stations().await.unwrap_err();
        assert!(matches!(err, SyncError::Weather(WeatherError::Status { .. })));
        assert!(engine.ids("stations").is_empty());
    }

    #[tokio::test]
    async fn load_reports_partial_failure_but_writes_the_rest() {
        let (client, _api, engine) = setup(&["KSFO", "KBOS", "KJFK"]).await;
        engine.reject_id("KBOS");

        let err = client.load_stations().await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Index(IndexError::PartialBulkFailure {
                written: 2,
                failed: 1,
                ..
            })
        ));
        assert_eq!(engine.ids("stations"), vec!["KJFK", "KSFO"]);
    }

    #[tokio::test]
    async fn index_failure_on_get_is_index_error() {
        let (client, _api, engine) = setup(&["KSFO"]).await;
        engine.set_unavailable(true);

        let err = client.get_stations().await.unwrap_err();
        assert!(matches!(err, SyncError::Index(_)));
    }

    #[tokio::test]
    async fn features_follow_the_same_state_machine() {
        let (client, _api, engine) = setup(&["KSFO", "KBOS"]).await;

        let live = client.get_features().await.unwrap();
        assert_eq!(live.source, Source::Live);
        assert_eq!(live.data.len(), 2);

        let stats = client.load_features().await.unwrap();
        assert_eq!(stats.written, 2);
        assert_eq!(engine.ids("features"), vec!["KBOS", "KSFO"]);
        assert!(client.contains_feature("KSFO").await.unwrap());

        let cached = client.get_features().await.unwrap();
        assert_eq!(cached.source, Source::Index);
        let mut codes: Vec<_> = cached
            .data
            .iter()
            .map(|f| f.properties.station_identifier.clone())
            .collect();
        codes.sort();
        assert_eq!(codes, vec!["KBOS", "KSFO"]);
    }

    #[tokio::test]
    async fn get_feature_is_live_even_when_cached() {
        let (client, api, _engine) = setup(&["KSFO"]).await;
        client.load_features().await.unwrap();

        let before = api.requests();
        let feature = client.get_feature("KSFO").await.unwrap();
        assert_eq!(feature.properties.station_identifier, "KSFO");
        assert_eq!(api.requests(), before + 1);
    }
}
