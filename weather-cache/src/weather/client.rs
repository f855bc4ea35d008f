//! api.weather.gov HTTP client.

use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::WeatherError;
use super::types::{Feature, StationCollection, StationList};

/// Default base URL for the weather API.
const DEFAULT_BASE_URL: &str = "https://api.weather.gov";

/// api.weather.gov rejects requests without a User-Agent.
const DEFAULT_USER_AGENT: &str = concat!("weather-cache/", env!("CARGO_PKG_VERSION"));

/// Configuration for the weather API client.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    /// Base URL for the API
    pub base_url: String,
    /// User-Agent sent with every request
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl WeatherConfig {
    /// Create a config pointing at the public API.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for the station endpoints of the weather API.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: Url,
}

impl WeatherClient {
    /// Create a new weather API client.
    pub fn new(config: WeatherConfig) -> Result<Self, WeatherError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = Url::parse(&config.base_url).map_err(|e| WeatherError::BaseUrl {
            url: config.base_url.clone(),
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(WeatherError::BaseUrl {
                url: config.base_url,
                message: "not a hierarchical URL".to_string(),
            });
        }

        Ok(Self { http, base_url })
    }

    /// Fetch the identifier URLs of every observation station.
    pub async fn fetch_station_list(&self) -> Result<StationList, WeatherError> {
        let collection: StationCollection = self.get_json(self.url(&["stations"])).await?;
        debug!(
            stations = collection.observation_stations.len(),
            "fetched station list"
        );
        Ok(StationList(collection.observation_stations))
    }

    /// Fetch one station's feature by its short code (e.g. "KSFO").
    ///
    /// A client error from upstream means the station is unknown and is
    /// reported as [`WeatherError::NotFound`].
    pub async fn fetch_feature(&self, station_id: &str) -> Result<Feature, WeatherError> {
        let not_found = || WeatherError::NotFound {
            station_id: station_id.to_string(),
        };
        if matches!(station_id, "" | "." | "..") {
            return Err(not_found());
        }

        let feature: Feature = match self.get_json(self.url(&["stations", station_id])).await {
            Err(WeatherError::Status { status, .. }) if (400..500).contains(&status) => {
                return Err(not_found());
            }
            other => other?,
        };

        if !feature.is_valid() {
            return Err(WeatherError::Invalid {
                id: feature.id,
                reason: "blank stationIdentifier",
            });
        }

        Ok(feature)
    }

    /// Fetch the full station collection as features.
    ///
    /// Features without a station identifier are dropped.
    pub async fn fetch_all_features(&self) -> Result<Vec<Feature>, WeatherError> {
        let collection: StationCollection = self.get_json(self.url(&["stations"])).await?;
        let total = collection.features.len();

        let features: Vec<Feature> = collection
            .features
            .into_iter()
            .filter(|f| {
                let valid = f.is_valid();
                if !valid {
                    warn!(id = %f.id, "dropping feature without stationIdentifier");
                }
                valid
            })
            .collect();

        debug!(total, kept = features.len(), "fetched feature collection");
        Ok(features)
    }

    /// Base URL with `segments` appended, each escaped as one path segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked hierarchical in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, WeatherError> {
        let response = self
            .http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/geo+json")
            .send()
            .await?;
        let status = response.status();
        debug!(%url, status = status.as_u16(), "weather API response");

        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::Status {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| WeatherError::Decode {
            message: e.to_string(),
        })
    }
}
