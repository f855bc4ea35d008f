//! api.weather.gov response DTOs.
//!
//! The station endpoints return GeoJSON. A single station is a `Feature`;
//! the station listing is a `FeatureCollection` that also carries the
//! flat `observationStations` list of identifier URLs.

use serde::{Deserialize, Serialize};

/// Response from `GET /stations`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationCollection {
    /// One feature per station.
    #[serde(default)]
    pub features: Vec<Feature>,

    /// Station identifier URLs, in upstream order.
    #[serde(default)]
    pub observation_stations: Vec<String>,
}

/// Ordered list of station identifier URLs.
///
/// Order is whatever upstream returned and carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationList(pub Vec<String>);

impl StationList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

/// A GeoJSON feature describing one observation station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Identifier URL, e.g. `https://api.weather.gov/stations/KSFO`.
    pub id: String,

    /// GeoJSON type, always "Feature".
    #[serde(rename = "type")]
    pub kind: String,

    pub geometry: Geometry,

    pub properties: Properties,
}

impl Feature {
    /// Parse a single feature from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// A feature is usable only if it names its station.
    pub fn is_valid(&self) -> bool {
        !self.properties.station_identifier.trim().is_empty()
    }
}

/// Point geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// GeoJSON geometry type, "Point" for stations.
    #[serde(rename = "type")]
    pub kind: String,

    /// `[longitude, latitude]`.
    pub coordinates: [f64; 2],
}

impl Geometry {
    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// Station properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    #[serde(rename = "@id", default)]
    pub id: String,

    #[serde(rename = "@type", default)]
    pub kind: String,

    #[serde(default)]
    pub elevation: Elevation,

    /// Short station code such as "KSFO".
    #[serde(default)]
    pub station_identifier: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub time_zone: String,

    /// Forecast office URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<String>,

    /// County zone URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,

    /// Fire weather zone URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fire_weather_zone: Option<String>,
}

/// Station elevation. Upstream sends `null` values for some stations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Elevation {
    pub value: Option<f64>,

    #[serde(default)]
    pub unit_code: String,
}

#[cfg(test)]
pub(crate) const KSFO_JSON: &str = r#"{
    "id": "https://api.weather.gov/stations/KSFO",
    "type": "Feature",
    "geometry": {
        "type": "Point",
        "coordinates": [-122.36558, 37.61961]
    },
    "properties": {
        "@id": "https://api.weather.gov/stations/KSFO",
        "@type": "wx:ObservationStation",
        "elevation": {
            "value": 3.048,
            "unitCode": "unit:m"
        },
        "stationIdentifier": "KSFO",
        "name": "San Francisco, San Francisco International Airport",
        "timeZone": "America/Los_Angeles"
    }
}"#;
