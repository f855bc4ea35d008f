//! Persisted document shapes and document-ID derivation.

use serde::{Deserialize, Serialize};

use crate::weather::Feature;

/// Derive a document ID from an identifier URL.
///
/// The ID is the text after the last `/`, so
/// `https://api.weather.gov/stations/KSFO` becomes `KSFO`. An identifier
/// without any `/` is its own ID.
pub fn document_id(identifier: &str) -> &str {
    identifier
        .rsplit_once('/')
        .map_or(identifier, |(_, tail)| tail)
}

/// A station as stored in the stations index: `{"station": "<url>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationDocument {
    pub station: String,
}

impl StationDocument {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            station: identifier.into(),
        }
    }

    pub fn id(&self) -> &str {
        document_id(&self.station)
    }
}

/// A feature as stored in the features index: `{"feature": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDocument {
    pub feature: Feature,
}

impl FeatureDocument {
    pub fn new(feature: Feature) -> Self {
        Self { feature }
    }

    pub fn id(&self) -> &str {
        document_id(&self.feature.id)
    }
}
