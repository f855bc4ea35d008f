//! api.weather.gov client.
//!
//! Fetches the observation station list and station features. Every call
//! is a fresh request; nothing is cached at this layer and nothing is
//! retried.

mod client;
mod error;
mod types;

pub use client::{WeatherClient, WeatherConfig};
pub use error::WeatherError;
pub use types::{Elevation, Feature, Geometry, Properties, StationCollection, StationList};

#[cfg(test)]
pub(crate) use types::KSFO_JSON;
