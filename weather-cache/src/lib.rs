//! Weather station cache server.
//!
//! Fetches observation stations from api.weather.gov, optionally caches
//! them in a search-engine index, and republishes both over a small REST
//! interface.

pub mod cache;
pub mod config;
pub mod index;
pub mod marker;
pub mod weather;
pub mod web;

#[cfg(test)]
mod mock;
