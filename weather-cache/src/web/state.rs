//! Application state for the web layer.

use std::sync::Arc;

use crate::cache::CachedWeatherClient;
use crate::marker::MarkerWriter;

/// Shared application state.
///
/// Built once at startup; handlers only read it.
#[derive(Clone)]
pub struct AppState {
    /// Index-backed weather client
    pub weather: Arc<CachedWeatherClient>,

    /// Marker file writer for `/writeStatic`
    pub markers: Arc<MarkerWriter>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(weather: CachedWeatherClient, markers: MarkerWriter) -> Self {
        Self {
            weather: Arc::new(weather),
            markers: Arc::new(markers),
        }
    }
}
