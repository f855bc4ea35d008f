//! Weather API error types.

/// Errors that can occur when talking to the weather API.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    /// Request never produced a response (connect failure, timeout, etc.)
    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    /// API answered with something other than 200
    #[error("status code returned: {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("JSON parse error: {message}")]
    Decode { message: String },

    /// Upstream does not know this station
    #[error("no station {station_id} found")]
    NotFound { station_id: String },

    /// Configured base URL cannot have paths appended
    #[error("invalid weather API URL {url}: {message}")]
    BaseUrl { url: String, message: String },

    /// Decoded feature breaks an invariant (e.g. blank station identifier)
    #[error("invalid feature {id}: {reason}")]
    Invalid { id: String, reason: &'static str },
}
