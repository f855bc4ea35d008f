//! Mapping from lower-layer errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::cache::SyncError;
use crate::index::IndexError;
use crate::marker::MarkerError;
use crate::weather::WeatherError;

/// Application error type.
///
/// The only place errors become status codes. Bodies are plain text.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Internal { message: String },
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::NotFound { station_id } => AppError::NotFound {
                message: format!("No stationId {station_id} found"),
            },
            _ => AppError::BadRequest {
                message: e.to_string(),
            },
        }
    }
}

impl From<IndexError> for AppError {
    fn from(e: IndexError) -> Self {
        AppError::Internal {
            message: e.to_string(),
        }
    }
}

impl From<SyncError> for AppError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Weather(e) => e.into(),
            SyncError::Index(e) => e.into(),
        }
    }
}

impl From<MarkerError> for AppError {
    fn from(e: MarkerError) -> Self {
        match e {
            MarkerError::Write { .. } => AppError::NotFound {
                message: e.to_string(),
            },
            _ => AppError::BadRequest {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, "{message}");
        } else {
            warn!(%status, "{message}");
        }

        (status, message).into_response()
    }
}
