//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::error::AppError;
use super::state::AppState;
use crate::weather::Feature;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(heartbeat))
        .route("/stations", get(get_stations))
        .route("/loadStations", get(load_stations).post(load_stations))
        .route("/station/", get(missing_station_id))
        .route("/station/:station_id", get(get_station))
        .route("/features", get(get_features))
        .route("/loadFeatures", get(load_features).post(load_features))
        .route("/feature/", get(missing_station_id))
        .route("/feature/:station_id", get(get_station))
        .route("/writeStatic/", get(missing_static_id).post(missing_static_id))
        .route("/writeStatic/:static_id", get(write_static).post(write_static))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness check.
async fn heartbeat() -> StatusCode {
    StatusCode::OK
}

/// Check if request prefers plain text.
fn accepts_plain_text(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/plain"))
}

/// Station identifiers, from the index when cached.
async fn get_stations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let stations = state.weather.get_stations().await?;

    if accepts_plain_text(&headers) {
        let mut body = stations.data.join("\n");
        if !body.is_empty() {
            body.push('\n');
        }
        Ok(body.into_response())
    } else {
        Ok(Json(stations.data).into_response())
    }
}

/// Fetch stations live and write them to the index.
async fn load_stations(State(state): State<AppState>) -> Result<&'static str, AppError> {
    let stats = state.weather.load_stations().await?;
    info!(written = stats.written, "stations loaded");
    Ok("OK")
}

/// One station's feature, fetched live.
async fn get_station(
    State(state): State<AppState>,
    Path(station_id): Path<String>,
) -> Result<Json<Feature>, AppError> {
    let station_id = station_id.trim();
    if station_id.is_empty() {
        return Err(no_station_id());
    }

    let feature = state.weather.get_feature(station_id).await?;
    Ok(Json(feature))
}

async fn missing_station_id() -> AppError {
    no_station_id()
}

fn no_station_id() -> AppError {
    AppError::BadRequest {
        message: "No stationId given".to_string(),
    }
}

/// All features, from the index when cached.
async fn get_features(State(state): State<AppState>) -> Result<Json<Vec<Feature>>, AppError> {
    let features = state.weather.get_features().await?;
    Ok(Json(features.data))
}

/// Fetch features live and write them to the index.
async fn load_features(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let stats = state.weather.load_features().await?;
    info!(written = stats.written, "features loaded");
    Ok(StatusCode::OK)
}

/// Write a timestamped marker file.
async fn write_static(
    State(state): State<AppState>,
    Path(static_id): Path<String>,
) -> Result<&'static str, AppError> {
    state.markers.write(&static_id).await?;
    Ok("OK")
}

async fn missing_static_id() -> AppError {
    crate::marker::MarkerError::MissingId.into()
}
