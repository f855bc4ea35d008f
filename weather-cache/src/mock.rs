//! In-process fake upstreams for tests.
//!
//! `FakeWeatherApi` serves the station endpoints of the weather API and
//! `FakeIndexEngine` serves the subset of the engine REST API the index
//! store uses. Both are axum apps bound to an ephemeral local port.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::weather::{Elevation, Feature, Geometry, Properties};

/// Build a plausible station feature for `code`.
pub fn feature(code: &str) -> Feature {
    let id = format!("https://api.weather.gov/stations/{code}");
    Feature {
        id: id.clone(),
        kind: "Feature".to_string(),
        geometry: Geometry {
            kind: "Point".to_string(),
            coordinates: [-122.36558, 37.61961],
        },
        properties: Properties {
            id,
            kind: "wx:ObservationStation".to_string(),
            elevation: Elevation {
                value: Some(3.048),
                unit_code: "wmoUnit:m".to_string(),
            },
            station_identifier: code.to_string(),
            name: format!("{code} Test Station"),
            time_zone: "America/Los_Angeles".to_string(),
            forecast: Some("https://api.weather.gov/zones/forecast/CAZ508".to_string()),
            county: None,
            fire_weather_zone: None,
        },
    }
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

// Weather API

#[derive(Default)]
struct WeatherState {
    features: Vec<Feature>,
    fail_status: Option<u16>,
    body: Option<String>,
    requests: usize,
}

type SharedWeather = Arc<Mutex<WeatherState>>;

/// Fake api.weather.gov.
#[derive(Clone)]
pub struct FakeWeatherApi {
    state: SharedWeather,
    base_url: String,
}

impl FakeWeatherApi {
    pub async fn start(features: Vec<Feature>) -> Self {
        let state = Arc::new(Mutex::new(WeatherState {
            features,
            ..Default::default()
        }));

        let router = Router::new()
            .route("/stations", get(weather_stations))
            .route("/stations/:station_id", get(weather_station))
            .with_state(Arc::clone(&state));

        Self {
            state,
            base_url: serve(router).await,
        }
    }

    pub fn base_url(&self) -> String {
        self.base_url.clone()
    }

    /// Answer every request with `status`.
    pub fn fail_with(&self, status: u16) {
        self.state.lock().unwrap().fail_status = Some(status);
    }

    /// Answer every request with 200 and this raw body.
    pub fn respond_with_body(&self, body: &str) {
        self.state.lock().unwrap().body = Some(body.to_string());
    }

    /// Requests served so far.
    pub fn requests(&self) -> usize {
        self.state.lock().unwrap().requests
    }
}

fn canned(state: &mut WeatherState) -> Option<Response> {
    state.requests += 1;
    if let Some(status) = state.fail_status {
        let status = StatusCode::from_u16(status).unwrap();
        return Some((status, "upstream failure").into_response());
    }
    state.body.clone().map(IntoResponse::into_response)
}

async fn weather_stations(State(state): State<SharedWeather>) -> Response {
    let mut state = state.lock().unwrap();
    if let Some(response) = canned(&mut state) {
        return response;
    }

    let ids: Vec<&str> = state.features.iter().map(|f| f.id.as_str()).collect();
    Json(json!({
        "type": "FeatureCollection",
        "features": state.features,
        "observationStations": ids,
    }))
    .into_response()
}

async fn weather_station(
    State(state): State<SharedWeather>,
    Path(station_id): Path<String>,
) -> Response {
    let mut state = state.lock().unwrap();
    if let Some(response) = canned(&mut state) {
        return response;
    }

    match state
        .features
        .iter()
        .find(|f| f.properties.station_identifier == station_id)
    {
        Some(feature) => Json(feature.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "title": "Not Found",
                "status": 404,
                "detail": format!("Station {station_id} not found"),
            })),
        )
            .into_response(),
    }
}

// Index engine

#[derive(Default)]
struct EngineState {
    indices: HashMap<String, BTreeMap<String, Value>>,
    rejected: HashSet<String>,
    unavailable: bool,
    bulk_delay: Option<Duration>,
    bulk_requests: usize,
}

type SharedEngine = Arc<Mutex<EngineState>>;

/// Fake Elasticsearch-compatible engine.
#[derive(Clone)]
pub struct FakeIndexEngine {
    state: SharedEngine,
    base_url: String,
}

impl FakeIndexEngine {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(EngineState::default()));

        let router = Router::new()
            .route("/", get(engine_info))
            .route("/_bulk", post(engine_bulk))
            .route("/:index/_count", get(engine_count).post(engine_count))
            .route("/:index/_search", post(engine_search))
            .with_state(Arc::clone(&state));

        Self {
            state,
            base_url: serve(router).await,
        }
    }

    pub fn base_url(&self) -> String {
        self.base_url.clone()
    }

    /// Reject any bulk action for this document ID.
    pub fn reject_id(&self, id: &str) {
        self.state.lock().unwrap().rejected.insert(id.to_string());
    }

    /// Answer every request with 503.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    /// Hold every `_bulk` request this long before answering.
    pub fn stall_bulk(&self, delay: Duration) {
        self.state.lock().unwrap().bulk_delay = Some(delay);
    }

    /// `_bulk` requests received so far.
    pub fn bulk_requests(&self) -> usize {
        self.state.lock().unwrap().bulk_requests
    }

    /// Sorted document IDs in `index`.
    pub fn ids(&self, index: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .indices
            .get(index)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }
}

fn unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "error": {"type": "cluster_block_exception", "reason": "blocked"},
            "status": 503,
        })),
    )
        .into_response()
}

fn index_missing(index: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "type": "index_not_found_exception",
                "reason": format!("no such index [{index}]"),
            },
            "status": 404,
        })),
    )
        .into_response()
}

async fn engine_info(State(state): State<SharedEngine>) -> Response {
    if state.lock().unwrap().unavailable {
        return unavailable();
    }
    Json(json!({
        "name": "fake-node",
        "cluster_name": "fake-cluster",
        "version": {"number": "8.13.0"},
    }))
    .into_response()
}

async fn engine_count(
    State(state): State<SharedEngine>,
    Path(index): Path<String>,
    body: Bytes,
) -> Response {
    let state = state.lock().unwrap();
    if state.unavailable {
        return unavailable();
    }
    let Some(docs) = state.indices.get(&index) else {
        return index_missing(&index);
    };

    let query: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let count = match query["query"]["ids"]["values"].as_array() {
        Some(ids) => ids
            .iter()
            .filter_map(Value::as_str)
            .filter(|id| docs.contains_key(*id))
            .count(),
        None => docs.len(),
    };

    Json(json!({
        "count": count,
        "_shards": {"total": 1, "successful": 1, "skipped": 0, "failed": 0},
    }))
    .into_response()
}

async fn engine_search(
    State(state): State<SharedEngine>,
    Path(index): Path<String>,
    body: Bytes,
) -> Response {
    let state = state.lock().unwrap();
    if state.unavailable {
        return unavailable();
    }
    let Some(docs) = state.indices.get(&index) else {
        return index_missing(&index);
    };

    let query: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let size = query["size"].as_u64().unwrap_or(10) as usize;
    let hits: Vec<Value> = docs
        .iter()
        .take(size)
        .map(|(id, source)| json!({"_index": index, "_id": id, "_source": source}))
        .collect();

    Json(json!({
        "took": 1,
        "hits": {
            "total": {"value": docs.len(), "relation": "eq"},
            "hits": hits,
        },
    }))
    .into_response()
}

async fn engine_bulk(State(state): State<SharedEngine>, body: String) -> Response {
    let delay = state.lock().unwrap().bulk_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut state = state.lock().unwrap();
    if state.unavailable {
        return unavailable();
    }
    state.bulk_requests += 1;

    let lines: Vec<&str> = body.lines().filter(|l| !l.trim().is_empty()).collect();
    let mut items = Vec::new();
    let mut errors = false;

    for pair in lines.chunks(2) {
        let action: Value = serde_json::from_str(pair[0]).unwrap();
        let meta = &action["index"];
        let index = meta["_index"].as_str().unwrap().to_string();
        let id = meta["_id"].as_str().unwrap().to_string();
        let source: Value = serde_json::from_str(pair[1]).unwrap();

        if state.rejected.contains(&id) {
            errors = true;
            items.push(json!({"index": {
                "_index": index,
                "_id": id,
                "status": 400,
                "error": {"type": "mapper_parsing_exception", "reason": "failed to parse"},
            }}));
            continue;
        }

        let docs = state.indices.entry(index.clone()).or_default();
        let status = if docs.insert(id.clone(), source).is_some() {
            200
        } else {
            201
        };
        items.push(json!({"index": {"_index": index, "_id": id, "status": status}}));
    }

    Json(json!({"took": 1, "errors": errors, "items": items})).into_response()
}
