use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use weather_cache::cache::CachedWeatherClient;
use weather_cache::config::Settings;
use weather_cache::index::IndexStore;
use weather_cache::marker::MarkerWriter;
use weather_cache::weather::WeatherClient;
use weather_cache::web::{AppState, create_router};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("weather_cache=info,tower_http=info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;

    info!(esp_uri = %settings.esp_uri, "espUri");
    info!(config_file = ?settings.config_file, "configFile");
    info!(features_index = %settings.features_index, "featuresIndex");
    info!(stations_index = %settings.stations_index, "stationsIndex");
    info!(server_port = settings.server_port, "serverPort");
    info!(weather_url = %settings.weather_url, "weatherUrl");
    info!(static_dir = %settings.static_dir.display(), "staticDir");

    let weather = WeatherClient::new(settings.weather_config())?;
    let store = IndexStore::new(settings.index_config())?;

    // The engine may come up after us; requests report errors until it does
    if let Err(e) = store.info().await {
        warn!(esp_uri = %settings.esp_uri, error = %e, "index engine not reachable at startup");
    }

    let cached = CachedWeatherClient::new(weather, store, settings.index_names());
    let state = AppState::new(cached, MarkerWriter::new(&settings.static_dir));
    let app = create_router(state);

    let addr = settings.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("weather cache listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
