//! Startup configuration.
//!
//! Settings come from command-line flags, optionally overridden by a JSON
//! file named with `--configFile`:
//!
//! ```json
//! {
//!     "espUri": "localhost:9200",
//!     "stationsIndex": "stations",
//!     "serverPort": 80,
//!     "featuresIndex": "features"
//! }
//! ```
//!
//! Every key present in the file wins over the corresponding flag.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use crate::cache::IndexNames;
use crate::index::{BulkConfig, IndexConfig};
use crate::weather::WeatherConfig;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to parse configuration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Command-line flags.
#[derive(Debug, Clone, Parser)]
#[command(name = "weather-cache", version, about = "Caches api.weather.gov stations in a search index")]
pub struct Args {
    /// The index engine host and port number
    #[arg(long = "espUri", default_value = "localhost:9200")]
    pub esp_uri: String,

    /// The HTTP server port
    #[arg(long = "serverPort", default_value_t = 8080)]
    pub server_port: u16,

    /// The configuration file
    #[arg(long = "configFile")]
    pub config_file: Option<PathBuf>,

    /// Index holding station identifiers
    #[arg(long = "stationsIndex", default_value = "stations")]
    pub stations_index: String,

    /// Index holding station features
    #[arg(long = "featuresIndex", default_value = "features")]
    pub features_index: String,

    /// Weather API base URL
    #[arg(long = "weatherUrl", default_value = "https://api.weather.gov")]
    pub weather_url: String,

    /// Directory for marker files written by /writeStatic
    #[arg(long = "staticDir", default_value = "/perm-data")]
    pub static_dir: PathBuf,

    /// Timeout for each weather API and index request
    #[arg(long = "upstreamTimeoutSecs", default_value_t = 30)]
    pub upstream_timeout_secs: u64,

    /// Deadline for a whole bulk load
    #[arg(long = "bulkTimeoutSecs", default_value_t = 120)]
    pub bulk_timeout_secs: u64,
}

/// JSON configuration file. Absent keys leave the flag value in place.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileConfig {
    esp_uri: Option<String>,
    server_port: Option<u16>,
    stations_index: Option<String>,
    features_index: Option<String>,
    weather_url: Option<String>,
    static_dir: Option<PathBuf>,
}

/// Effective settings, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Index engine base URL, always with a scheme.
    pub esp_uri: String,
    pub server_port: u16,
    pub stations_index: String,
    pub features_index: String,
    pub weather_url: String,
    pub static_dir: PathBuf,
    pub upstream_timeout_secs: u64,
    pub bulk_timeout_secs: u64,
    pub config_file: Option<PathBuf>,
}

impl Settings {
    /// Parse the process arguments and load settings from them.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(Args::parse())
    }

    /// Build settings from parsed flags, applying the config file if named.
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let mut settings = Settings {
            esp_uri: args.esp_uri,
            server_port: args.server_port,
            stations_index: args.stations_index,
            features_index: args.features_index,
            weather_url: args.weather_url,
            static_dir: args.static_dir,
            upstream_timeout_secs: args.upstream_timeout_secs,
            bulk_timeout_secs: args.bulk_timeout_secs,
            config_file: args.config_file,
        };

        if let Some(path) = settings.config_file.clone() {
            settings.apply(read_config_file(&path)?);
        }

        settings.esp_uri = normalize_uri(&settings.esp_uri);
        settings.validate()?;
        Ok(settings)
    }

    fn apply(&mut self, file: FileConfig) {
        if let Some(v) = file.esp_uri {
            self.esp_uri = v;
        }
        if let Some(v) = file.server_port {
            self.server_port = v;
        }
        if let Some(v) = file.stations_index {
            self.stations_index = v;
        }
        if let Some(v) = file.features_index {
            self.features_index = v;
        }
        if let Some(v) = file.weather_url {
            self.weather_url = v;
        }
        if let Some(v) = file.static_dir {
            self.static_dir = v;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_index_name("stationsIndex", &self.stations_index)?;
        validate_index_name("featuresIndex", &self.features_index)?;

        if self.server_port == 0 {
            return Err(ConfigError::Invalid {
                field: "serverPort",
                message: "must be non-zero".to_string(),
            });
        }
        if self.upstream_timeout_secs == 0 || self.bulk_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout",
                message: "timeouts must be at least one second".to_string(),
            });
        }
        Ok(())
    }

    pub fn index_names(&self) -> IndexNames {
        IndexNames {
            stations: self.stations_index.clone(),
            features: self.features_index.clone(),
        }
    }

    pub fn weather_config(&self) -> WeatherConfig {
        WeatherConfig::new()
            .with_base_url(&self.weather_url)
            .with_timeout(self.upstream_timeout_secs)
    }

    pub fn index_config(&self) -> IndexConfig {
        let bulk = BulkConfig::default()
            .with_session_timeout(Duration::from_secs(self.bulk_timeout_secs));
        IndexConfig::new(&self.esp_uri)
            .with_timeout(self.upstream_timeout_secs)
            .with_bulk(bulk)
    }

    /// Listen on every interface at `server_port`.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.server_port))
    }
}

fn read_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Prefix `http://` onto a bare `host:port`.
fn normalize_uri(uri: &str) -> String {
    let uri = uri.trim().trim_end_matches('/');
    if uri.contains("://") {
        uri.to_string()
    } else {
        format!("http://{uri}")
    }
}

/// Index names are lowercase and must not contain path or wildcard characters.
fn validate_index_name(field: &'static str, name: &str) -> Result<(), ConfigError> {
    let invalid = |message: &str| ConfigError::Invalid {
        field,
        message: format!("{name:?} {message}"),
    };

    if name.is_empty() {
        return Err(invalid("is empty"));
    }
    if name.chars().any(|c| c.is_uppercase()) {
        return Err(invalid("must be lowercase"));
    }
    if name.starts_with(['_', '-', '+']) {
        return Err(invalid("must not start with '_', '-' or '+'"));
    }
    if name
        .chars()
        .any(|c| matches!(c, '/' | '\\' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' | ',' | '#'))
    {
        return Err(invalid("contains a forbidden character"));
    }
    Ok(())
}
