use std::fs::File;
use std::io::{BufRead, BufReader};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, Context};
use tracing::{info, debug};

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4000/graphql";
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Resolved runtime settings for both the server and the studio client.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub host: IpAddr,
    pub port: u16,
    pub endpoint: String,
    pub debounce: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("database.sqlite"),
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

/// Values given on the command line. Each one wins over the settings file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db_path: Option<PathBuf>,
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub endpoint: Option<String>,
    pub debounce_ms: Option<u64>,
}

/// Main entry point to get settings.
/// Reads the `.env`-style file if it exists, then applies CLI overrides.
pub fn load_settings(path: &Path, overrides: Overrides) -> Result<Settings> {
    let mut settings = Settings::default();

    if path.exists() {
        load_from_env(path, &mut settings)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        info!("Loaded settings from {}", path.display());
    } else {
        debug!("No settings file at {}, using defaults", path.display());
    }

    if let Some(db_path) = overrides.db_path {
        settings.db_path = db_path;
    }
    if let Some(host) = overrides.host {
        settings.host = host;
    }
    if let Some(port) = overrides.port {
        settings.port = port;
    }
    if let Some(endpoint) = overrides.endpoint {
        settings.endpoint = endpoint;
    }
    if let Some(ms) = overrides.debounce_ms {
        settings.debounce = Duration::from_millis(ms);
    }

    Ok(settings)
}

fn load_from_env(path: &Path, settings: &mut Settings) -> Result<()> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"');
            match key.trim() {
                "DATABASE_PATH" => settings.db_path = PathBuf::from(value),
                "HOST" => {
                    settings.host = value
                        .parse()
                        .with_context(|| format!("Invalid HOST '{value}'"))?;
                }
                "PORT" => {
                    settings.port = value
                        .parse()
                        .with_context(|| format!("Invalid PORT '{value}'"))?;
                }
                "GRAPHQL_ENDPOINT" => settings.endpoint = value.to_string(),
                "DEBOUNCE_MS" => {
                    let ms: u64 = value
                        .parse()
                        .with_context(|| format!("Invalid DEBOUNCE_MS '{value}'"))?;
                    settings.debounce = Duration::from_millis(ms);
                }
                _ => {}
            }
        }
    }

    Ok(())
}
