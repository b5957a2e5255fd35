use std::fs;
use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;

/// Unit system for thermostat temperatures, the provider reports Celsius
#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum Units {
    #[serde(rename = "F")]
    Fahrenheit,
    #[serde(rename = "C")]
    Celsius,
}

#[derive(Deserialize)]
pub struct NestParameters {
    pub user: String,
    pub password: String,
    pub serial: Option<String>,
    #[serde(default)]
    pub index: usize,
    #[serde(default = "default_units")]
    pub units: Units,
    #[serde(default = "default_nest_host")]
    pub host: String,
}

#[derive(Deserialize)]
pub struct WeatherParameters {
    pub api_key: String,
    pub city_id: String,
    #[serde(default = "default_weather_host")]
    pub host: String,
}

#[derive(Deserialize)]
pub struct GoogleParameters {
    pub client_secret_path: String,
    pub credential_store_path: String,
    pub spreadsheet_id: String,
    #[serde(default = "default_range")]
    pub range: String,
    #[serde(default = "default_sheets_host")]
    pub sheets_host: String,
    /// Loopback port for the consent redirect, 0 picks a free port
    #[serde(default)]
    pub redirect_port: u16,
}

#[derive(Deserialize)]
pub struct General {
    pub log_path: String,
    pub log_level: LevelFilter,
    pub log_to_stdout: bool,
    #[serde(default = "default_timeout")]
    pub http_timeout_secs: u64,
}

#[derive(Deserialize)]
pub struct Config {
    pub general: General,
    pub nest: NestParameters,
    pub weather: Option<WeatherParameters>,
    pub google: GoogleParameters,
}

fn default_units() -> Units { Units::Celsius }
fn default_nest_host() -> String { "https://home.nest.com".to_string() }
fn default_weather_host() -> String { "http://api.openweathermap.org".to_string() }
fn default_range() -> String { "Sheet1".to_string() }
fn default_sheets_host() -> String { "https://sheets.googleapis.com".to_string() }
fn default_timeout() -> u64 { 30 }

/// Loads the configuration file and returns a struct with all configuration items
///
/// # Arguments
///
/// * 'config_path' - path to the configuration file
pub fn load_config(config_path: &str) -> Result<Config, LoadConfigurationError> {
    let toml = fs::read_to_string(config_path)
        .map_err(|e| LoadConfigurationError::ReadError(format!("{}: {}", config_path, e)))?;

    parse_config(&toml)
}

/// Parses configuration from a TOML document
///
/// # Arguments
///
/// * 'toml' - the configuration document
pub fn parse_config(toml: &str) -> Result<Config, LoadConfigurationError> {
    let config: Config = toml::from_str(toml)?;

    if config.google.spreadsheet_id.is_empty() {
        return Err(LoadConfigurationError::InvalidValue("google.spreadsheet_id is empty".to_string()));
    }
    if config.general.http_timeout_secs == 0 {
        return Err(LoadConfigurationError::InvalidValue("general.http_timeout_secs must be positive".to_string()));
    }

    Ok(config)
}

/// Error depicting errors that occur while loading the configuration
///
#[derive(Debug, Error)]
pub enum LoadConfigurationError {
    #[error("ReadError: {0}")]
    ReadError(String),
    #[error("ParseError: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("InvalidValue: {0}")]
    InvalidValue(String),
}
