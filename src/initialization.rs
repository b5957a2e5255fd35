use std::env;
use std::time::Duration;
use log::info;
use thiserror::Error;
use crate::config::{load_config, Config, LoadConfigurationError};
use crate::logging::{setup_logger, LoggerError};
use crate::manager_google_auth::GoogleAuth;
use crate::manager_nest::Nest;
use crate::manager_sheets::Sheets;
use crate::manager_weather::Weather;

pub struct Mgr {
    pub auth: GoogleAuth,
    pub nest: Nest,
    pub weather: Option<Weather>,
    pub sheets: Sheets,
}

/// Loads configuration, sets up logging and returns a Mgr struct holding the initialized managers
///
pub fn init() -> Result<Mgr, InitializationError> {
    let args: Vec<String> = env::args().collect();
    let config_path = config_path(&args)?;

    // Load configuration
    let config = load_config(config_path)?;

    // Setup logging
    let _ = setup_logger(&config.general.log_path, config.general.log_level, config.general.log_to_stdout)?;

    // Print version
    info!("starting nest logger version: {}", env!("CARGO_PKG_VERSION"));

    build_managers(&config)
}

/// Instantiates all managers from configuration
///
/// # Arguments
///
/// * 'config' - configuration to use
pub fn build_managers(config: &Config) -> Result<Mgr, InitializationError> {
    let timeout = Duration::from_secs(config.general.http_timeout_secs);

    let auth = GoogleAuth::new(&config.google, timeout)
        .map_err(|e| InitializationError::ManagerSetupError(format!("google auth: {}", e)))?;
    let nest = Nest::new(&config.nest, timeout)
        .map_err(|e| InitializationError::ManagerSetupError(format!("nest: {}", e)))?;
    let weather = match &config.weather {
        Some(w) => Some(Weather::new(w, timeout)
            .map_err(|e| InitializationError::ManagerSetupError(format!("weather: {}", e)))?),
        None => {
            info!("No weather configured, writing thermostat columns only");
            None
        }
    };
    let sheets = Sheets::new(&config.google);

    Ok(Mgr { auth, nest, weather, sheets })
}

/// Returns the path given with the --config= argument
///
/// # Arguments
///
/// * 'args' - command line arguments
fn config_path(args: &[String]) -> Result<&str, InitializationError> {
    args.iter()
        .find_map(|a| a.strip_prefix("--config="))
        .filter(|p| !p.is_empty())
        .ok_or(InitializationError::ArgumentError("usage: nest_logger --config=<path>".to_string()))
}

/// Error depicting errors that occur during startup
///
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("ArgumentError: {0}")]
    ArgumentError(String),
    #[error("ConfigurationError: {0}")]
    ConfigurationError(#[from] LoadConfigurationError),
    #[error("SetupLoggerError: {0}")]
    SetupLoggerError(#[from] LoggerError),
    #[error("ManagerSetupError: {0}")]
    ManagerSetupError(String),
}
