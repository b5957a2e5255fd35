mod models;

use std::time::Duration;
use log::{debug, info};
use reqwest::blocking::Client;
use serde_json::Value;
use thiserror::Error;
use crate::config::{NestParameters, Units};
use crate::manager_nest::models::{LoginResponse, Status};
use crate::models::ThermostatSnapshot;

const USER_AGENT: &str = "Nest/1.1.0.10 CFNetwork/548.0.4";

/// Fields reported in Celsius by the provider
const TEMPERATURE_FIELDS: [&str; 4] = [
    "target_temperature",
    "current_temperature",
    "away_temperature_low",
    "away_temperature_high",
];

/// Struct for reading thermostat status from the Nest cloud account
pub struct Nest {
    client: Client,
    host: String,
    user: String,
    password: String,
    serial: Option<String>,
    index: usize,
    units: Units,
}

/// An authenticated session, status can only be read through one
pub struct NestSession<'a> {
    nest: &'a Nest,
    access_token: String,
    user_id: String,
    transport_url: String,
}

impl Nest {
    /// Returns a Nest struct ready for logging in
    ///
    /// # Arguments
    ///
    /// * 'config' - thermostat account configuration
    /// * 'timeout' - timeout for every request towards the provider
    pub fn new(config: &NestParameters, timeout: Duration) -> Result<Nest, NestError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Nest {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            user: config.user.clone(),
            password: config.password.clone(),
            serial: config.serial.clone(),
            index: config.index,
            units: config.units,
        })
    }

    /// Logs in to the account and returns a session for status retrieval
    ///
    pub fn login(&self) -> Result<NestSession<'_>, NestError> {
        let url = format!("{}/user/login", self.host);

        let response = self.client
            .post(url)
            .form(&[("username", self.user.as_str()), ("password", self.password.as_str())])
            .send()?;

        let status = response.status();
        let json = response.text()?;
        if !status.is_success() {
            return Err(NestError::LoginError(format!("status {}: {}", status, json)));
        }

        let login: LoginResponse = serde_json::from_str(&json)
            .map_err(|e| NestError::LoginError(format!("error parsing login response: {}", e)))?;

        info!("Logged in to thermostat account as user {}", login.userid);

        Ok(NestSession {
            nest: self,
            access_token: login.access_token,
            user_id: login.userid,
            transport_url: login.urls.transport_url.trim_end_matches('/').to_string(),
        })
    }
}

impl NestSession<'_> {
    /// Retrieves the status of the configured thermostat, or the discovered one if no serial
    /// is configured
    ///
    pub fn get_status(&self) -> Result<ThermostatSnapshot, NestError> {
        let url = format!("{}/v2/mobile/user.{}", self.transport_url, self.user_id);

        let response = self.nest.client
            .get(url)
            .header("Authorization", format!("Basic {}", self.access_token))
            .header("X-nl-user-id", &self.user_id)
            .header("X-nl-protocol-version", "1")
            .send()?;

        let status = response.status();
        let json = response.text()?;
        if !status.is_success() {
            return Err(NestError::StatusError(format!("status {}: {}", status, json)));
        }

        let status: Status = serde_json::from_str(&json)
            .map_err(|e| NestError::DocumentError(e.to_string()))?;

        let serial = resolve_serial(&status, &self.user_id, self.nest.serial.as_deref(), self.nest.index)?;
        debug!("Reading status for thermostat {}", serial);

        snapshot_from_status(status, &serial, self.nest.units)
    }
}

/// Returns the serial to read, either the given one or the one found at 'index'
///
/// Discovery looks at the devices of the user's first structure, and falls back on the
/// sorted device keys if the status carries no structure information.
///
/// # Arguments
///
/// * 'status' - status document from the provider
/// * 'user_id' - the logged in user
/// * 'serial' - serial given in configuration, if any
/// * 'index' - device index used when no serial is given
fn resolve_serial(status: &Status, user_id: &str, serial: Option<&str>, index: usize) -> Result<String, NestError> {
    if let Some(serial) = serial {
        return Ok(serial.to_string());
    }

    let from_structure = status.user
        .get(user_id)
        .and_then(|u| u.structures.first())
        .map(|s| s.trim_start_matches("structure."))
        .and_then(|s| status.structure.get(s))
        .and_then(|s| s.devices.get(index))
        .map(|d| d.trim_start_matches("device.").to_string());

    if let Some(serial) = from_structure {
        return Ok(serial);
    }

    let mut keys = status.device.keys().collect::<Vec<&String>>();
    keys.sort();
    keys.get(index)
        .map(|k| k.to_string())
        .ok_or(NestError::DeviceError(format!("no device at index {}", index)))
}

/// Merges shared and device state for the serial and applies the unit system
///
/// Temperatures are left as reported unless Fahrenheit is asked for, converted values are
/// rounded to one decimal.
///
/// # Arguments
///
/// * 'status' - status document from the provider
/// * 'serial' - serial of the thermostat
/// * 'units' - unit system for temperatures
fn snapshot_from_status(mut status: Status, serial: &str, units: Units) -> Result<ThermostatSnapshot, NestError> {
    let shared = take_object(&mut status.shared, "shared", serial)?;
    let device = take_object(&mut status.device, "device", serial)?;

    let mut snapshot = ThermostatSnapshot::new(serial, shared, device);

    if units == Units::Fahrenheit {
        for field in TEMPERATURE_FIELDS {
            if let Some(value) = snapshot.get_mut(field) {
                if let Some(c) = value.as_f64() {
                    *value = Value::from((to_fahrenheit(c) * 10.0).round() / 10.0);
                }
            }
        }
    }

    Ok(snapshot)
}

fn take_object(map: &mut serde_json::Map<String, Value>, name: &str, serial: &str) -> Result<serde_json::Map<String, Value>, NestError> {
    match map.remove(serial) {
        Some(Value::Object(o)) => Ok(o),
        Some(_) => Err(NestError::DocumentError(format!("{} state for {} is not an object", name, serial))),
        None => Err(NestError::DeviceError(format!("no {} state for {}", name, serial))),
    }
}

/// Converts a provider temperature to Fahrenheit
///
/// # Arguments
///
/// * 'celsius' - temperature in Celsius
pub fn to_fahrenheit(celsius: f64) -> f64 {
    celsius * 1.8 + 32.0
}

#[derive(Error, Debug)]
pub enum NestError {
    #[error("NetworkError: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("LoginError: {0}")]
    LoginError(String),
    #[error("StatusError: {0}")]
    StatusError(String),
    #[error("DocumentError: {0}")]
    DocumentError(String),
    #[error("DeviceError: {0}")]
    DeviceError(String),
}
