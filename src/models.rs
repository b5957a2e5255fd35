use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Value written to the sheet for a reading that could not be obtained
pub const PLACEHOLDER: &str = "--";

/// One scalar in an output row
///
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Bool(bool),
    Placeholder,
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => serializer.serialize_i64(*n as i64),
            Cell::Number(n) => serializer.serialize_f64(*n),
            Cell::Bool(b) => serializer.serialize_bool(*b),
            Cell::Placeholder => serializer.serialize_str(PLACEHOLDER),
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Placeholder, Cell::Number)
    }
}

impl From<Option<i64>> for Cell {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Cell::Placeholder, |v| Cell::Number(v as f64))
    }
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        value.map_or(Cell::Placeholder, Cell::Text)
    }
}

/// One sample at one point in time, in sheet column order
///
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OutputRow {
    pub cells: Vec<Cell>,
}

/// Status of a single thermostat, shared and device state merged into one map
///
#[derive(Clone, Debug)]
pub struct ThermostatSnapshot {
    pub serial: String,
    fields: Map<String, Value>,
}

impl ThermostatSnapshot {
    /// Returns a snapshot where keys in 'device' take precedence over keys in 'shared'
    ///
    /// # Arguments
    ///
    /// * 'serial' - serial of the device the state belongs to
    /// * 'shared' - the shared state mapping for the device
    /// * 'device' - the device state mapping
    pub fn new(serial: &str, shared: Map<String, Value>, device: Map<String, Value>) -> Self {
        let mut fields = shared;
        fields.extend(device);

        Self { serial: serial.to_string(), fields }
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.fields.get_mut(field)
    }

    /// Returns a required numeric field
    ///
    /// # Arguments
    ///
    /// * 'field' - key of the field
    pub fn number(&self, field: &'static str) -> Result<f64, SnapshotError> {
        self.required(field)?
            .as_f64()
            .ok_or(SnapshotError::InvalidType { field, expected: "number" })
    }

    /// Returns a required boolean field
    ///
    /// # Arguments
    ///
    /// * 'field' - key of the field
    pub fn boolean(&self, field: &'static str) -> Result<bool, SnapshotError> {
        self.required(field)?
            .as_bool()
            .ok_or(SnapshotError::InvalidType { field, expected: "boolean" })
    }

    /// Returns a required string field
    ///
    /// # Arguments
    ///
    /// * 'field' - key of the field
    pub fn text(&self, field: &'static str) -> Result<String, SnapshotError> {
        self.required(field)?
            .as_str()
            .map(|s| s.to_string())
            .ok_or(SnapshotError::InvalidType { field, expected: "string" })
    }

    fn required(&self, field: &'static str) -> Result<&Value, SnapshotError> {
        self.fields.get(field).ok_or(SnapshotError::MissingField(field))
    }
}

/// Outside weather for a city, any reading may be absent
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeatherSnapshot {
    pub city: Option<String>,
    pub city_id: Option<i64>,
    pub temperature: Option<f64>,        // Celsius
    pub pressure: Option<f64>,           // hPa
    pub humidity: Option<f64>,           // Percent
    pub wind_speed: Option<f64>,         // mph
    pub wind_direction: Option<f64>,     // Degrees
    pub clouds: Option<f64>,             // Percent
    pub rain: Option<f64>,               // mm last 3h
    pub snow: Option<f64>,               // mm last 3h
    pub weather_type: Option<String>,
    pub weather_description: Option<String>,
}

/// Error depicting a thermostat snapshot that doesn't hold what the row layout needs
///
#[derive(Debug, Error, PartialEq)]
pub enum SnapshotError {
    #[error("required field missing: {0}")]
    MissingField(&'static str),
    #[error("field {field} is not a {expected}")]
    InvalidType { field: &'static str, expected: &'static str },
}
