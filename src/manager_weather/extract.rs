use std::fmt;
use serde_json::Value;
use crate::manager_weather::{to_celsius, to_mph};
use crate::models::WeatherSnapshot;

/// A weather reading that could not be extracted from the response
///
#[derive(Clone, Debug, PartialEq)]
pub struct PartialDataWarning {
    pub field: &'static str,
    pub reason: String,
}

impl fmt::Display for PartialDataWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "No {} data: {}", self.field, self.reason)
    }
}

/// Extracts every reading independently, a missing reading never stops the others
///
/// # Arguments
///
/// * 'doc' - the parsed weather response
pub fn weather_from_json(doc: &Value) -> (WeatherSnapshot, Vec<PartialDataWarning>) {
    let mut c = Collector::default();

    let city = c.keep(text(doc, "city name", &["name"]));
    let city_id = c.keep(integer(doc, "city id", &["id"]));
    let temperature = c.keep(number(doc, "temperature", &["main", "temp"]).map(to_celsius));
    let pressure = c.keep(number(doc, "pressure", &["main", "pressure"]));
    let humidity = c.keep(number(doc, "humidity", &["main", "humidity"]));
    let wind_speed = c.keep(number(doc, "wind speed", &["wind", "speed"]).map(to_mph));
    let wind_direction = c.keep(number(doc, "wind direction", &["wind", "deg"]));
    let clouds = c.keep(number(doc, "clouds", &["clouds", "all"]));
    let rain = c.keep(number(doc, "rain", &["rain", "3h"]));
    let snow = c.keep(number(doc, "snow", &["snow", "3h"]));
    let weather_type = c.keep(text(doc, "weather type", &["weather", "0", "main"]));
    let weather_description = c.keep(text(doc, "weather description", &["weather", "0", "description"]));

    let snapshot = WeatherSnapshot {
        city,
        city_id,
        temperature,
        pressure,
        humidity,
        wind_speed,
        wind_direction,
        clouds,
        rain,
        snow,
        weather_type,
        weather_description,
    };

    (snapshot, c.warnings)
}

#[derive(Default)]
struct Collector {
    warnings: Vec<PartialDataWarning>,
}

impl Collector {
    fn keep<T>(&mut self, result: Result<T, PartialDataWarning>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(w) => {
                self.warnings.push(w);
                None
            }
        }
    }
}

/// Walks 'path' through objects and arrays, numeric segments index arrays
///
/// # Arguments
///
/// * 'doc' - the document to walk
/// * 'field' - name of the reading, used in the warning
/// * 'path' - keys from the document root down to the reading
fn lookup<'a>(doc: &'a Value, field: &'static str, path: &[&str]) -> Result<&'a Value, PartialDataWarning> {
    let mut current = doc;
    for (depth, segment) in path.iter().enumerate() {
        let next = match (current, segment.parse::<usize>()) {
            (Value::Array(a), Ok(i)) => a.get(i),
            (Value::Object(o), _) => o.get(*segment),
            _ => None,
        };

        current = next.ok_or_else(|| PartialDataWarning {
            field,
            reason: format!("'{}' not found", path[..=depth].join(".")),
        })?;
    }

    Ok(current)
}

fn number(doc: &Value, field: &'static str, path: &[&str]) -> Result<f64, PartialDataWarning> {
    lookup(doc, field, path)?
        .as_f64()
        .ok_or_else(|| PartialDataWarning { field, reason: format!("'{}' is not a number", path.join(".")) })
}

fn integer(doc: &Value, field: &'static str, path: &[&str]) -> Result<i64, PartialDataWarning> {
    lookup(doc, field, path)?
        .as_i64()
        .ok_or_else(|| PartialDataWarning { field, reason: format!("'{}' is not an integer", path.join(".")) })
}

fn text(doc: &Value, field: &'static str, path: &[&str]) -> Result<String, PartialDataWarning> {
    lookup(doc, field, path)?
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| PartialDataWarning { field, reason: format!("'{}' is not a string", path.join(".")) })
}
