mod extract;

use std::time::Duration;
use log::info;
use reqwest::blocking::Client;
use serde_json::Value;
use thiserror::Error;
use crate::config::WeatherParameters;
use crate::models::WeatherSnapshot;

use extract::{weather_from_json, PartialDataWarning};

/// Struct for fetching current outside weather from OpenWeatherMap
pub struct Weather {
    client: Client,
    host: String,
    city_id: String,
    api_key: String,
}

impl Weather {
    /// Returns a Weather struct ready for fetching current weather
    ///
    /// # Arguments
    ///
    /// * 'config' - weather configuration
    /// * 'timeout' - request timeout
    pub fn new(config: &WeatherParameters, timeout: Duration) -> Result<Weather, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Weather {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            city_id: config.city_id.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Retrieves current weather for the configured city
    ///
    /// A response that lacks some readings is not an error, the missing readings are
    /// returned as warnings alongside whatever could be extracted.
    ///
    pub fn get_weather(&self) -> Result<(WeatherSnapshot, Vec<PartialDataWarning>), WeatherError> {
        let url = format!("{}/data/2.5/weather", self.host);

        let response = self.client
            .get(url)
            .query(&[("id", self.city_id.as_str()), ("appid", self.api_key.as_str())])
            .send()
            .map_err(|e| WeatherError::NetworkError(e.without_url()))?;

        let status = response.status();
        let json = response.text()
            .map_err(|e| WeatherError::NetworkError(e.without_url()))?;
        if !status.is_success() {
            return Err(WeatherError::StatusError(format!("status {}: {}", status, json)));
        }

        let doc: Value = serde_json::from_str(&json)
            .map_err(|e| WeatherError::DocumentError(e.to_string()))?;

        let (snapshot, warnings) = weather_from_json(&doc);
        info!("Weather for city {} fetched, {} reading(s) missing", self.city_id, warnings.len());

        Ok((snapshot, warnings))
    }
}

/// Converts Kelvin to Celsius
///
/// # Arguments
///
/// * 'kelvin' - temperature in Kelvin
pub fn to_celsius(kelvin: f64) -> f64 {
    kelvin - 273.15
}

/// Converts Celsius to Kelvin
///
/// # Arguments
///
/// * 'celsius' - temperature in Celsius
pub fn to_kelvin(celsius: f64) -> f64 {
    celsius + 273.15
}

/// Converts m/s to mph
///
/// # Arguments
///
/// * 'speed' - speed in meters per second
pub fn to_mph(speed: f64) -> f64 {
    speed * 2.23694
}

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("NetworkError: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("StatusError: {0}")]
    StatusError(String),
    #[error("DocumentError: {0}")]
    DocumentError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{Route, TestServer};

    #[test]
    fn celsius_kelvin_round_trip() {
        for c in [-40.0, -0.5, 0.0, 21.3, 37.0, 100.0] {
            assert!((to_celsius(to_kelvin(c)) - c).abs() < 1e-9);
        }
        assert!((to_celsius(273.15)).abs() < 1e-12);
    }

    #[test]
    fn mph_factor() {
        assert_eq!(to_mph(0.0), 0.0);
        assert_eq!(to_mph(1.0), 2.23694);
        assert!((to_mph(4.1) - 4.1 * 2.23694).abs() < 1e-12);
    }

    #[test]
    fn fetch_sends_city_and_key() {
        let server = TestServer::start(|_| vec![
            Route::new("GET", "/data/2.5/weather", 200,
                r#"{"name":"London","id":2643743,"main":{"temp":283.15,"pressure":1012,"humidity":81}}"#),
        ]);
        let weather = Weather::new(
            &WeatherParameters { api_key: "key123".to_string(), city_id: "2643743".to_string(), host: server.base_url.clone() },
            Duration::from_secs(5),
        ).unwrap();

        let (snapshot, warnings) = weather.get_weather().unwrap();

        assert_eq!(snapshot.city.as_deref(), Some("London"));
        assert!((snapshot.temperature.unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(warnings.len(), 7);
        let requests = server.requests();
        assert_eq!(requests[0].query(), "id=2643743&appid=key123");
    }

    #[test]
    fn unknown_city_is_an_error() {
        let server = TestServer::start(|_| vec![
            Route::new("GET", "/data/2.5/weather", 404, r#"{"cod":"404","message":"city not found"}"#),
        ]);
        let weather = Weather::new(
            &WeatherParameters { api_key: "k".to_string(), city_id: "0".to_string(), host: server.base_url.clone() },
            Duration::from_secs(5),
        ).unwrap();

        assert!(matches!(weather.get_weather(), Err(WeatherError::StatusError(_))));
    }
}
