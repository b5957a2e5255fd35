use chrono::Local;
use log::{info, warn};
use thiserror::Error;
use crate::initialization::Mgr;
use crate::manager_google_auth::AuthError;
use crate::manager_nest::NestError;
use crate::manager_sheets::{AppendResponse, SheetsError};
use crate::manager_weather::WeatherError;
use crate::mapper::build_row;
use crate::models::SnapshotError;

/// Runs one sample: authorize, read thermostat and weather, append a row
///
/// Nothing is written unless every required reading is present.
///
/// # Arguments
///
/// * 'mgr' - struct with configured managers
pub fn run(mgr: &Mgr) -> Result<AppendResponse, RunError> {
    // Without write access there is no point in polling anything
    let transport = mgr.auth.authorize()?;

    let session = mgr.nest.login()?;
    let thermostat = session.get_status()?;
    info!("Thermostat {} status read", thermostat.serial);

    let weather = match &mgr.weather {
        Some(w) => {
            let (snapshot, warnings) = w.get_weather()?;
            for warning in warnings.iter() {
                warn!("{}", warning);
            }
            Some(snapshot)
        },
        None => None,
    };

    let row = build_row(&thermostat, weather.as_ref(), Local::now())?;

    let response = mgr.sheets.append_row(&transport, &row)?;

    Ok(response)
}

/// Error depicting errors that abort a run
///
#[derive(Debug, Error)]
pub enum RunError {
    #[error("AuthError: {0}")]
    AuthError(String),
    #[error("UpstreamSchemaError: {0}")]
    UpstreamSchemaError(String),
    #[error("UpstreamUnavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("WriteError: {0}")]
    WriteError(#[from] SheetsError),
}

impl From<AuthError> for RunError {
    fn from(e: AuthError) -> Self {
        RunError::AuthError(format!("spreadsheet credentials: {}", e))
    }
}

impl From<NestError> for RunError {
    fn from(e: NestError) -> Self {
        match e {
            NestError::LoginError(_) => RunError::AuthError(format!("thermostat account: {}", e)),
            NestError::DocumentError(_) | NestError::DeviceError(_) => RunError::UpstreamSchemaError(format!("thermostat: {}", e)),
            NestError::NetworkError(_) | NestError::StatusError(_) => RunError::UpstreamUnavailable(format!("thermostat: {}", e)),
        }
    }
}

impl From<WeatherError> for RunError {
    fn from(e: WeatherError) -> Self {
        RunError::UpstreamUnavailable(format!("weather: {}", e))
    }
}

impl From<SnapshotError> for RunError {
    fn from(e: SnapshotError) -> Self {
        RunError::UpstreamSchemaError(format!("thermostat: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use serde_json::{json, Value};
    use crate::config::parse_config;
    use crate::initialization::build_managers;
    use crate::test_server::{RecordedRequest, Route, TestServer};

    const APPEND_PATH: &str = "/v4/spreadsheets/sheet-id/values/Sheet1:append";

    fn thermostat_status(drop_field: Option<&str>) -> String {
        let mut shared = json!({
            "target_temperature": 70,
            "current_temperature": 68,
            "hvac_heater_state": true,
            "hvac_ac_state": false,
            "hvac_fan_state": false,
            "auto_away": false
        });
        let mut device = json!({
            "target_humidity": 40,
            "leaf": true,
            "current_humidity": 38,
            "current_schedule_mode": "HEAT",
            "away_temperature_low": 50,
            "away_temperature_high": 80
        });
        if let Some(f) = drop_field {
            shared.as_object_mut().unwrap().remove(f);
            device.as_object_mut().unwrap().remove(f);
        }

        json!({
            "user": {"42": {"structures": ["structure.s1"]}},
            "structure": {"s1": {"devices": ["device.02AA01AB"]}},
            "device": {"02AA01AB": device},
            "shared": {"02AA01AB": shared}
        }).to_string()
    }

    fn weather_without_precipitation() -> String {
        json!({
            "weather": [{"main": "Clouds", "description": "broken clouds"}],
            "main": {"temp": 285.65, "pressure": 1012, "humidity": 81},
            "wind": {"speed": 4.1, "deg": 80},
            "clouds": {"all": 75},
            "id": 2643743,
            "name": "London"
        }).to_string()
    }

    fn routes(base: &str, status: String, append_status: u16) -> Vec<Route> {
        vec![
            Route::new("POST", "/user/login", 200,
                &json!({"access_token": "nest-token", "userid": "42", "urls": {"transport_url": base}}).to_string()),
            Route::new("GET", "/v2/mobile/user.42", 200, &status),
            Route::new("GET", "/data/2.5/weather", 200, &weather_without_precipitation()),
            Route::new("POST", APPEND_PATH, append_status,
                r#"{"spreadsheetId":"sheet-id","updates":{"updatedRange":"Sheet1!A2:Y2","updatedRows":1,"updatedCells":13}}"#),
        ]
    }

    /// Returns managers pointed at the stub server, with valid stored spreadsheet credentials
    fn managers(dir: &tempfile::TempDir, base: &str, with_weather: bool) -> Mgr {
        let store = dir.path().join("credentials.json");
        fs::write(&store, json!({
            "access_token": "sheets-token",
            "refresh_token": null,
            "expires_at": "2099-01-01T00:00:00Z",
            "scope": "https://www.googleapis.com/auth/spreadsheets"
        }).to_string()).unwrap();

        let mut toml = format!(r#"
            [general]
            log_path = "{log}"
            log_level = "Debug"
            log_to_stdout = false
            http_timeout_secs = 5

            [nest]
            user = "someone@example.com"
            password = "secret"
            host = "{base}"

            [google]
            client_secret_path = "{secret}"
            credential_store_path = "{store}"
            spreadsheet_id = "sheet-id"
            sheets_host = "{base}"
            "#,
            log = dir.path().join("nest_logger.log").display(),
            secret = dir.path().join("client_secret.json").display(),
            store = store.display(),
            base = base,
        );
        if with_weather {
            toml.push_str(&format!("\n[weather]\napi_key = \"key\"\ncity_id = \"2643743\"\nhost = \"{}\"\n", base));
        }

        build_managers(&parse_config(&toml).unwrap()).unwrap()
    }

    fn appends(server: &TestServer) -> Vec<RecordedRequest> {
        server.requests().into_iter().filter(|r| r.path() == APPEND_PATH).collect()
    }

    #[test]
    fn thermostat_only_run_appends_one_row() {
        let server = TestServer::start(|base| routes(base, thermostat_status(None), 200));
        let dir = tempfile::tempdir().unwrap();
        let mgr = managers(&dir, &server.base_url, false);

        let response = run(&mgr).unwrap();
        assert_eq!(response.updates.updated_rows, 1);

        let appends = appends(&server);
        assert_eq!(appends.len(), 1);
        assert_eq!(appends[0].query(), "valueInputOption=RAW&insertDataOption=INSERT_ROWS");
        assert_eq!(appends[0].header("Authorization"), Some("Bearer sheets-token"));

        let body: Value = serde_json::from_str(&appends[0].body).unwrap();
        let row = body["values"][0].as_array().unwrap();
        assert_eq!(body["values"].as_array().unwrap().len(), 1);
        assert_eq!(row.len(), 13);
        assert!(row[0].is_string());
        assert_eq!(row[1..].to_vec(), json!([68, 38, 70, 40, 50, 80, false, "HEAT", true, true, false, false]).as_array().unwrap().clone());
        assert!(server.requests().iter().all(|r| r.path() != "/data/2.5/weather"));
    }

    #[test]
    fn missing_rain_and_snow_are_placeholders() {
        let server = TestServer::start(|base| routes(base, thermostat_status(None), 200));
        let dir = tempfile::tempdir().unwrap();
        let mgr = managers(&dir, &server.base_url, true);

        run(&mgr).unwrap();

        let appends = appends(&server);
        let body: Value = serde_json::from_str(&appends[0].body).unwrap();
        let row = body["values"][0].as_array().unwrap();
        assert_eq!(row.len(), 25);
        assert_eq!(row[21], json!("--"));
        assert_eq!(row[22], json!("--"));
        assert_eq!(row[13], json!("London"));
        assert_eq!(row[14], json!(2643743));
        assert!((row[15].as_f64().unwrap() - 12.5).abs() < 1e-9);
        assert_eq!(row[23], json!("Clouds"));
        assert_eq!(row.iter().filter(|v| **v == json!("--")).count(), 2);
    }

    #[test]
    fn missing_required_field_aborts_before_write() {
        let server = TestServer::start(|base| routes(base, thermostat_status(Some("target_temperature")), 200));
        let dir = tempfile::tempdir().unwrap();
        let mgr = managers(&dir, &server.base_url, true);

        let result = run(&mgr);

        assert!(matches!(result, Err(RunError::UpstreamSchemaError(_))));
        assert!(appends(&server).is_empty());
    }

    #[test]
    fn failed_append_is_a_write_error() {
        let server = TestServer::start(|base| routes(base, thermostat_status(None), 500));
        let dir = tempfile::tempdir().unwrap();
        let mgr = managers(&dir, &server.base_url, false);

        assert!(matches!(run(&mgr), Err(RunError::WriteError(SheetsError::AppendError(_)))));
        assert_eq!(appends(&server).len(), 1);
    }

    #[test]
    fn nest_errors_map_to_run_errors() {
        assert!(matches!(RunError::from(NestError::LoginError("denied".into())), RunError::AuthError(_)));
        assert!(matches!(RunError::from(NestError::DeviceError("none".into())), RunError::UpstreamSchemaError(_)));
        assert!(matches!(RunError::from(NestError::StatusError("503".into())), RunError::UpstreamUnavailable(_)));
    }
}
