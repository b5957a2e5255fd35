use chrono::{DateTime, Local};
use crate::models::{Cell, OutputRow, SnapshotError, ThermostatSnapshot, WeatherSnapshot};

/// Number of columns written when weather is not configured
pub const THERMOSTAT_COLUMNS: usize = 13;

/// Number of columns written with weather
pub const FULL_COLUMNS: usize = 25;

/// Builds the row in the column order the sheet is laid out with
///
/// Thermostat fields are required and a missing one fails the whole row, weather readings
/// are optional and written as placeholders when absent.
///
/// # Arguments
///
/// * 'thermostat' - thermostat snapshot
/// * 'weather' - weather snapshot, if weather is configured
/// * 'now' - time of the sample, written in the leading column
pub fn build_row(thermostat: &ThermostatSnapshot, weather: Option<&WeatherSnapshot>, now: DateTime<Local>) -> Result<OutputRow, SnapshotError> {
    let t = thermostat;

    let columns = if weather.is_some() { FULL_COLUMNS } else { THERMOSTAT_COLUMNS };
    let mut cells = Vec::with_capacity(columns);
    cells.push(Cell::Text(now.format("%c").to_string()));
    cells.push(Cell::Number(t.number("current_temperature")?));
    cells.push(Cell::Number(t.number("current_humidity")?));
    cells.push(Cell::Number(t.number("target_temperature")?));
    cells.push(Cell::Number(t.number("target_humidity")?));
    cells.push(Cell::Number(t.number("away_temperature_low")?));
    cells.push(Cell::Number(t.number("away_temperature_high")?));
    cells.push(Cell::Bool(t.boolean("auto_away")?));
    cells.push(Cell::Text(t.text("current_schedule_mode")?));
    cells.push(Cell::Bool(t.boolean("leaf")?));
    cells.push(Cell::Bool(t.boolean("hvac_heater_state")?));
    cells.push(Cell::Bool(t.boolean("hvac_ac_state")?));
    cells.push(Cell::Bool(t.boolean("hvac_fan_state")?));

    if let Some(w) = weather {
        cells.push(w.city.clone().into());
        cells.push(w.city_id.into());
        cells.push(w.temperature.into());
        cells.push(w.humidity.into());
        cells.push(w.pressure.into());
        cells.push(w.wind_speed.into());
        cells.push(w.wind_direction.into());
        cells.push(w.clouds.into());
        cells.push(w.rain.into());
        cells.push(w.snow.into());
        cells.push(w.weather_type.clone().into());
        cells.push(w.weather_description.clone().into());
    }

    Ok(OutputRow { cells })
}
