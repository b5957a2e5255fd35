mod models;

use log::info;
use reqwest::Url;
use thiserror::Error;
use crate::config::GoogleParameters;
use crate::manager_google_auth::AuthorizedClient;
use crate::manager_sheets::models::AppendBody;
use crate::models::OutputRow;

pub use models::AppendResponse;

/// Struct for appending rows to a Google Sheets spreadsheet
pub struct Sheets {
    host: String,
    spreadsheet_id: String,
    range: String,
}

impl Sheets {
    /// Returns a Sheets struct for the configured spreadsheet and range
    ///
    /// # Arguments
    ///
    /// * 'config' - spreadsheet configuration
    pub fn new(config: &GoogleParameters) -> Sheets {
        Sheets {
            host: config.sheets_host.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.range.clone(),
        }
    }

    /// Appends one row after the last row of the range, as typed and always as new rows
    ///
    /// See https://developers.google.com/sheets/api/reference/rest/v4/spreadsheets.values/append
    ///
    /// # Arguments
    ///
    /// * 'transport' - authorized client
    /// * 'row' - the row to append
    pub fn append_row(&self, transport: &AuthorizedClient, row: &OutputRow) -> Result<AppendResponse, SheetsError> {
        let url = self.append_url()?;
        let body = AppendBody { major_dimension: "ROWS", values: [row] };

        let response = transport
            .post(url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&body)
            .send()?;

        let status = response.status();
        let json = response.text()?;
        if !status.is_success() {
            return Err(SheetsError::AppendError(format!("status {}: {}", status, json)));
        }

        let result: AppendResponse = serde_json::from_str(&json)
            .map_err(|e| SheetsError::DocumentError(e.to_string()))?;

        info!("Appended {} row(s), {} cell(s) to {}, table range before append: {}",
            result.updates.updated_rows,
            result.updates.updated_cells,
            result.updates.updated_range.as_deref().unwrap_or(&self.range),
            result.table_range.as_deref().unwrap_or("empty"));

        Ok(result)
    }

    fn append_url(&self) -> Result<Url, SheetsError> {
        let mut url = Url::parse(&self.host)
            .map_err(|e| SheetsError::UrlError(format!("{}: {}", self.host, e)))?;

        let range = format!("{}:append", self.range);
        url.path_segments_mut()
            .map_err(|_| SheetsError::UrlError(format!("{} can't be a base", self.host)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", range.as_str()]);

        Ok(url)
    }
}

#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("NetworkError: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("UrlError: {0}")]
    UrlError(String),
    #[error("AppendError: {0}")]
    AppendError(String),
    #[error("DocumentError: {0}")]
    DocumentError(String),
}
