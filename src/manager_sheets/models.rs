use serde::{Deserialize, Serialize};
use crate::models::OutputRow;

#[derive(Serialize)]
pub struct AppendBody<'a> {
    #[serde(rename = "majorDimension")]
    pub major_dimension: &'static str,
    pub values: [&'a OutputRow; 1],
}

#[derive(Deserialize, Debug, Default)]
pub struct AppendResponse {
    #[serde(rename = "tableRange", default)]
    pub table_range: Option<String>,
    #[serde(default)]
    pub updates: Updates,
}

#[derive(Deserialize, Debug, Default)]
pub struct Updates {
    #[serde(rename = "updatedRange", default)]
    pub updated_range: Option<String>,
    #[serde(rename = "updatedRows", default)]
    pub updated_rows: u32,
    #[serde(rename = "updatedCells", default)]
    pub updated_cells: u32,
}
