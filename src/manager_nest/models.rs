use std::collections::HashMap;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub userid: String,
    pub urls: Urls,
}

#[derive(Deserialize)]
pub struct Urls {
    pub transport_url: String,
}

#[derive(Deserialize)]
pub struct Status {
    #[serde(default)]
    pub user: HashMap<String, UserEntry>,
    #[serde(default)]
    pub structure: HashMap<String, StructureEntry>,
    pub device: Map<String, Value>,
    pub shared: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct UserEntry {
    #[serde(default)]
    pub structures: Vec<String>,
}

#[derive(Deserialize)]
pub struct StructureEntry {
    #[serde(default)]
    pub devices: Vec<String>,
}
