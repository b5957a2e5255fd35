use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct ClientSecretFile {
    pub installed: Option<ClientSecret>,
    pub web: Option<ClientSecret>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String { "https://accounts.google.com/o/oauth2/auth".to_string() }
fn default_token_uri() -> String { "https://oauth2.googleapis.com/token".to_string() }

/// Token material as persisted in the credential store
///
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StoredCredentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub scope: String,
}

impl StoredCredentials {
    /// Returns true if the access token covers 'scope' and is good for at least another minute
    ///
    /// # Arguments
    ///
    /// * 'now' - the time to check against
    /// * 'scope' - the scope the token must cover
    pub fn is_valid(&self, now: DateTime<Utc>, scope: &str) -> bool {
        self.scope.split_whitespace().any(|s| s == scope) && self.expires_at - TimeDelta::seconds(60) > now
    }
}

#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}
