mod models;

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::time::Duration;
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info, warn};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{StatusCode, Url};
use thiserror::Error;
use crate::config::GoogleParameters;
use crate::manager_google_auth::models::{ClientSecret, ClientSecretFile, StoredCredentials, TokenResponse};

pub const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// How long a connection to the redirect listener may stay silent before it is dropped
const REDIRECT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Struct for obtaining spreadsheet access, reusing stored credentials when possible
pub struct GoogleAuth {
    client: Client,
    client_secret_path: String,
    store_path: String,
    redirect_port: u16,
}

/// HTTP transport carrying a valid access token
pub struct AuthorizedClient {
    client: Client,
    access_token: String,
}

impl AuthorizedClient {
    /// Returns a POST request builder with the bearer token applied
    ///
    /// # Arguments
    ///
    /// * 'url' - request url
    pub fn post(&self, url: Url) -> RequestBuilder {
        self.client.post(url).bearer_auth(&self.access_token)
    }
}

impl GoogleAuth {
    /// Returns a GoogleAuth struct
    ///
    /// # Arguments
    ///
    /// * 'config' - spreadsheet configuration holding credential paths
    /// * 'timeout' - timeout for token endpoint requests and for the authorized client
    pub fn new(config: &GoogleParameters, timeout: Duration) -> Result<GoogleAuth, AuthError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(GoogleAuth {
            client,
            client_secret_path: config.client_secret_path.clone(),
            store_path: config.credential_store_path.clone(),
            redirect_port: config.redirect_port,
        })
    }

    /// Returns an authorized transport
    ///
    /// Stored credentials are used as long as they are valid. Expired ones are refreshed,
    /// and only if the token endpoint rejects the refresh token is the interactive consent
    /// flow run. Any other refresh failure is returned. New credentials are written back
    /// to the store.
    ///
    pub fn authorize(&self) -> Result<AuthorizedClient, AuthError> {
        let now = Utc::now();

        let credentials = match self.load_stored() {
            Some(c) if c.is_valid(now, SCOPE) => {
                debug!("Using stored credentials valid until {}", c.expires_at);
                c
            },
            Some(c) if c.refresh_token.is_some() && c.scope.split_whitespace().any(|s| s == SCOPE) => {
                let secret = self.client_secret()?;
                match self.refresh(&secret, &c) {
                    Ok(refreshed) => {
                        self.save(&refreshed)?;
                        refreshed
                    },
                    Err(AuthError::GrantError(e)) => {
                        warn!("Refresh token rejected, reauthorizing: {}", e);
                        self.authorize_interactively(&secret)?
                    },
                    Err(e) => return Err(e),
                }
            },
            _ => {
                let secret = self.client_secret()?;
                self.authorize_interactively(&secret)?
            }
        };

        Ok(AuthorizedClient { client: self.client.clone(), access_token: credentials.access_token })
    }

    /// Reads the credential store, anything missing or unreadable counts as no credentials
    ///
    fn load_stored(&self) -> Option<StoredCredentials> {
        let json = match fs::read_to_string(&self.store_path) {
            Ok(json) => json,
            Err(e) => {
                info!("No stored credentials at {}: {}", self.store_path, e);
                return None;
            }
        };

        match serde_json::from_str::<StoredCredentials>(&json) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Stored credentials at {} are invalid: {}", self.store_path, e);
                None
            }
        }
    }

    /// Writes credentials to the store, readable by the owner only on unix
    ///
    /// # Arguments
    ///
    /// * 'credentials' - the credentials to persist
    fn save(&self, credentials: &StoredCredentials) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(credentials)
            .map_err(|e| AuthError::StoreError(format!("error serializing credentials: {}", e)))?;

        fs::write(&self.store_path, json)
            .map_err(|e| AuthError::StoreError(format!("{}: {}", self.store_path, e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.store_path, fs::Permissions::from_mode(0o600))
                .map_err(|e| AuthError::StoreError(format!("{}: {}", self.store_path, e)))?;
        }

        Ok(())
    }

    fn client_secret(&self) -> Result<ClientSecret, AuthError> {
        let json = fs::read_to_string(&self.client_secret_path)
            .map_err(|e| AuthError::ClientSecretError(format!("{}: {}", self.client_secret_path, e)))?;

        parse_client_secret(&json)
    }

    /// Exchanges the refresh token for a new access token
    ///
    /// # Arguments
    ///
    /// * 'secret' - client identity
    /// * 'credentials' - the expired credentials
    fn refresh(&self, secret: &ClientSecret, credentials: &StoredCredentials) -> Result<StoredCredentials, AuthError> {
        let refresh_token = credentials.refresh_token.as_deref().unwrap_or_default();
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
        ];

        let token = self.token_request(&secret.token_uri, &params)?;
        info!("Refreshed spreadsheet credentials");

        Ok(StoredCredentials {
            access_token: token.access_token,
            refresh_token: token.refresh_token.or(credentials.refresh_token.clone()),
            expires_at: expiry(Utc::now(), token.expires_in)?,
            scope: token.scope.unwrap_or(credentials.scope.clone()),
        })
    }

    /// Runs the consent flow: the user opens the printed url, the redirect lands on a
    /// loopback listener and the code it carries is exchanged for tokens
    ///
    /// # Arguments
    ///
    /// * 'secret' - client identity
    fn authorize_interactively(&self, secret: &ClientSecret) -> Result<StoredCredentials, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", self.redirect_port))
            .map_err(|e| AuthError::ConsentError(format!("error binding redirect listener: {}", e)))?;
        let port = listener.local_addr()
            .map_err(|e| AuthError::ConsentError(e.to_string()))?
            .port();

        let redirect_uri = format!("http://127.0.0.1:{}", port);
        let state = uuid::Uuid::new_v4().simple().to_string();
        let url = consent_url(secret, &redirect_uri, &state)?;

        info!("Spreadsheet authorization required, waiting for consent on {}", redirect_uri);
        println!("Open the following link in your browser to authorize spreadsheet access:\n\n    {}\n", url);

        let code = wait_for_code(&listener, &state)?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
        ];
        let token = self.token_request(&secret.token_uri, &params)?;

        let credentials = StoredCredentials {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: expiry(Utc::now(), token.expires_in)?,
            scope: token.scope.unwrap_or(SCOPE.to_string()),
        };
        self.save(&credentials)?;
        info!("Storing credentials to {}", self.store_path);

        Ok(credentials)
    }

    fn token_request(&self, token_uri: &str, params: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self.client
            .post(token_uri)
            .form(params)
            .send()?;

        let status = response.status();
        let json = response.text()?;
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::GrantError(format!("status {}: {}", status, json)));
        }
        if !status.is_success() {
            return Err(AuthError::TokenError(format!("status {}: {}", status, json)));
        }

        serde_json::from_str(&json)
            .map_err(|e| AuthError::TokenError(format!("error parsing token response: {}", e)))
    }
}

/// Parses a client secret file, accepting both installed and web application layouts
///
/// # Arguments
///
/// * 'json' - content of the client secret file
fn parse_client_secret(json: &str) -> Result<ClientSecret, AuthError> {
    let file: ClientSecretFile = serde_json::from_str(json)
        .map_err(|e| AuthError::ClientSecretError(e.to_string()))?;

    file.installed
        .or(file.web)
        .ok_or(AuthError::ClientSecretError("neither 'installed' nor 'web' section present".to_string()))
}

/// Returns the instant a token issued at 'now' expires
///
/// # Arguments
///
/// * 'now' - when the token was issued
/// * 'expires_in' - lifetime in seconds as reported by the token endpoint
fn expiry(now: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>, AuthError> {
    TimeDelta::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or(AuthError::TokenError(format!("token lifetime out of range: {}", expires_in)))
}

/// Builds the url where the user grants access
///
/// # Arguments
///
/// * 'secret' - client identity
/// * 'redirect_uri' - where the consent page sends the user afterwards
/// * 'state' - value the redirect must carry back
fn consent_url(secret: &ClientSecret, redirect_uri: &str, state: &str) -> Result<Url, AuthError> {
    Url::parse_with_params(&secret.auth_uri, &[
        ("response_type", "code"),
        ("client_id", secret.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("scope", SCOPE),
        ("access_type", "offline"),
        ("prompt", "consent"),
        ("state", state),
    ]).map_err(|e| AuthError::ConsentError(format!("invalid auth uri: {}", e)))
}

/// Serves the loopback listener until a redirect carrying a code or an error arrives
///
/// Connections that fail or send nothing within the read timeout are dropped, browsers
/// open such connections speculatively.
///
/// # Arguments
///
/// * 'listener' - the redirect listener
/// * 'state' - the state sent with the consent url
fn wait_for_code(listener: &TcpListener, state: &str) -> Result<String, AuthError> {
    for stream in listener.incoming() {
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                debug!("Redirect connection failed: {}", e);
                continue;
            }
        };

        let mut request_line = String::new();
        let read = stream.set_read_timeout(Some(REDIRECT_READ_TIMEOUT))
            .and_then(|_| BufReader::new(&stream).read_line(&mut request_line));
        if let Err(e) = read {
            debug!("Dropping redirect connection: {}", e);
            continue;
        }
        let target = request_line.split_whitespace().nth(1).unwrap_or("/");

        let outcome = parse_redirect(target, state);
        let page = match &outcome {
            Ok(Some(_)) => "Authorization complete, this window can be closed.",
            Ok(None) => "Waiting for authorization.",
            Err(_) => "Authorization failed, see the log for details.",
        };
        let _ = write!(stream, "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}", page.len(), page);

        if let Some(code) = outcome? {
            return Ok(code);
        }
    }

    Err(AuthError::ConsentError("redirect listener closed".to_string()))
}

/// Returns the code from a redirect target, None for requests that aren't the redirect
///
/// # Arguments
///
/// * 'target' - request target, i.e. path and query
/// * 'state' - the state sent with the consent url
fn parse_redirect(target: &str, state: &str) -> Result<Option<String>, AuthError> {
    let url = Url::parse(&format!("http://127.0.0.1{}", target))
        .map_err(|e| AuthError::ConsentError(format!("malformed redirect: {}", e)))?;

    let mut code = None;
    let mut returned_state = None;
    for (k, v) in url.query_pairs() {
        match k.as_ref() {
            "code" => code = Some(v.to_string()),
            "state" => returned_state = Some(v.to_string()),
            "error" => return Err(AuthError::ConsentError(format!("consent refused: {}", v))),
            _ => {}
        }
    }

    match code {
        Some(_) if returned_state.as_deref() != Some(state) => Err(AuthError::ConsentError("state mismatch in redirect".to_string())),
        c => Ok(c),
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("NetworkError: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("ClientSecretError: {0}")]
    ClientSecretError(String),
    #[error("StoreError: {0}")]
    StoreError(String),
    #[error("TokenError: {0}")]
    TokenError(String),
    #[error("GrantError: {0}")]
    GrantError(String),
    #[error("ConsentError: {0}")]
    ConsentError(String),
}
