//! HTTP client session: one blocking client, base URL and credentials for a run.

use std::time::Duration;

use apiconform_core::{AuthConfig, Config};
use reqwest::blocking::{Client, Request, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("HTTP client error: {0}")]
    Client(String),
    #[error("authentication failed: {0}")]
    Auth(String),
}

#[derive(Debug, Clone)]
enum Credentials {
    Basic { username: String, password: String },
    Bearer(String),
}

/// Shared HTTP session. Open once with [`Session::open`], release with [`Session::close`].
#[derive(Debug)]
pub struct Session {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
    timeout: Duration,
    response_time_limit: Option<f64>,
    closed: bool,
}

impl Session {
    /// Build the client and, for OAuth2, fetch an access token.
    ///
    /// # Errors
    ///
    /// `Client` for an invalid timeout, header or client setup; `Auth` when the
    /// token endpoint rejects the client credentials.
    pub fn open(config: &Config) -> Result<Self, SessionError> {
        let timeout = Duration::try_from_secs_f64(config.timeout_secs)
            .map_err(|e| SessionError::Client(format!("invalid timeout_secs: {e}")))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SessionError::Client(format!("header '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| SessionError::Client(format!("header '{name}': {e}")))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| SessionError::Client(e.to_string()))?;

        let credentials = match &config.auth {
            None => None,
            Some(AuthConfig::Basic { username, password }) => Some(Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            Some(AuthConfig::Bearer { token }) => Some(Credentials::Bearer(token.clone())),
            Some(AuthConfig::Oauth2 {
                token_url,
                client_id,
                client_secret,
            }) => Some(Credentials::Bearer(fetch_token(
                &client,
                token_url,
                client_id,
                client_secret,
            )?)),
        };

        debug!(base_url = %config.base_url, timeout_secs = config.timeout_secs, "session opened");

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            credentials,
            timeout,
            response_time_limit: config.response_time_limit,
            closed: false,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub const fn response_time_limit(&self) -> Option<f64> {
        self.response_time_limit
    }

    /// Build an authorized GET request. Repeated query keys are kept in order.
    ///
    /// # Errors
    ///
    /// The URL could not be built.
    pub fn request(&self, path: &str, query: &[(String, String)]) -> reqwest::Result<Request> {
        let mut builder = self.client.get(self.url(path));
        if !query.is_empty() {
            builder = builder.query(query);
        }
        self.authorize(builder).build()
    }

    /// Send a request built by [`Session::request`].
    ///
    /// # Errors
    ///
    /// Transport failures, including timeouts.
    pub fn execute(&self, request: Request) -> reqwest::Result<Response> {
        self.client.execute(request)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            None => builder,
            Some(Credentials::Basic { username, password }) => {
                builder.basic_auth(username, Some(password))
            }
            Some(Credentials::Bearer(token)) => builder.bearer_auth(token),
        }
    }

    /// Release the session.
    pub fn close(mut self) {
        self.closed = true;
        debug!(base_url = %self.base_url, "session closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            warn!(base_url = %self.base_url, "session dropped without close");
        }
    }
}

fn fetch_token(
    client: &Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<String, SessionError> {
    let response = client
        .post(token_url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ])
        .send()
        .map_err(|e| SessionError::Auth(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SessionError::Auth(format!(
            "token endpoint returned {}",
            status.as_u16()
        )));
    }

    let token: TokenResponse = response
        .json()
        .map_err(|e| SessionError::Auth(format!("invalid token response: {e}")))?;
    Ok(token.access_token)
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}
