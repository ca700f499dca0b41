//! Run configuration: target API, auth, and test cases

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::cases::TestCaseSet;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: f64 = 10.0;

/// Default port for `local_test` runs.
pub const DEFAULT_LOCAL_PORT: u16 = 8080;

/// Project configuration as written on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawConfig {
    /// Target a locally running API instead of the remote endpoint
    #[serde(default)]
    pub local_test: bool,

    /// Full remote base URL; takes precedence over `host`/`port`/`scheme`
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// `https` unless set
    #[serde(default)]
    pub scheme: Option<String>,

    /// Path prefix appended to the host, e.g. `/api/v1`
    #[serde(default)]
    pub base_path: Option<String>,

    /// Port used when `local_test` is true
    #[serde(default)]
    pub local_port: Option<u16>,

    #[serde(default)]
    pub auth: Option<AuthConfig>,

    /// Extra HTTP headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<f64>,

    /// Response time limit in seconds (optional, disabled by default)
    #[serde(default)]
    pub response_time_limit: Option<f64>,

    /// Verify TLS certificates (default true)
    #[serde(default)]
    pub verify_tls: Option<bool>,

    /// Case name → literal values, in order
    #[serde(default)]
    pub test_cases: BTreeMap<String, Vec<serde_json::Value>>,
}

/// Authentication applied to the shared session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    Basic {
        username: String,
        password: String,
    },
    Bearer {
        token: String,
    },
    /// OAuth2 client-credentials grant, performed once when the session opens
    Oauth2 {
        token_url: String,
        client_id: String,
        client_secret: String,
    },
}

/// Validated configuration with a resolved base URL and decoded test cases.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub auth: Option<AuthConfig>,
    pub headers: HashMap<String, String>,
    pub timeout_secs: f64,
    pub response_time_limit: Option<f64>,
    pub verify_tls: bool,
    pub test_cases: TestCaseSet,
}

impl RawConfig {
    /// Build the base URL.
    ///
    /// - `local_test` → `http://localhost:{local_port}{base_path}`
    /// - `base_url` set → used as is
    /// - otherwise `{scheme}://{host}[:{port}]{base_path}`
    ///
    /// # Errors
    ///
    /// `MissingBaseUrl` when neither `base_url` nor `host` is configured.
    pub fn resolve_base_url(&self) -> Result<String, ConfigError> {
        let base_path = self.base_path.as_deref().unwrap_or("");
        let url = if self.local_test {
            let port = self.local_port.unwrap_or(DEFAULT_LOCAL_PORT);
            format!("http://localhost:{port}{base_path}")
        } else if let Some(url) = &self.base_url {
            url.clone()
        } else if let Some(host) = &self.host {
            let scheme = self.scheme.as_deref().unwrap_or("https");
            match self.port {
                Some(port) => format!("{scheme}://{host}:{port}{base_path}"),
                None => format!("{scheme}://{host}{base_path}"),
            }
        } else {
            return Err(ConfigError::MissingBaseUrl);
        };
        Ok(url.trim_end_matches('/').to_string())
    }
}

impl Config {
    /// Load config from file. `.toml` files are parsed as TOML, everything else as JSON.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        let raw: RawConfig = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        };
        Self::from_raw(raw)
    }

    /// Validate a raw config.
    ///
    /// # Errors
    ///
    /// Missing base URL, unknown case names, or ill-typed case values.
    pub fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let base_url = raw.resolve_base_url()?;
        let test_cases = TestCaseSet::decode(&raw.test_cases)?;
        Ok(Self {
            base_url,
            auth: raw.auth,
            headers: raw.headers,
            timeout_secs: raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            response_time_limit: raw.response_time_limit,
            verify_tls: raw.verify_tls.unwrap_or(true),
            test_cases,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("No base URL: set base_url, host, or local_test")]
    MissingBaseUrl,
    #[error("Unknown test case '{0}'")]
    UnknownCase(String),
    #[error("Test case '{case}' value #{index}: {reason}")]
    CaseValue {
        case: String,
        index: usize,
        reason: String,
    },
}
