//! Failure types and structured representation

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Severity;

/// Type of failure - determines default severity and report grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    /// Actual status code differs from the expected one
    StatusMismatch,
    /// Response body is not a `{"data": ...}` envelope
    EnvelopeMalformed,
    /// Resource or error object violates its schema
    SchemaViolation,
    /// Resource schema is not defined in the API document
    SchemaNotFound,
    /// Request timed out
    Timeout,
    /// Could not connect, or the transport failed mid-request
    ConnectionError,
    /// Filtered query returned no rows
    NoData,
    /// Returned identifier differs from the requested one
    IdMismatch,
    /// A row does not match the filter value
    FilterMismatch,
    /// A row falls outside a numeric bound
    BoundaryViolation,
    /// A row is not among the requested values
    MembershipViolation,
    /// A row's date differs from the requested date
    DateMismatch,
    /// Expected status not declared for the operation in the API document
    StatusNotDeclared,
    /// Response slower than the configured limit
    ResponseTimeExceeded,
    /// Test case missing from configuration
    ConfigError,
}

/// Broad origin of a failure, used to separate API regressions from infrastructure issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Contract,
    Transport,
    Business,
    Config,
}

impl FailureType {
    /// Default severity for this failure type
    #[must_use]
    pub const fn default_severity(self) -> Severity {
        match self.category() {
            FailureCategory::Transport => Severity::Critical,
            FailureCategory::Contract | FailureCategory::Business | FailureCategory::Config => {
                match self {
                    Self::StatusNotDeclared | Self::ResponseTimeExceeded => Severity::Warning,
                    _ => Severity::Error,
                }
            }
        }
    }

    #[must_use]
    pub const fn category(self) -> FailureCategory {
        match self {
            Self::StatusMismatch
            | Self::EnvelopeMalformed
            | Self::SchemaViolation
            | Self::SchemaNotFound
            | Self::StatusNotDeclared
            | Self::ResponseTimeExceeded => FailureCategory::Contract,
            Self::Timeout | Self::ConnectionError => FailureCategory::Transport,
            Self::NoData
            | Self::IdMismatch
            | Self::FilterMismatch
            | Self::BoundaryViolation
            | Self::MembershipViolation
            | Self::DateMismatch => FailureCategory::Business,
            Self::ConfigError => FailureCategory::Config,
        }
    }

    /// Human-readable description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::StatusMismatch => "Status code does not match expectation",
            Self::EnvelopeMalformed => "Response envelope is malformed",
            Self::SchemaViolation => "Response does not match API schema",
            Self::SchemaNotFound => "Resource schema not found in API document",
            Self::Timeout => "Request timed out",
            Self::ConnectionError => "Connection or transport error",
            Self::NoData => "No data returned",
            Self::IdMismatch => "Returned id differs from requested id",
            Self::FilterMismatch => "Row does not match filter",
            Self::BoundaryViolation => "Row outside requested bound",
            Self::MembershipViolation => "Row not among requested values",
            Self::DateMismatch => "Row date differs from requested date",
            Self::StatusNotDeclared => "Expected status not declared in API document",
            Self::ResponseTimeExceeded => "Response time limit exceeded",
            Self::ConfigError => "Configuration error",
        }
    }
}

impl std::fmt::Display for FailureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// A single failure, with enough data to reproduce the request by hand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Failure {
    /// Type of failure
    pub failure_type: FailureType,
    /// Severity level
    pub severity: Severity,
    /// Detailed message
    pub message: String,
    /// Full request URL including query string (absent for config failures)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Expected status code (if known)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<u16>,
    /// Actual status code received (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Additional context (property, expected type, actual value, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

impl Failure {
    /// Create a failure with the type's default severity
    #[must_use]
    pub fn new(failure_type: FailureType, message: impl Into<String>) -> Self {
        Self {
            failure_type,
            severity: failure_type.default_severity(),
            message: message.into(),
            url: None,
            expected_status: None,
            status_code: None,
            context: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_statuses(mut self, expected: u16, actual: Option<u16>) -> Self {
        self.expected_status = Some(expected);
        self.status_code = actual;
        self
    }

    /// Add context entry
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Override severity
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub const fn category(&self) -> FailureCategory {
        self.failure_type.category()
    }
}
