//! Severity levels for conformance failures
//!
//! Severity directly determines the process exit code

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Failure severity - maps directly to exit codes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational (exit 0)
    Info,
    /// Warning: document gap or slow response (exit 0, or 1 if strict)
    Warning,
    /// Error: contract or business assertion failed (exit 1)
    Error,
    /// Critical: timeout or connection failure (exit 2)
    Critical,
}

impl Severity {
    /// Convert severity to exit code
    #[must_use]
    pub const fn exit_code(self, strict: bool) -> i32 {
        match self {
            Self::Info => 0,
            Self::Warning if strict => 1,
            Self::Warning => 0,
            Self::Error => 1,
            Self::Critical => 2,
        }
    }

    /// Human-readable label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
