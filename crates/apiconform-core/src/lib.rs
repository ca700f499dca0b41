//! apiconform-core: Config, test-case values and verdict logic
//!
//! This crate holds the types shared by the runner and the CLI: the decoded
//! run configuration, typed test-case values, per-case outcomes, and the
//! policy that turns outcomes into a pass/fail verdict and exit code.

pub mod cases;
pub mod config;
pub mod report;
pub mod verdict;

pub use cases::{CaseKind, CaseValue, Scalar, TestCaseSet};
pub use config::{AuthConfig, Config, ConfigError, RawConfig};
pub use report::{CaseOutcome, OutcomeStatus, RunReport};
pub use verdict::{
    Failure, FailureCategory, FailureType, Severity, Verdict, VerdictPolicy, VerdictStatus,
};
