//! Run report: one outcome per (test, case, value), in execution order

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::verdict::{Failure, FailureCategory, Severity};

/// Result of one sub-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Passed,
    /// Contract or business assertion failed
    Failed,
    /// Transport or configuration problem; the API contract was not exercised
    Errored,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "ok"),
            Self::Failed => write!(f, "FAIL"),
            Self::Errored => write!(f, "ERROR"),
        }
    }
}

/// Outcome of calling one endpoint with one configured value.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CaseOutcome {
    /// Test name, e.g. "test_get_games"
    pub test: String,
    /// Case set name, e.g. "scores"
    pub case: String,
    /// Short description of the sub-case, e.g. "scoreMin query parameter"
    pub label: String,
    /// The literal config value used
    pub value: serde_json::Value,
    pub status: OutcomeStatus,
    /// Blocking failure first, then warnings
    #[serde(default)]
    pub failures: Vec<Failure>,
}

impl CaseOutcome {
    /// Build an outcome, deriving its status from the failures.
    #[must_use]
    pub fn new(
        test: impl Into<String>,
        case: impl Into<String>,
        label: impl Into<String>,
        value: serde_json::Value,
        failures: Vec<Failure>,
    ) -> Self {
        let status = classify(&failures);
        Self {
            test: test.into(),
            case: case.into(),
            label: label.into(),
            value,
            status,
            failures,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Passed
    }
}

fn classify(failures: &[Failure]) -> OutcomeStatus {
    let blocking = failures.iter().filter(|f| f.severity >= Severity::Error);
    let mut status = OutcomeStatus::Passed;
    for f in blocking {
        match f.category() {
            FailureCategory::Transport | FailureCategory::Config => {
                return OutcomeStatus::Errored;
            }
            FailureCategory::Contract | FailureCategory::Business => {
                status = OutcomeStatus::Failed;
            }
        }
    }
    status
}

/// Complete run report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RunReport {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub errored: u64,
    /// Outcomes in execution order
    pub outcomes: Vec<CaseOutcome>,
    /// Run stopped at the first failure (`--failfast`)
    #[serde(default)]
    pub stopped_early: bool,
}

impl RunReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outcome. Returns `true` if it did not pass.
    pub fn record(&mut self, outcome: CaseOutcome) -> bool {
        self.total += 1;
        match outcome.status {
            OutcomeStatus::Passed => self.passed += 1,
            OutcomeStatus::Failed => self.failed += 1,
            OutcomeStatus::Errored => self.errored += 1,
        }
        let failed = !outcome.is_success();
        self.outcomes.push(outcome);
        failed
    }

    /// All failures (including warnings), in execution order.
    pub fn failures(&self) -> impl Iterator<Item = &Failure> {
        self.outcomes.iter().flat_map(|o| o.failures.iter())
    }
}

/// Generate JSON Schema for the run report.
#[must_use]
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(RunReport);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
