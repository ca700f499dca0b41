//! Verdict policy - determines how failures are filtered and judged

use super::{Failure, FailureType, Severity};
use crate::report::RunReport;

/// Exit code for tool errors: fatal config, or nothing executed.
pub const TOOL_ERROR_EXIT: i32 = 3;

/// Policy for filtering and judging failures
#[derive(Debug, Clone)]
pub struct VerdictPolicy {
    /// Strict mode: warnings become errors
    pub strict: bool,
    /// Failure types to ignore
    pub ignore_failure_types: Vec<FailureType>,
    /// Minimum severity to report (below this = ignored)
    pub min_severity: Severity,
}

impl Default for VerdictPolicy {
    fn default() -> Self {
        Self {
            strict: true,
            ignore_failure_types: vec![],
            min_severity: Severity::Warning,
        }
    }
}

impl VerdictPolicy {
    /// Failures of the report that this policy reports, in execution order
    #[must_use]
    pub fn filter<'a>(&self, report: &'a RunReport) -> Vec<&'a Failure> {
        report.failures().filter(|f| self.should_report(f)).collect()
    }

    fn should_report(&self, failure: &Failure) -> bool {
        !self.ignore_failure_types.contains(&failure.failure_type)
            && failure.severity >= self.min_severity
    }

    /// Highest exit code among reported failures.
    #[must_use]
    pub fn exit_code(&self, failures: &[&Failure]) -> i32 {
        failures
            .iter()
            .map(|f| f.severity.exit_code(self.strict))
            .max()
            .unwrap_or(0)
    }

    /// Determine verdict for a finished run.
    ///
    /// PASS requires at least one executed sub-case and no reported failure
    /// whose severity maps to a non-zero exit code.
    #[must_use]
    pub fn verdict(&self, report: &RunReport) -> Verdict {
        if report.total == 0 {
            return Verdict {
                status: VerdictStatus::Fail,
                exit_code: TOOL_ERROR_EXIT,
                reason: "No test cases were executed".to_string(),
            };
        }

        let reported = self.filter(report);
        let exit_code = self.exit_code(&reported);

        if exit_code == 0 {
            return Verdict {
                status: VerdictStatus::Pass,
                exit_code,
                reason: format!("All {} cases passed", report.total),
            };
        }

        let count = |s: Severity| reported.iter().filter(|f| f.severity == s).count();
        let mut parts = vec![format!(
            "{} failed, {} errored of {}",
            report.failed, report.errored, report.total
        )];
        parts.push(format!(
            "{} failures ({} critical, {} error, {} warning)",
            reported.len(),
            count(Severity::Critical),
            count(Severity::Error),
            count(Severity::Warning)
        ));
        if report.stopped_early {
            parts.push("stopped early".to_string());
        }

        Verdict {
            status: VerdictStatus::Fail,
            exit_code,
            reason: parts.join("; "),
        }
    }
}

/// Final verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub exit_code: i32,
    pub reason: String,
}

/// Pass or fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictStatus {
    Pass,
    Fail,
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}
