//! Test case driver: runs the catalog against the API and records outcomes.
//!
//! Tests run in catalog order, values in configuration order. Each value
//! becomes one [`CaseOutcome`]; nothing stops the run except `--failfast`.

pub mod assertions;
pub mod catalog;

use apiconform_core::{
    CaseOutcome, CaseValue, Failure, FailureType, RunReport, Severity, TestCaseSet,
};
use tracing::{debug, info, warn};

use crate::session::Session;
use crate::spec::ApiDocument;
use crate::verify::{CallWarning, VerifyError, VerifyErrorKind, verify};
use assertions::{AssertionFailure, AssertionKind};
use catalog::{Assertion, CATALOG, Step, TestPlan};

/// Prefix of fully qualified test names, as in `integration_tests.test_get_games`.
const TEST_PREFIX: &str = "integration_tests.";

/// Test selection from one runner argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestFilter {
    /// `integration_tests.<name>`: that test only
    Exact(String),
    /// Bare word: every test whose name contains it
    Contains(String),
}

impl TestFilter {
    #[must_use]
    pub fn matches(&self, test: &str) -> bool {
        match self {
            Self::Exact(name) => test == name,
            Self::Contains(part) => test.contains(part.as_str()),
        }
    }
}

impl std::fmt::Display for TestFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(name) => write!(f, "{TEST_PREFIX}{name}"),
            Self::Contains(part) => f.write_str(part),
        }
    }
}

/// Options taken from the runner arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop after the first failed or errored sub-case
    pub failfast: bool,
    /// Only run tests matching one of these
    pub filters: Vec<TestFilter>,
}

impl RunOptions {
    /// Parse runner arguments: `-f`/`--failfast` and test name filters.
    /// Unknown flags are ignored with a warning.
    #[must_use]
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        let mut options = Self::default();
        for arg in args.iter().map(AsRef::as_ref) {
            match arg {
                "-f" | "--failfast" => options.failfast = true,
                flag if flag.starts_with('-') => {
                    warn!(flag, "ignoring unknown runner flag");
                }
                "integration_tests" => {}
                name => options.filters.push(match name.strip_prefix(TEST_PREFIX) {
                    Some(exact) => TestFilter::Exact(exact.to_string()),
                    None => TestFilter::Contains(name.to_string()),
                }),
            }
        }
        options
    }

    #[must_use]
    pub fn selects(&self, test: &str) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|f| f.matches(test))
    }
}

/// Everything a run needs, passed explicitly.
pub struct RunContext<'a> {
    pub session: &'a Session,
    pub document: &'a ApiDocument,
    pub cases: &'a TestCaseSet,
    pub options: RunOptions,
}

pub struct Driver<'a> {
    ctx: RunContext<'a>,
}

impl<'a> Driver<'a> {
    #[must_use]
    pub const fn new(ctx: RunContext<'a>) -> Self {
        Self { ctx }
    }

    /// Run every selected test and collect the outcomes.
    #[must_use]
    pub fn run(&self) -> RunReport {
        let mut report = RunReport::new();

        for filter in &self.ctx.options.filters {
            if !CATALOG.iter().any(|p| filter.matches(p.test)) {
                warn!(filter = %filter, "no test matches filter");
            }
        }

        'run: for plan in CATALOG.iter().filter(|p| self.ctx.options.selects(p.test)) {
            info!(test = plan.test, "running");
            for step in plan.steps {
                for outcome in self.run_step(plan, step) {
                    let failed = report.record(outcome);
                    if failed && self.ctx.options.failfast {
                        report.stopped_early = true;
                        break 'run;
                    }
                }
            }
        }

        info!(
            total = report.total,
            passed = report.passed,
            failed = report.failed,
            errored = report.errored,
            "run finished"
        );
        report
    }

    /// Outcomes of one step, lazily, so failfast skips the remaining requests.
    fn run_step<'s>(
        &'s self,
        plan: &'s TestPlan,
        step: &'s Step,
    ) -> Box<dyn Iterator<Item = CaseOutcome> + 's> {
        let Some(values) = self.ctx.cases.get(step.case) else {
            if step.optional {
                warn!(test = plan.test, case = step.case, "case not configured, skipping");
                return Box::new(std::iter::empty());
            }
            let failure = Failure::new(
                FailureType::ConfigError,
                format!("case '{}' is missing from the configuration", step.case),
            )
            .with_context("test", plan.test);
            return Box::new(std::iter::once(CaseOutcome::new(
                plan.test,
                step.case,
                step.label,
                serde_json::Value::Null,
                vec![failure],
            )));
        };
        Box::new(
            values
                .iter()
                .map(move |value| self.run_value(plan, step, value)),
        )
    }

    fn run_value(&self, plan: &TestPlan, step: &Step, value: &CaseValue) -> CaseOutcome {
        let call = step.call(value);
        let failures = match verify(self.ctx.session, self.ctx.document, &call) {
            Ok(result) => {
                let mut failures = Vec::new();
                if step.assertion != Assertion::None {
                    let payload = result.payload.as_ref();
                    if let Some(Err(e)) =
                        payload.map(|p| assertions::check(step.assertion, step.case, value, p))
                    {
                        failures.push(assertion_failure(&e, &result.url));
                    }
                }
                failures.extend(
                    result
                        .warnings
                        .iter()
                        .map(|w| warning_failure(w, &result.url)),
                );
                failures
            }
            Err(e) => vec![verify_failure(&e)],
        };

        let outcome = CaseOutcome::new(plan.test, step.case, step.label, value.to_json(), failures);
        debug!(
            test = plan.test,
            case = step.case,
            value = %value,
            status = %outcome.status,
            "sub-case"
        );
        outcome
    }
}

/// Map a verifier error to a reportable failure.
#[must_use]
pub fn verify_failure(e: &VerifyError) -> Failure {
    let message = e.kind.to_string();
    let failure = match &e.kind {
        VerifyErrorKind::StatusMismatch {
            expected,
            actual,
            body,
        } => Failure::new(FailureType::StatusMismatch, message)
            .with_statuses(*expected, Some(*actual))
            .with_context("body", body.clone()),
        VerifyErrorKind::EnvelopeMalformed { reason, body } => {
            Failure::new(FailureType::EnvelopeMalformed, message)
                .with_context("reason", reason.clone())
                .with_context("body", body.clone())
        }
        VerifyErrorKind::SchemaViolation {
            property,
            expected,
            actual,
        } => Failure::new(FailureType::SchemaViolation, message)
            .with_context("property", property.clone())
            .with_context("expected", expected.clone())
            .with_context("actual", actual.clone()),
        VerifyErrorKind::SchemaNotFound(_) => Failure::new(FailureType::SchemaNotFound, message),
        VerifyErrorKind::Timeout { .. } => Failure::new(FailureType::Timeout, message),
        VerifyErrorKind::Connect(_) | VerifyErrorKind::Transport(_) => {
            Failure::new(FailureType::ConnectionError, message)
        }
    };
    failure.with_url(e.url.clone())
}

fn warning_failure(warning: &CallWarning, url: &str) -> Failure {
    let failure_type = match warning {
        CallWarning::StatusNotDeclared { .. } => FailureType::StatusNotDeclared,
        CallWarning::ResponseTimeExceeded { .. } => FailureType::ResponseTimeExceeded,
    };
    Failure::new(failure_type, warning.to_string())
        .with_severity(Severity::Warning)
        .with_url(url)
}

fn assertion_failure(e: &AssertionFailure, url: &str) -> Failure {
    let failure_type = match e.kind {
        AssertionKind::NoData => FailureType::NoData,
        AssertionKind::IdMismatch => FailureType::IdMismatch,
        AssertionKind::FilterMismatch => FailureType::FilterMismatch,
        AssertionKind::BoundaryViolation => FailureType::BoundaryViolation,
        AssertionKind::MembershipViolation => FailureType::MembershipViolation,
        AssertionKind::DateMismatch => FailureType::DateMismatch,
    };
    Failure::new(failure_type, e.message.clone()).with_url(url)
}
