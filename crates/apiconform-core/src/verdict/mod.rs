//! Verdict module - failure classification, severity, and policy

mod failure;
mod policy;
mod severity;

pub use failure::{Failure, FailureCategory, FailureType};
pub use policy::{TOOL_ERROR_EXIT, Verdict, VerdictPolicy, VerdictStatus};
pub use severity::Severity;
