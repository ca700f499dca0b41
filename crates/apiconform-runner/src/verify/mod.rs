//! Endpoint verification: one GET, checked against status, envelope and schema.

pub mod checks;

use std::fmt;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use crate::locate::{LocateError, find_schema};
use crate::session::Session;
use crate::spec::ApiDocument;

/// Bodies quoted in errors are cut at this many bytes.
const MAX_BODY_SNIPPET: usize = 512;

/// Ordered query parameters. A list value becomes one pair per element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: &str, values: impl IntoIterator<Item = String>) -> Self {
        self.0.extend(values.into_iter().map(|v| (name.to_string(), v)));
        self
    }

    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One endpoint invocation to verify.
#[derive(Debug, Clone)]
pub struct EndpointCall {
    /// Path below the base URL, e.g. `/games/7`
    pub path: String,
    /// Schema definition the body must match, e.g. `GameResource` or `Error`
    pub resource: String,
    pub expected_status: u16,
    pub query: QueryParams,
    /// Properties that may be `null` or absent regardless of the document.
    /// A bare name refers to `attributes`; a `/`-prefixed path is taken as is.
    pub nullable_fields: Vec<String>,
}

impl EndpointCall {
    #[must_use]
    pub fn new(path: impl Into<String>, resource: impl Into<String>, expected_status: u16) -> Self {
        Self {
            path: path.into(),
            resource: resource.into(),
            expected_status,
            query: QueryParams::new(),
            nullable_fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_nullable(mut self, fields: &[&str]) -> Self {
        self.nullable_fields = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }
}

/// Resource objects of a validated success body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    One(Value),
    Many(Vec<Value>),
}

impl Payload {
    #[must_use]
    pub fn items(&self) -> Vec<&Value> {
        match self {
            Self::One(v) => vec![v],
            Self::Many(items) => items.iter().collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Non-fatal findings of a call that otherwise conformed.
#[derive(Debug, Clone, PartialEq)]
pub enum CallWarning {
    /// The document does not declare the expected status for this operation
    StatusNotDeclared {
        status: u16,
        /// Matched path template; `None` when no operation matches the path
        operation: Option<String>,
    },
    ResponseTimeExceeded { elapsed: f64, limit: f64 },
}

impl fmt::Display for CallWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StatusNotDeclared {
                status,
                operation: Some(template),
            } => write!(f, "status {status} is not declared for GET {template}"),
            Self::StatusNotDeclared {
                status,
                operation: None,
            } => write!(f, "status {status} expected but no GET operation matches the path"),
            Self::ResponseTimeExceeded { elapsed, limit } => {
                write!(f, "response took {elapsed:.3}s (limit {limit:.3}s)")
            }
        }
    }
}

/// Outcome of a conforming call.
#[derive(Debug, Clone)]
pub struct EndpointCallResult {
    pub status: u16,
    /// Full request URL including the query string
    pub url: String,
    /// Seconds from send to body read
    pub elapsed: f64,
    /// Parsed body; `Null` when empty or not JSON on a response that needs no validation
    pub body: Value,
    /// Resource objects, present for success statuses with a body
    pub payload: Option<Payload>,
    pub warnings: Vec<CallWarning>,
}

/// A call that did not conform, with the URL to reproduce it.
#[derive(Debug, thiserror::Error)]
#[error("{kind} [GET {url}]")]
pub struct VerifyError {
    pub url: String,
    pub kind: VerifyErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyErrorKind {
    #[error("expected status {expected}, got {actual}: {body}")]
    StatusMismatch {
        expected: u16,
        actual: u16,
        body: String,
    },
    #[error("malformed response envelope: {reason}")]
    EnvelopeMalformed { reason: String, body: String },
    #[error("schema violation at '{property}': expected {expected}, got {actual}")]
    SchemaViolation {
        property: String,
        expected: String,
        actual: String,
    },
    #[error(transparent)]
    SchemaNotFound(#[from] LocateError),
    #[error("request timed out after {secs:.1}s")]
    Timeout { secs: f64 },
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Call an endpoint and check the response against the document.
///
/// # Errors
///
/// The first violation found: status, envelope, schema, or transport.
pub fn verify(
    session: &Session,
    doc: &ApiDocument,
    call: &EndpointCall,
) -> Result<EndpointCallResult, VerifyError> {
    let request = session
        .request(&call.path, call.query.pairs())
        .map_err(|e| VerifyError {
            url: session.url(&call.path),
            kind: VerifyErrorKind::Transport(error_chain(&e)),
        })?;
    let url = request.url().to_string();
    let fail = |kind| VerifyError {
        url: url.clone(),
        kind,
    };

    debug!(url = %url, expected = call.expected_status, resource = %call.resource, "GET");

    let start = Instant::now();
    let response = session
        .execute(request)
        .map_err(|e| fail(transport_kind(&e, session)))?;
    let status = response.status().as_u16();
    let text = response
        .text()
        .map_err(|e| fail(transport_kind(&e, session)))?;
    let elapsed = start.elapsed().as_secs_f64();

    debug!(url = %url, status, elapsed, "response");

    if status != call.expected_status {
        return Err(fail(VerifyErrorKind::StatusMismatch {
            expected: call.expected_status,
            actual: status,
            body: snippet(&text),
        }));
    }

    let parsed: Option<Value> = serde_json::from_str(&text).ok();
    let is_success = (200..300).contains(&status);

    let payload = if is_success && status != 204 {
        let body = parsed.as_ref().ok_or_else(|| {
            fail(VerifyErrorKind::EnvelopeMalformed {
                reason: "body is not JSON".into(),
                body: snippet(&text),
            })
        })?;
        let payload = checks::envelope(body).map_err(|reason| {
            fail(VerifyErrorKind::EnvelopeMalformed {
                reason,
                body: snippet(&text),
            })
        })?;
        let schema = find_schema(doc, &call.resource).map_err(|e| fail(e.into()))?;
        let relaxed = checks::relax(&schema.schema, &call.nullable_fields);
        checks::validate_payload(doc.strategy(), &relaxed, &payload).map_err(&fail)?;
        Some(payload)
    } else {
        if status >= 400 {
            checks::error_body(doc, &call.resource, parsed.as_ref(), &text).map_err(&fail)?;
        }
        None
    };

    let warnings = call_warnings(session, doc, call, elapsed);
    for warning in &warnings {
        warn!(url = %url, "{warning}");
    }

    Ok(EndpointCallResult {
        status,
        url,
        elapsed,
        body: parsed.unwrap_or(Value::Null),
        payload,
        warnings,
    })
}

fn call_warnings(
    session: &Session,
    doc: &ApiDocument,
    call: &EndpointCall,
    elapsed: f64,
) -> Vec<CallWarning> {
    let mut warnings = Vec::new();

    let operation = doc.operation("GET", &call.path);
    if !operation.is_some_and(|op| op.declares_status(call.expected_status)) {
        warnings.push(CallWarning::StatusNotDeclared {
            status: call.expected_status,
            operation: operation.map(|op| op.path.clone()),
        });
    }

    if let Some(limit) = session.response_time_limit() {
        if elapsed > limit {
            warnings.push(CallWarning::ResponseTimeExceeded { elapsed, limit });
        }
    }

    warnings
}

fn transport_kind(e: &reqwest::Error, session: &Session) -> VerifyErrorKind {
    if e.is_timeout() {
        VerifyErrorKind::Timeout {
            secs: session.timeout().as_secs_f64(),
        }
    } else if e.is_connect() {
        VerifyErrorKind::Connect(error_chain(e))
    } else {
        VerifyErrorKind::Transport(error_chain(e))
    }
}

/// Error message including its sources, e.g. `error sending request: connection refused`.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Truncate on a char boundary.
pub(crate) fn snippet(text: &str) -> String {
    if text.len() <= MAX_BODY_SNIPPET {
        return text.to_string();
    }
    let mut end = MAX_BODY_SNIPPET;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…({} bytes total)", &text[..end], text.len())
}
