//! Test-case values decoded from configuration
//!
//! Raw config values are loosely typed JSON (ints, strings, lists). Each case
//! name is declared in [`CASE_SCHEMA`] with a [`CaseKind`], and values are
//! decoded against that kind once, at load time.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde_json::Value;

use crate::config::ConfigError;

/// Calendar date format used by the date filters.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Declared shape of the values in one case set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseKind {
    /// A single integer or string
    Scalar,
    /// A list of scalars, sent as a repeated query parameter
    List,
    /// A calendar date string
    Date,
    /// A deliberately malformed date: a string, or a number or boolean kept as text
    MalformedDate,
    /// Scalar or list; used for malformed-input cases
    Any,
}

/// Every case name the harness understands, with the kind of its values.
pub const CASE_SCHEMA: &[(&str, CaseKind)] = &[
    ("valid_developer_ids", CaseKind::Scalar),
    ("non_existant_developer_ids", CaseKind::Scalar),
    ("invalid_developer_ids", CaseKind::Scalar),
    ("developer_names", CaseKind::Scalar),
    ("valid_game_ids", CaseKind::Scalar),
    ("non_existant_game_ids", CaseKind::Scalar),
    ("invalid_game_ids", CaseKind::Scalar),
    ("game_names", CaseKind::Scalar),
    ("game_developer_ids", CaseKind::Scalar),
    ("scores", CaseKind::Scalar),
    ("valid_review_ids", CaseKind::Scalar),
    ("non_existant_review_ids", CaseKind::Scalar),
    ("invalid_review_ids", CaseKind::Scalar),
    ("reviewer_names", CaseKind::Scalar),
    ("review_game_ids", CaseKind::List),
    ("review_invalid_game_id_formats", CaseKind::Any),
    ("review_review_dates", CaseKind::Date),
    ("review_invalid_date_formats", CaseKind::MalformedDate),
];

/// Look up the declared kind of a case name.
#[must_use]
pub fn case_kind(name: &str) -> Option<CaseKind> {
    CASE_SCHEMA
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, k)| *k)
}

/// A single literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl Scalar {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Number)),
            Value::Bool(b) => Some(Self::Text(b.to_string())),
            _ => None,
        }
    }

    /// Canonical text form, as sent on the wire and compared against ids.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Integer(i) => i.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    /// Numeric view; text is parsed (`"50"` → 50.0).
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Integer(i) => Some(*i as f64),
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Integer(i) => Value::from(*i),
            Self::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// One configured test value, typed according to its [`CaseKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum CaseValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
    /// `date` is `None` when `raw` is not a valid `YYYY-MM-DD` date.
    Date {
        raw: String,
        date: Option<NaiveDate>,
    },
}

impl CaseValue {
    /// Decode one raw config value against its declared kind.
    ///
    /// # Errors
    ///
    /// Returns a reason string when the value does not fit the kind.
    pub fn decode(kind: CaseKind, value: &Value) -> Result<Self, String> {
        match (kind, value) {
            (CaseKind::List | CaseKind::Any, Value::Array(items)) => items
                .iter()
                .map(|item| {
                    Scalar::from_json(item)
                        .ok_or_else(|| format!("list element {item} is not a scalar"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            (CaseKind::List, other) => Err(format!("expected a list, got {other}")),
            (CaseKind::Date | CaseKind::MalformedDate, Value::String(raw)) => Ok(Self::Date {
                raw: raw.clone(),
                date: parse_date(raw),
            }),
            (CaseKind::MalformedDate, Value::Number(_) | Value::Bool(_)) => Ok(Self::Date {
                raw: value.to_string(),
                date: None,
            }),
            (CaseKind::Date | CaseKind::MalformedDate, other) => {
                Err(format!("expected a date string, got {other}"))
            }
            (CaseKind::Scalar | CaseKind::Any, other) => Scalar::from_json(other)
                .map(Self::Scalar)
                .ok_or_else(|| format!("expected an integer or string, got {other}")),
        }
    }

    /// Values to send for this case, in order. Lists expand to one entry per element.
    #[must_use]
    pub fn query_values(&self) -> Vec<String> {
        match self {
            Self::Scalar(s) => vec![s.as_text()],
            Self::List(items) => items.iter().map(Scalar::as_text).collect(),
            Self::Date { raw, .. } => vec![raw.clone()],
        }
    }

    /// Text used when the value is a path segment or compared as a single value.
    #[must_use]
    pub fn as_text(&self) -> String {
        self.query_values().join(",")
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Scalar(s) => s.as_f64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(s) => s.to_json(),
            Self::List(items) => Value::Array(items.iter().map(Scalar::to_json).collect()),
            Self::Date { raw, .. } => Value::String(raw.clone()),
        }
    }
}

impl fmt::Display for CaseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(Scalar::as_text).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            other => f.write_str(&other.as_text()),
        }
    }
}

/// Parse a `YYYY-MM-DD` date. Zero padding is optional (`2020-1-2` parses).
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// All configured case sets, decoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestCaseSet {
    cases: BTreeMap<String, Vec<CaseValue>>,
}

impl TestCaseSet {
    /// Decode raw config values against [`CASE_SCHEMA`].
    ///
    /// # Errors
    ///
    /// Unknown case names and values that do not fit their kind are rejected.
    pub fn decode(raw: &BTreeMap<String, Vec<Value>>) -> Result<Self, ConfigError> {
        let mut cases = BTreeMap::new();
        for (name, values) in raw {
            let kind = case_kind(name).ok_or_else(|| ConfigError::UnknownCase(name.clone()))?;
            let decoded = values
                .iter()
                .enumerate()
                .map(|(index, v)| {
                    CaseValue::decode(kind, v).map_err(|reason| ConfigError::CaseValue {
                        case: name.clone(),
                        index,
                        reason,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            cases.insert(name.clone(), decoded);
        }
        Ok(Self { cases })
    }

    /// Values for a case, in config order. `None` if the case is not configured.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[CaseValue]> {
        self.cases.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}
