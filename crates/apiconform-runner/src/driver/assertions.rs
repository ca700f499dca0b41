//! Business assertions on validated payloads.

use std::collections::BTreeSet;

use apiconform_core::CaseValue;
use apiconform_core::cases::parse_date;
use serde_json::Value;

use super::catalog::Assertion;
use crate::verify::Payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionKind {
    NoData,
    IdMismatch,
    FilterMismatch,
    BoundaryViolation,
    MembershipViolation,
    DateMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AssertionFailure {
    pub kind: AssertionKind,
    pub message: String,
}

impl AssertionFailure {
    fn new(kind: AssertionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Apply `assertion` for one configured value.
///
/// # Errors
///
/// The first row that breaks the rule, or `NoData` for an empty filtered result.
pub fn check(
    assertion: Assertion,
    case: &str,
    value: &CaseValue,
    payload: &Payload,
) -> Result<(), AssertionFailure> {
    match assertion {
        Assertion::None => Ok(()),
        Assertion::IdEcho => id_echo(value, payload),
        Assertion::Equals(field) => {
            data_returned(case, payload)?;
            let expected = value.as_text();
            for_each_row(payload, field, |actual, idx| {
                if canonical_text(actual).as_deref() == Some(expected.as_str()) {
                    Ok(())
                } else {
                    Err(AssertionFailure::new(
                        AssertionKind::FilterMismatch,
                        format!("data[{idx}].attributes.{field} is {actual}, expected {expected}"),
                    ))
                }
            })
        }
        Assertion::AtLeast(field) => {
            data_returned(case, payload)?;
            bound(value, payload, field, |actual, limit| actual >= limit, ">=")
        }
        Assertion::AtMost(field) => {
            data_returned(case, payload)?;
            bound(value, payload, field, |actual, limit| actual <= limit, "<=")
        }
        Assertion::MemberOf(field) => {
            data_returned(case, payload)?;
            let allowed: BTreeSet<String> = value.query_values().into_iter().collect();
            for_each_row(payload, field, |actual, idx| {
                match canonical_text(actual) {
                    Some(text) if allowed.contains(&text) => Ok(()),
                    _ => Err(AssertionFailure::new(
                        AssertionKind::MembershipViolation,
                        format!("data[{idx}].attributes.{field} is {actual}, not in {value}"),
                    )),
                }
            })
        }
        Assertion::SameDate(field) => {
            data_returned(case, payload)?;
            same_date(value, payload, field)
        }
    }
}

fn data_returned(case: &str, payload: &Payload) -> Result<(), AssertionFailure> {
    if payload.is_empty() {
        return Err(AssertionFailure::new(
            AssertionKind::NoData,
            format!(
                "No data returned from server. Check that '{case}' in the configuration contains valid data."
            ),
        ));
    }
    Ok(())
}

fn id_echo(value: &CaseValue, payload: &Payload) -> Result<(), AssertionFailure> {
    let expected = value.as_text();
    for item in payload.items() {
        let actual = item.get("id").unwrap_or(&Value::Null);
        if canonical_text(actual).as_deref() != Some(expected.as_str()) {
            return Err(AssertionFailure::new(
                AssertionKind::IdMismatch,
                format!("returned id {actual}, requested {expected}"),
            ));
        }
    }
    Ok(())
}

fn bound(
    value: &CaseValue,
    payload: &Payload,
    field: &str,
    holds: impl Fn(f64, f64) -> bool,
    op: &str,
) -> Result<(), AssertionFailure> {
    let Some(limit) = value.as_f64() else {
        return Err(AssertionFailure::new(
            AssertionKind::BoundaryViolation,
            format!("configured bound {value} is not numeric"),
        ));
    };
    for_each_row(payload, field, |actual, idx| match actual.as_f64() {
        Some(n) if holds(n, limit) => Ok(()),
        _ => Err(AssertionFailure::new(
            AssertionKind::BoundaryViolation,
            format!("data[{idx}].attributes.{field} is {actual}, expected {op} {value}"),
        )),
    })
}

fn same_date(value: &CaseValue, payload: &Payload, field: &str) -> Result<(), AssertionFailure> {
    let CaseValue::Date {
        raw,
        date: Some(expected),
    } = value
    else {
        return Err(AssertionFailure::new(
            AssertionKind::DateMismatch,
            format!("configured value {value} is not a YYYY-MM-DD date"),
        ));
    };
    for_each_row(payload, field, |actual, idx| {
        match actual.as_str().and_then(parse_date) {
            Some(date) if date == *expected => Ok(()),
            _ => Err(AssertionFailure::new(
                AssertionKind::DateMismatch,
                format!("data[{idx}].attributes.{field} is {actual}, expected {raw}"),
            )),
        }
    })
}

fn for_each_row(
    payload: &Payload,
    field: &str,
    mut check: impl FnMut(&Value, usize) -> Result<(), AssertionFailure>,
) -> Result<(), AssertionFailure> {
    for (idx, item) in payload.items().into_iter().enumerate() {
        let actual = item
            .get("attributes")
            .and_then(|a| a.get(field))
            .unwrap_or(&Value::Null);
        check(actual, idx)?;
    }
    Ok(())
}

/// Text form used for equality: JSON:API ids are strings, configs may hold numbers.
fn canonical_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiconform_core::Scalar;
    use serde_json::json;

    fn int(i: i64) -> CaseValue {
        CaseValue::Scalar(Scalar::Integer(i))
    }

    fn text(s: &str) -> CaseValue {
        CaseValue::Scalar(Scalar::Text(s.into()))
    }

    fn date(raw: &str) -> CaseValue {
        CaseValue::Date {
            raw: raw.into(),
            date: parse_date(raw),
        }
    }

    fn rows(attributes: &[Value]) -> Payload {
        Payload::Many(
            attributes
                .iter()
                .enumerate()
                .map(|(i, a)| json!({"id": i.to_string(), "type": "row", "attributes": a}))
                .collect(),
        )
    }

    fn kind(result: Result<(), AssertionFailure>) -> AssertionKind {
        result.unwrap_err().kind
    }

    #[test]
    fn id_echo_compares_canonical_text() {
        let payload = Payload::One(json!({"id": "7"}));
        assert!(check(Assertion::IdEcho, "valid_game_ids", &int(7), &payload).is_ok());
        assert!(check(Assertion::IdEcho, "valid_game_ids", &text("7"), &payload).is_ok());
        assert_eq!(
            kind(check(Assertion::IdEcho, "valid_game_ids", &int(8), &payload)),
            AssertionKind::IdMismatch
        );
    }

    #[test]
    fn empty_result_is_no_data() {
        let err = check(Assertion::Equals("name"), "game_names", &text("Tetris"), &rows(&[]))
            .unwrap_err();
        assert_eq!(err.kind, AssertionKind::NoData);
        assert!(err.message.contains("'game_names'"));
    }

    #[test]
    fn equals_every_row() {
        let ok = rows(&[json!({"name": "Tetris"}), json!({"name": "Tetris"})]);
        assert!(check(Assertion::Equals("name"), "game_names", &text("Tetris"), &ok).is_ok());
        let bad = rows(&[json!({"name": "Tetris"}), json!({"name": "Doom"})]);
        let err = check(Assertion::Equals("name"), "game_names", &text("Tetris"), &bad)
            .unwrap_err();
        assert_eq!(err.kind, AssertionKind::FilterMismatch);
        assert!(err.message.contains("data[1]"));
    }

    #[test]
    fn equals_numeric_filter_against_string_attribute() {
        let payload = rows(&[json!({"developerId": "3"})]);
        assert!(
            check(Assertion::Equals("developerId"), "game_developer_ids", &int(3), &payload).is_ok()
        );
    }

    #[test]
    fn bounds() {
        let payload = rows(&[json!({"score": 50}), json!({"score": 80})]);
        assert!(check(Assertion::AtLeast("score"), "scores", &int(50), &payload).is_ok());
        assert!(check(Assertion::AtMost("score"), "scores", &int(80), &payload).is_ok());
        assert_eq!(
            kind(check(Assertion::AtLeast("score"), "scores", &int(60), &payload)),
            AssertionKind::BoundaryViolation
        );
        assert_eq!(
            kind(check(Assertion::AtMost("score"), "scores", &text("70"), &payload)),
            AssertionKind::BoundaryViolation
        );
    }

    #[test]
    fn null_score_breaks_bound() {
        let payload = rows(&[json!({"score": null})]);
        assert_eq!(
            kind(check(Assertion::AtLeast("score"), "scores", &int(0), &payload)),
            AssertionKind::BoundaryViolation
        );
    }

    #[test]
    fn membership_uses_set_semantics() {
        let value = CaseValue::List(vec![Scalar::Text("1".into()), Scalar::Integer(2)]);
        let payload = rows(&[json!({"gameId": "2"}), json!({"gameId": 1}), json!({"gameId": "2"})]);
        assert!(check(Assertion::MemberOf("gameId"), "review_game_ids", &value, &payload).is_ok());
        let bad = rows(&[json!({"gameId": "3"})]);
        assert_eq!(
            kind(check(Assertion::MemberOf("gameId"), "review_game_ids", &value, &bad)),
            AssertionKind::MembershipViolation
        );
    }

    #[test]
    fn dates_compare_by_calendar_day() {
        let payload = rows(&[json!({"reviewDate": "2020-1-2"})]);
        assert!(
            check(
                Assertion::SameDate("reviewDate"),
                "review_review_dates",
                &date("2020-01-02"),
                &payload
            )
            .is_ok()
        );
        assert_eq!(
            kind(check(
                Assertion::SameDate("reviewDate"),
                "review_review_dates",
                &date("2020-01-03"),
                &payload
            )),
            AssertionKind::DateMismatch
        );
    }

    #[test]
    fn unparsable_configured_date_is_mismatch() {
        let payload = rows(&[json!({"reviewDate": "2020-01-02"})]);
        assert_eq!(
            kind(check(
                Assertion::SameDate("reviewDate"),
                "review_review_dates",
                &date("01/02/2020"),
                &payload
            )),
            AssertionKind::DateMismatch
        );
    }

    #[test]
    fn none_always_passes() {
        assert!(check(Assertion::None, "invalid_game_ids", &text("x"), &rows(&[])).is_ok());
    }
}
