//! Response checks: JSON:API envelope, nullable relaxation, property walk and
//! full JSON Schema validation.

use serde_json::Value;

use super::{Payload, VerifyErrorKind, snippet};
use crate::spec::{ApiDocument, ValidationStrategy, make_nullable, nullable_inner, object_branch};

/// Extract the resource objects of a success body.
///
/// # Errors
///
/// A reason when the body is not `{"data": {...}}` or `{"data": [{...}, ...]}`.
pub fn envelope(body: &Value) -> Result<Payload, String> {
    let obj = body
        .as_object()
        .ok_or_else(|| format!("body is {}, not an object", type_name(body)))?;
    let data = obj
        .get("data")
        .ok_or_else(|| "missing top-level 'data'".to_string())?;
    match data {
        Value::Object(_) => Ok(Payload::One(data.clone())),
        Value::Array(items) => {
            if let Some(idx) = items.iter().position(|i| !i.is_object()) {
                return Err(format!(
                    "data[{idx}] is {}, not an object",
                    type_name(&items[idx])
                ));
            }
            Ok(Payload::Many(items.clone()))
        }
        other => Err(format!(
            "'data' is {}, expected an object or an array of objects",
            type_name(other)
        )),
    }
}

/// Copy of `schema` in which each named field accepts `null` and may be absent.
///
/// A bare name refers to `/attributes/<name>`. Unknown paths are ignored.
#[must_use]
pub fn relax(schema: &Value, fields: &[String]) -> Value {
    let mut relaxed = schema.clone();
    for field in fields {
        let path = if field.starts_with('/') {
            field.clone()
        } else {
            format!("/attributes/{field}")
        };
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        relax_path(&mut relaxed, &segments);
    }
    relaxed
}

fn relax_path(node: &mut Value, segments: &[&str]) {
    let node = object_branch_mut(node);
    match segments {
        [] => {}
        [last] => {
            if let Some(required) = node.get_mut("required").and_then(Value::as_array_mut) {
                required.retain(|r| r.as_str() != Some(*last));
            }
            if let Some(prop) = node.get_mut("properties").and_then(|p| p.get_mut(*last)) {
                let taken = std::mem::take(prop);
                *prop = make_nullable(taken);
            }
        }
        [head, rest @ ..] => {
            if let Some(child) = node.get_mut("properties").and_then(|p| p.get_mut(*head)) {
                relax_path(child, rest);
            }
        }
    }
}

fn object_branch_mut(node: &mut Value) -> &mut Value {
    if nullable_inner(node).is_some() {
        &mut node["anyOf"][0]
    } else {
        node
    }
}

/// Validate every resource object: property walk first, then the full schema.
///
/// # Errors
///
/// `SchemaViolation` naming the JSON path of the first offending property.
pub fn validate_payload(
    strategy: ValidationStrategy,
    schema: &Value,
    payload: &Payload,
) -> Result<(), VerifyErrorKind> {
    let validator = compile(strategy, schema)?;
    for (idx, item) in payload.items().into_iter().enumerate() {
        let base = match payload {
            Payload::One(_) => "/data".to_string(),
            Payload::Many(_) => format!("/data/{idx}"),
        };
        validate_value(&validator, schema, item, &base)?;
    }
    Ok(())
}

fn compile(
    strategy: ValidationStrategy,
    schema: &Value,
) -> Result<jsonschema::Validator, VerifyErrorKind> {
    strategy
        .compile(schema)
        .map_err(|e| VerifyErrorKind::SchemaViolation {
            property: "/".into(),
            expected: "a compilable schema".into(),
            actual: e,
        })
}

fn validate_value(
    validator: &jsonschema::Validator,
    schema: &Value,
    value: &Value,
    base: &str,
) -> Result<(), VerifyErrorKind> {
    walk(schema, value, base)?;
    if let Some(error) = validator.iter_errors(value).next() {
        return Err(VerifyErrorKind::SchemaViolation {
            property: base.to_string(),
            expected: "a value matching the schema".into(),
            actual: error.to_string(),
        });
    }
    Ok(())
}

/// Validate an error response body against the document's error schema.
///
/// The whole body is checked if the schema declares `errors`; otherwise each
/// element of `errors`. Without an error schema only the envelope is checked.
///
/// # Errors
///
/// `EnvelopeMalformed` for a body carrying `data` or lacking `errors`,
/// `SchemaViolation` for a mismatch.
pub fn error_body(
    doc: &ApiDocument,
    resource: &str,
    body: Option<&Value>,
    text: &str,
) -> Result<(), VerifyErrorKind> {
    let malformed = |reason: &str| VerifyErrorKind::EnvelopeMalformed {
        reason: reason.to_string(),
        body: snippet(text),
    };

    if body.and_then(|b| b.get("data")).is_some() {
        return Err(malformed("error response carries 'data'"));
    }

    let Some(schema) = doc
        .schemas
        .get(resource)
        .or_else(|| doc.schemas.get("Error"))
    else {
        return Ok(());
    };

    let body = body.ok_or_else(|| malformed("error body is not JSON"))?;
    let validator = compile(doc.strategy(), &schema.schema)?;

    if schema.declares("errors") {
        return validate_value(&validator, &schema.schema, body, "");
    }

    let errors = body
        .get("errors")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("missing 'errors' array"))?;
    for (idx, error) in errors.iter().enumerate() {
        validate_value(&validator, &schema.schema, error, &format!("/errors/{idx}"))?;
    }
    Ok(())
}

/// Structural walk: required properties present, declared types respected.
///
/// # Errors
///
/// `SchemaViolation` for the first offending property.
pub fn walk(schema: &Value, value: &Value, path: &str) -> Result<(), VerifyErrorKind> {
    if let Some(inner) = nullable_inner(schema) {
        return if value.is_null() {
            Ok(())
        } else {
            walk(inner, value, path)
        };
    }

    if let Some(branches) = schema.get("allOf").and_then(Value::as_array) {
        for branch in branches {
            walk(branch, value, path)?;
        }
    }

    for key in ["anyOf", "oneOf"] {
        if let Some(branches) = schema.get(key).and_then(Value::as_array) {
            if !branches.iter().any(|b| walk(b, value, path).is_ok()) {
                return Err(violation(
                    path,
                    format!("one of {} alternatives", branches.len()),
                    type_name(value).to_string(),
                ));
            }
        }
    }

    if let Some(declared) = schema.get("type") {
        let types: Vec<&str> = match declared {
            Value::String(t) => vec![t.as_str()],
            Value::Array(ts) => ts.iter().filter_map(Value::as_str).collect(),
            _ => vec![],
        };
        if !types.is_empty() && !types.iter().any(|t| type_matches(t, value)) {
            return Err(violation(
                path,
                types.join(" or "),
                type_name(value).to_string(),
            ));
        }
    }

    match value {
        Value::Object(obj) => {
            let schema = object_branch(schema);
            if let Some(required) = schema.get("required").and_then(Value::as_array) {
                for name in required.iter().filter_map(Value::as_str) {
                    if !obj.contains_key(name) {
                        return Err(violation(
                            &format!("{path}/{name}"),
                            "required property".into(),
                            "absent".into(),
                        ));
                    }
                }
            }
            if let Some(props) = schema.get("properties").and_then(Value::as_object) {
                for (name, sub) in props {
                    if let Some(child) = obj.get(name) {
                        walk(sub, child, &format!("{path}/{name}"))?;
                    }
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items").filter(|s| s.is_object()) {
                for (idx, item) in items.iter().enumerate() {
                    walk(item_schema, item, &format!("{path}/{idx}"))?;
                }
            }
        }
        _ => {}
    }

    Ok(())
}

fn violation(path: &str, expected: String, actual: String) -> VerifyErrorKind {
    VerifyErrorKind::SchemaViolation {
        property: if path.is_empty() { "/".into() } else { path.to_string() },
        expected,
        actual,
    }
}

fn type_matches(declared: &str, value: &Value) -> bool {
    match declared {
        "null" => value.is_null(),
        "boolean" => value.is_boolean(),
        "string" => value.is_string(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "number" => value.is_number(),
        "integer" => {
            value.is_i64()
                || value.is_u64()
                || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
