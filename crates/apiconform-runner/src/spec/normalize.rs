//! Nullable normalization of resource schemas.
//!
//! Swagger `x-nullable: true`, OpenAPI 3.0 `nullable: true` and OpenAPI 3.1
//! `type: [..., "null"]` all become `{"anyOf": [<node>, {"type": "null"}]}`.

use serde_json::{Map, Value, json};

/// A named, `$ref`-free schema definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSchema {
    pub name: String,
    /// Normalized JSON Schema
    pub schema: Value,
}

impl ResourceSchema {
    #[must_use]
    pub fn new(name: &str, raw: &Value) -> Self {
        Self {
            name: name.to_string(),
            schema: normalize_node(raw),
        }
    }

    /// Whether the schema declares a top-level property.
    #[must_use]
    pub fn declares(&self, property: &str) -> bool {
        object_branch(&self.schema)
            .get("properties")
            .and_then(|p| p.get(property))
            .is_some()
    }
}

/// The non-null branch of a normalized nullable node, or the node itself.
pub(crate) fn object_branch(node: &Value) -> &Value {
    match nullable_inner(node) {
        Some(inner) => inner,
        None => node,
    }
}

/// For `{"anyOf": [inner, {"type": "null"}]}` returns `inner`.
pub(crate) fn nullable_inner(node: &Value) -> Option<&Value> {
    let branches = node.get("anyOf")?.as_array()?;
    if branches.len() != 2 || branches[1] != json!({"type": "null"}) {
        return None;
    }
    Some(&branches[0])
}

pub(crate) fn make_nullable(node: Value) -> Value {
    if nullable_inner(&node).is_some() {
        return node;
    }
    json!({"anyOf": [node, {"type": "null"}]})
}

fn normalize_node(node: &Value) -> Value {
    let Value::Object(obj) = node else {
        return node.clone();
    };

    let mut out = Map::with_capacity(obj.len());
    let mut is_nullable = false;

    for (key, value) in obj {
        match key.as_str() {
            "x-nullable" | "nullable" => {
                if value.as_bool() == Some(true) {
                    is_nullable = true;
                }
            }
            "type" => match value {
                Value::Array(types) if types.iter().any(|t| t == "null") => {
                    is_nullable = true;
                    let mut rest: Vec<Value> =
                        types.iter().filter(|t| *t != "null").cloned().collect();
                    match rest.len() {
                        0 => {}
                        1 => {
                            out.insert(key.clone(), rest.remove(0));
                        }
                        _ => {
                            out.insert(key.clone(), Value::Array(rest));
                        }
                    }
                }
                other => {
                    out.insert(key.clone(), other.clone());
                }
            },
            "properties" => {
                let props = match value {
                    Value::Object(props) => Value::Object(
                        props
                            .iter()
                            .map(|(name, schema)| (name.clone(), normalize_node(schema)))
                            .collect(),
                    ),
                    other => other.clone(),
                };
                out.insert(key.clone(), props);
            }
            "items" => {
                let items = match value {
                    Value::Array(list) => Value::Array(list.iter().map(normalize_node).collect()),
                    single => normalize_node(single),
                };
                out.insert(key.clone(), items);
            }
            "allOf" | "anyOf" | "oneOf" => {
                let branches = match value {
                    Value::Array(list) => Value::Array(list.iter().map(normalize_node).collect()),
                    other => other.clone(),
                };
                out.insert(key.clone(), branches);
            }
            "additionalProperties" | "not" => {
                out.insert(key.clone(), normalize_node(value));
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }

    if is_nullable {
        return make_nullable(Value::Object(out));
    }
    Value::Object(out)
}
