//! API document resolution: load a Swagger/OpenAPI document, detect its dialect,
//! inline every `$ref`, and normalize resource schemas to one shape.

mod normalize;
mod operations;
mod refs;

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

pub use normalize::ResourceSchema;
pub(crate) use normalize::{make_nullable, nullable_inner, object_branch};
pub use operations::Operation;

/// API description dialect, decided once from the document's top-level marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Swagger 2.x (`swagger:` key)
    Swagger,
    /// OpenAPI 3.x (`openapi:` key)
    OpenApiV3 { minor: u32 },
}

impl Dialect {
    /// Detect the dialect from the top-level `swagger` / `openapi` key.
    ///
    /// # Errors
    ///
    /// `DialectUnknown` if neither key is present.
    pub fn detect(doc: &Value) -> Result<Self, ResolveError> {
        if doc.get("swagger").is_some() {
            return Ok(Self::Swagger);
        }
        if let Some(version) = doc.get("openapi") {
            let version = match version {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let minor = version
                .split('.')
                .nth(1)
                .and_then(|m| m.parse().ok())
                .unwrap_or(0);
            return Ok(Self::OpenApiV3 { minor });
        }
        Err(ResolveError::DialectUnknown)
    }

    /// Validation strategy for schemas from this dialect.
    #[must_use]
    pub const fn strategy(self) -> ValidationStrategy {
        match self {
            Self::Swagger => ValidationStrategy {
                draft: jsonschema::Draft::Draft4,
                lenient: true,
            },
            Self::OpenApiV3 { minor } if minor >= 1 => ValidationStrategy {
                draft: jsonschema::Draft::Draft202012,
                lenient: false,
            },
            Self::OpenApiV3 { .. } => ValidationStrategy {
                draft: jsonschema::Draft::Draft4,
                lenient: false,
            },
        }
    }

    fn schemas_pointer(self) -> &'static str {
        match self {
            Self::Swagger => "/definitions",
            Self::OpenApiV3 { .. } => "/components/schemas",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Swagger => write!(f, "swagger 2"),
            Self::OpenApiV3 { minor } => write!(f, "openapi 3.{minor}"),
        }
    }
}

/// How resource bodies are checked against their schema.
///
/// Swagger documents get a lenient, structural check: `additionalProperties`
/// constraints are dropped. OpenAPI documents are validated as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationStrategy {
    pub draft: jsonschema::Draft,
    pub lenient: bool,
}

impl ValidationStrategy {
    /// Compile a validator for `schema`.
    ///
    /// Format assertions are disabled: only structure and types are checked.
    ///
    /// # Errors
    ///
    /// Returns the compiler's message if the schema is not valid JSON Schema.
    pub fn compile(&self, schema: &Value) -> Result<jsonschema::Validator, String> {
        let prepared = if self.lenient {
            strip_additional_properties(schema)
        } else {
            schema.clone()
        };
        jsonschema::options()
            .with_draft(self.draft)
            .should_validate_formats(false)
            .build(&prepared)
            .map_err(|e| e.to_string())
    }
}

fn strip_additional_properties(schema: &Value) -> Value {
    match schema {
        Value::Object(obj) => Value::Object(
            obj.iter()
                .filter(|(k, _)| k.as_str() != "additionalProperties")
                .map(|(k, v)| (k.clone(), strip_additional_properties(v)))
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.iter().map(strip_additional_properties).collect()),
        other => other.clone(),
    }
}

/// Fully resolved API document. Read-only after [`resolve`].
#[derive(Debug, Clone)]
pub struct ApiDocument {
    pub dialect: Dialect,
    /// Schema definitions keyed by name, `$ref`-free and nullable-normalized
    pub schemas: BTreeMap<String, ResourceSchema>,
    pub operations: Vec<Operation>,
}

impl ApiDocument {
    /// Build from an already-parsed document. External refs resolve relative to `origin`.
    ///
    /// # Errors
    ///
    /// Unknown dialect or unresolvable/circular references.
    pub fn from_value(doc: Value, origin: &Path) -> Result<Self, ResolveError> {
        let dialect = Dialect::detect(&doc)?;
        let resolved = refs::RefResolver::new(origin, doc).resolve_root()?;

        let schemas = resolved
            .pointer(dialect.schemas_pointer())
            .and_then(Value::as_object)
            .map(|defs| {
                defs.iter()
                    .map(|(name, schema)| (name.clone(), ResourceSchema::new(name, schema)))
                    .collect()
            })
            .unwrap_or_default();

        let operations = operations::extract_operations(&resolved);

        Ok(Self {
            dialect,
            schemas,
            operations,
        })
    }

    /// Find the operation whose path template matches a concrete path.
    /// Literal segments win over templated ones.
    #[must_use]
    pub fn operation(&self, method: &str, path: &str) -> Option<&Operation> {
        self.operations
            .iter()
            .filter(|op| op.method.eq_ignore_ascii_case(method) && op.matches(path))
            .min_by_key(|op| op.template_segments())
    }

    #[must_use]
    pub fn strategy(&self) -> ValidationStrategy {
        self.dialect.strategy()
    }
}

/// Load, parse and fully resolve an API document.
///
/// # Errors
///
/// Any [`ResolveError`]; all of them are fatal for a run.
pub fn resolve(path: &Path) -> Result<ApiDocument, ResolveError> {
    let doc = load_document(path)?;
    ApiDocument::from_value(doc, path)
}

pub(crate) fn load_document(path: &Path) -> Result<Value, ResolveError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ResolveError::Io(format!("{}: {e}", path.display())))?;
    parse_spec(path, &content)
}

/// Parse an API document from JSON or YAML.
///
/// Detection strategy: try extension first (`.yaml`/`.yml`/`.json`), then fall
/// back to content sniffing (leading `{` → JSON, otherwise YAML).
pub(crate) fn parse_spec(path: &Path, content: &str) -> Result<Value, ResolveError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let as_yaml = |c: &str| {
        serde_yml::from_str(c).map_err(|e| ResolveError::Parse(format!("Invalid YAML: {e}")))
    };
    let as_json = |c: &str| {
        serde_json::from_str(c).map_err(|e| ResolveError::Parse(format!("Invalid JSON: {e}")))
    };

    match ext.as_str() {
        "yaml" | "yml" => as_yaml(content),
        "json" => as_json(content),
        _ if content.trim_start().starts_with('{') => as_json(content),
        _ => as_yaml(content),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("could not determine API document version: no top-level 'swagger' or 'openapi' key")]
    DialectUnknown,
    #[error("unresolvable reference '{0}'")]
    RefNotFound(String),
    #[error("circular reference '{0}'")]
    CircularRef(String),
}
