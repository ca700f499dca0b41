//! Resource schema lookup by definition name.

use crate::spec::{ApiDocument, ResourceSchema};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LocateError {
    #[error("schema '{name}' not found in API document (available: {})", available.join(", "))]
    NotFound { name: String, available: Vec<String> },
}

/// Look up a schema definition by name, e.g. `GameResource` or `Error`.
///
/// # Errors
///
/// `NotFound` listing the names the document does define.
pub fn find_schema<'a>(
    doc: &'a ApiDocument,
    name: &str,
) -> Result<&'a ResourceSchema, LocateError> {
    doc.schemas.get(name).ok_or_else(|| LocateError::NotFound {
        name: name.to_string(),
        available: doc.schemas.keys().cloned().collect(),
    })
}
