//! `$ref` dereferencing for internal pointers and external files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::{ResolveError, parse_spec};

/// Inlines every `$ref` of a document.
///
/// External documents are loaded relative to the file that references them
/// and cached by canonical path. A reference met again while it is still
/// being expanded is a cycle.
pub(super) struct RefResolver {
    root: PathBuf,
    files: HashMap<PathBuf, Value>,
    stack: Vec<String>,
}

impl RefResolver {
    pub(super) fn new(origin: &Path, doc: Value) -> Self {
        let root = canonical(origin);
        let mut files = HashMap::new();
        files.insert(root.clone(), doc);
        Self {
            root,
            files,
            stack: Vec::new(),
        }
    }

    /// Expand the root document.
    pub(super) fn resolve_root(mut self) -> Result<Value, ResolveError> {
        let root = self.root.clone();
        let doc = self.files.get(&root).cloned().unwrap_or(Value::Null);
        self.expand(&doc, &root)
    }

    fn expand(&mut self, node: &Value, file: &Path) -> Result<Value, ResolveError> {
        match node {
            Value::Object(obj) => {
                if let Some(Value::String(reference)) = obj.get("$ref") {
                    let expanded = self.follow(reference, file)?;
                    return self.merge_siblings(expanded, obj, file);
                }
                let mut out = Map::with_capacity(obj.len());
                for (key, value) in obj {
                    out.insert(key.clone(), self.expand(value, file)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|v| self.expand(v, file))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    /// Keys written next to a `$ref` (e.g. `x-nullable`) override the target's.
    fn merge_siblings(
        &mut self,
        expanded: Value,
        obj: &Map<String, Value>,
        file: &Path,
    ) -> Result<Value, ResolveError> {
        if obj.len() == 1 {
            return Ok(expanded);
        }
        let Value::Object(mut merged) = expanded else {
            return Ok(expanded);
        };
        for (key, value) in obj.iter().filter(|(k, _)| k.as_str() != "$ref") {
            merged.insert(key.clone(), self.expand(value, file)?);
        }
        Ok(Value::Object(merged))
    }

    fn follow(&mut self, reference: &str, file: &Path) -> Result<Value, ResolveError> {
        let (file_part, pointer) = reference.split_once('#').unwrap_or((reference, ""));
        let target_file = if file_part.is_empty() {
            file.to_path_buf()
        } else {
            let dir = file.parent().unwrap_or_else(|| Path::new("."));
            canonical(&dir.join(file_part))
        };

        let key = format!("{}#{pointer}", target_file.display());
        if self.stack.contains(&key) {
            return Err(ResolveError::CircularRef(reference.to_string()));
        }

        self.load(&target_file, reference)?;
        let target = self
            .files
            .get(&target_file)
            .and_then(|doc| {
                if pointer.is_empty() {
                    Some(doc)
                } else {
                    doc.pointer(pointer)
                }
            })
            .cloned()
            .ok_or_else(|| ResolveError::RefNotFound(reference.to_string()))?;

        self.stack.push(key);
        let result = self.expand(&target, &target_file);
        self.stack.pop();
        result
    }

    fn load(&mut self, path: &Path, reference: &str) -> Result<(), ResolveError> {
        if self.files.contains_key(path) {
            return Ok(());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ResolveError::RefNotFound(format!("{reference} ({e})")))?;
        let doc = parse_spec(path, &content)?;
        self.files.insert(path.to_path_buf(), doc);
        Ok(())
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
