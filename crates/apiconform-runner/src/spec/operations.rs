//! Operation extraction: paths × methods and their declared responses.

use serde_json::Value;

const METHODS: [&str; 5] = ["get", "post", "put", "delete", "patch"];

/// Extracted API operation
#[derive(Debug, Clone)]
pub struct Operation {
    pub method: String,
    /// Path template, e.g. `/games/{gameId}`
    pub path: String,
    /// Status keys of `responses`: exact codes, `4XX` style ranges, or `default`
    pub responses: Vec<String>,
}

impl Operation {
    /// Whether `status` is covered by a declared response.
    #[must_use]
    pub fn declares_status(&self, status: u16) -> bool {
        let code = status.to_string();
        self.responses.iter().any(|key| {
            key == "default"
                || *key == code
                || (key.len() == 3
                    && key.get(1..).is_some_and(|r| r.eq_ignore_ascii_case("XX"))
                    && key.as_bytes().first() == code.as_bytes().first())
        })
    }

    /// Whether the template matches a concrete path.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let template: Vec<&str> = segments(&self.path).collect();
        let concrete: Vec<&str> = segments(path).collect();
        template.len() == concrete.len()
            && template
                .iter()
                .zip(&concrete)
                .all(|(t, c)| is_template(t) || t == c)
    }

    /// Number of `{param}` segments in the template.
    #[must_use]
    pub fn template_segments(&self) -> usize {
        segments(&self.path).filter(|s| is_template(s)).count()
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn is_template(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}')
}

pub(super) fn extract_operations(spec: &Value) -> Vec<Operation> {
    let mut ops = Vec::new();

    let Some(paths) = spec.get("paths").and_then(Value::as_object) else {
        return ops;
    };

    for (path, path_item) in paths {
        for method in METHODS {
            let Some(operation) = path_item.get(method) else {
                continue;
            };

            let responses = operation
                .get("responses")
                .and_then(Value::as_object)
                .map(|r| r.keys().cloned().collect())
                .unwrap_or_default();

            ops.push(Operation {
                method: method.to_uppercase(),
                path: path.clone(),
                responses,
            });
        }
    }

    ops
}
