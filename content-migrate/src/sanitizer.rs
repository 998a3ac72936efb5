//! Record sanitizer.
//!
//! Strips server-assigned identifiers, audit fields and publication timestamps from a
//! record tree before it is submitted to another store. The walk covers every nesting
//! level: arrays element-wise, objects field-wise.

use std::collections::HashSet;

use serde_json::{Map, Value};

/// Fields the target store assigns itself and must never receive from the source.
pub const FORBIDDEN_FIELDS: [&str; 7] = [
    "id",
    "documentId",
    "createdAt",
    "updatedAt",
    "publishedAt",
    "createdBy",
    "updatedBy",
];

/// What to do with one object field during a sanitizing walk.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRewrite {
    /// Sanitize the value recursively and keep it.
    Keep,
    /// Emit this value verbatim, without sanitizing it.
    Replace(Value),
    /// Omit the field.
    Drop,
}

/// Removes forbidden fields from record trees.
///
/// Sanitizing is pure (the input is never mutated), total and idempotent.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    forbidden: HashSet<String>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::with_forbidden(FORBIDDEN_FIELDS)
    }
}

impl Sanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sanitizer that strips exactly `fields`.
    pub fn with_forbidden<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            forbidden: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_forbidden(&self, field: &str) -> bool {
        self.forbidden.contains(field)
    }

    /// Return a copy of `value` with every forbidden field removed at every depth.
    pub fn sanitize(&self, value: &Value) -> Value {
        self.sanitize_with(value, &mut |_, _| FieldRewrite::Keep)
    }

    /// Sanitize `value`, asking `rewrite` what to do with each non-forbidden object field.
    ///
    /// `rewrite` sees every field name at every depth together with the original
    /// (unsanitized) value. Replacement values are emitted as given, so a replacement may
    /// carry fields the walk would otherwise strip, such as `{"id": 12}`.
    pub fn sanitize_with<F>(&self, value: &Value, rewrite: &mut F) -> Value
    where
        F: FnMut(&str, &Value) -> FieldRewrite,
    {
        match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.sanitize_with(item, rewrite))
                    .collect(),
            ),
            Value::Object(fields) => {
                let mut cleaned = Map::with_capacity(fields.len());
                for (key, field) in fields {
                    if self.is_forbidden(key) {
                        continue;
                    }
                    match rewrite(key, field) {
                        FieldRewrite::Keep => {
                            cleaned.insert(key.clone(), self.sanitize_with(field, rewrite));
                        }
                        FieldRewrite::Replace(replacement) => {
                            cleaned.insert(key.clone(), replacement);
                        }
                        FieldRewrite::Drop => {}
                    }
                }
                Value::Object(cleaned)
            }
            scalar => scalar.clone(),
        }
    }

    /// Whether any forbidden field is present at any depth of `value`.
    pub fn contains_forbidden(&self, value: &Value) -> bool {
        match value {
            Value::Array(items) => items.iter().any(|item| self.contains_forbidden(item)),
            Value::Object(fields) => fields
                .iter()
                .any(|(key, field)| self.is_forbidden(key) || self.contains_forbidden(field)),
            _ => false,
        }
    }
}

/// Sanitize `value` with the default forbidden-field set.
pub fn sanitize(value: &Value) -> Value {
    Sanitizer::default().sanitize(value)
}
