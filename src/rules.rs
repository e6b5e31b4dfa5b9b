//! Primitive validators.
//!
//! Small rule values that check one JSON value and report into a shared
//! [`Violations`] accumulator. Every check runs to completion so callers can
//! compose them without short-circuiting; a `None` return always comes with
//! at least one reported violation.

use serde_json::{Map, Value};

use crate::error::{FieldPath, Rule, ViolationKind, Violations};

/// JSON kind of a value, as reported in type mismatches
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(path: &FieldPath, expected: &'static str, value: &Value, out: &mut Violations) {
    let found = kind_of(value);
    out.push(
        path,
        ViolationKind::TypeMismatch { expected, found },
        format!("Expected {}, received {}", expected, found),
    );
}

/// Length constraints on a string field, counted in chars.
#[derive(Debug, Clone, Copy)]
pub struct StrRule {
    min_len: usize,
    max_len: Option<usize>,
    too_short: &'static str,
    too_long: &'static str,
}

impl StrRule {
    /// At least one char, no upper bound
    pub const fn non_empty(message: &'static str) -> Self {
        Self {
            min_len: 1,
            max_len: None,
            too_short: message,
            too_long: "",
        }
    }

    pub const fn max_len(self, limit: usize, message: &'static str) -> Self {
        Self {
            max_len: Some(limit),
            too_long: message,
            ..self
        }
    }

    /// Returns the string unchanged when it satisfies the rule.
    pub(crate) fn check(&self, value: &Value, path: &FieldPath, out: &mut Violations) -> Option<String> {
        let Value::String(text) = value else {
            mismatch(path, "string", value, out);
            return None;
        };

        let len = text.chars().count();
        if len < self.min_len {
            out.push(
                path,
                ViolationKind::ConstraintViolation {
                    rule: Rule::MinLength,
                    limit: self.min_len,
                },
                self.too_short,
            );
            return None;
        }
        if let Some(limit) = self.max_len {
            if len > limit {
                out.push(
                    path,
                    ViolationKind::ConstraintViolation {
                        rule: Rule::MaxLength,
                        limit,
                    },
                    self.too_long,
                );
                return None;
            }
        }
        Some(text.clone())
    }
}

/// An array whose elements all pass an element rule.
#[derive(Debug, Clone, Copy)]
pub struct ArrayRule {
    non_empty: Option<&'static str>,
}

impl ArrayRule {
    pub const fn any() -> Self {
        Self { non_empty: None }
    }

    pub const fn non_empty(message: &'static str) -> Self {
        Self {
            non_empty: Some(message),
        }
    }

    /// Validates every element, even after one has failed.
    pub(crate) fn check<T>(
        &self,
        value: &Value,
        path: &FieldPath,
        out: &mut Violations,
        mut element: impl FnMut(&Value, &FieldPath, &mut Violations) -> Option<T>,
    ) -> Option<Vec<T>> {
        let Value::Array(items) = value else {
            mismatch(path, "array", value, out);
            return None;
        };

        if items.is_empty() {
            if let Some(message) = self.non_empty {
                out.push(path, ViolationKind::EmptyCollection, message);
                return None;
            }
        }

        let mut accepted = Vec::with_capacity(items.len());
        let mut failed = false;
        for (i, item) in items.iter().enumerate() {
            match element(item, &path.index(i), out) {
                Some(v) => accepted.push(v),
                None => failed = true,
            }
        }
        (!failed).then_some(accepted)
    }
}

/// Object view that has already reported every undeclared key.
pub(crate) struct StrictObject<'a> {
    fields: &'a Map<String, Value>,
    path: FieldPath,
}

impl<'a> StrictObject<'a> {
    /// Type-checks `value` as an object and diffs its keys against `declared`.
    /// Unknown keys are reported but the object is still returned so the
    /// declared fields get validated too.
    pub(crate) fn open(
        value: &'a Value,
        path: &FieldPath,
        declared: &[&str],
        out: &mut Violations,
    ) -> Option<Self> {
        let Value::Object(fields) = value else {
            mismatch(path, "object", value, out);
            return None;
        };

        for key in fields.keys().filter(|k| !declared.contains(&k.as_str())) {
            out.push(
                &path.key(key),
                ViolationKind::UnknownField,
                format!("Unrecognized key '{}'", key),
            );
        }

        Some(Self {
            fields,
            path: path.clone(),
        })
    }

    pub(crate) fn required<T>(
        &self,
        key: &str,
        expected: &'static str,
        out: &mut Violations,
        check: impl FnOnce(&Value, &FieldPath, &mut Violations) -> Option<T>,
    ) -> Option<T> {
        let path = self.path.key(key);
        match self.fields.get(key) {
            Some(value) => check(value, &path, out),
            None => {
                out.push(
                    &path,
                    ViolationKind::TypeMismatch {
                        expected,
                        found: "missing",
                    },
                    format!("Required field '{}' is missing", key),
                );
                None
            }
        }
    }

    /// `Some(None)` when the key is absent; `null` is not treated as absent.
    pub(crate) fn optional<T>(
        &self,
        key: &str,
        out: &mut Violations,
        check: impl FnOnce(&Value, &FieldPath, &mut Violations) -> Option<T>,
    ) -> Option<Option<T>> {
        match self.fields.get(key) {
            Some(value) => check(value, &self.path.key(key), out).map(Some),
            None => Some(None),
        }
    }
}
