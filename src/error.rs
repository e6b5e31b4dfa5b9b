//! Validation failures: where a payload went wrong and why.
//!
//! Validators never stop at the first problem. Every violation found in one
//! payload is collected into a [`ValidationFailure`] so the caller can fix
//! everything in a single pass.

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// One step into a JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a field inside a payload, rendered as `entities[0].name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// Path of the payload itself
    pub fn root() -> Self {
        Self::default()
    }

    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.to_string()));
        Self(segments)
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => f.write_str(key)?,
                PathSegment::Key(key) => write!(f, ".{}", key)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Length rule broken by a [`ViolationKind::ConstraintViolation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    MinLength,
    MaxLength,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::MinLength => f.write_str("min_length"),
            Rule::MaxLength => f.write_str("max_length"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// A string is shorter or longer than allowed
    ConstraintViolation { rule: Rule, limit: usize },
    /// A key the shape does not declare (usually a typo)
    UnknownField,
    /// A collection that needs at least one element was empty
    EmptyCollection,
    /// Wrong JSON kind, or a required field is missing (`found == "missing"`)
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// A single problem at a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: FieldPath,
    #[serde(flatten)]
    pub kind: ViolationKind,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every violation found in one payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} validation error(s): {}", .violations.len(), render(.violations))]
pub struct ValidationFailure {
    violations: Vec<Violation>,
}

fn render(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationFailure {
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations reported at exactly `path` (in rendered form, e.g. `entities[0].name`)
    pub fn at(&self, path: &str) -> Vec<&Violation> {
        self.violations
            .iter()
            .filter(|v| v.path.to_string() == path)
            .collect()
    }
}

/// Accumulator threaded through every validator of one payload.
#[derive(Debug, Default)]
pub(crate) struct Violations(Vec<Violation>);

impl Violations {
    pub(crate) fn push(&mut self, path: &FieldPath, kind: ViolationKind, message: impl Into<String>) {
        self.0.push(Violation {
            path: path.clone(),
            kind,
            message: message.into(),
        });
    }

    /// A value is only accepted when nothing was reported along the way;
    /// nested validators may still build a value after an unknown key.
    pub(crate) fn finish<T>(self, value: Option<T>) -> Result<T, ValidationFailure> {
        match value {
            Some(value) if self.0.is_empty() => Ok(value),
            _ => Err(ValidationFailure { violations: self.0 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_renders_keys_and_indexes() {
        let path = FieldPath::root().key("observations").index(2).key("contents").index(0);
        assert_eq!(path.to_string(), "observations[2].contents[0]");
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("observations".to_string()),
                PathSegment::Index(2),
                PathSegment::Key("contents".to_string()),
                PathSegment::Index(0),
            ]
        );
        assert_eq!(FieldPath::root().to_string(), "<root>");
    }

    #[test]
    fn violation_serializes_flat() {
        let mut out = Violations::default();
        out.push(
            &FieldPath::root().key("name"),
            ViolationKind::ConstraintViolation {
                rule: Rule::MaxLength,
                limit: 100,
            },
            "Entity name too long (max 100 characters)",
        );
        let failure = out.finish::<()>(None).unwrap_err();
        let json = serde_json::to_value(failure.violations()).unwrap();
        assert_eq!(json[0]["path"], "name");
        assert_eq!(json[0]["kind"], "constraint_violation");
        assert_eq!(json[0]["rule"], "max_length");
        assert_eq!(json[0]["limit"], 100);
    }

    #[test]
    fn finish_rejects_value_when_anything_was_reported() {
        let mut out = Violations::default();
        out.push(&FieldPath::root().key("extra"), ViolationKind::UnknownField, "Unrecognized key 'extra'");
        let failure = out.finish(Some(1)).unwrap_err();
        assert_eq!(failure.len(), 1);
        assert!(failure.to_string().contains("extra: Unrecognized key 'extra'"));

        let violations = failure.into_violations();
        assert_eq!(violations[0].kind, ViolationKind::UnknownField);
    }
}
