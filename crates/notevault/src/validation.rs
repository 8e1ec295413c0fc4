//! Document validation.
//!
//! The validator runs over a candidate's JSON form so it can judge shape as
//! well as content: a UI may hand over a half-filled form where `title` is a
//! number or `tags` is missing entirely.
//!
//! Rules:
//! - `title`: required string, non-empty after trimming, at most 500 chars
//! - `content`: optional string, at most 10,000,000 chars
//! - `tags`: optional array of at most 50 non-empty strings, each at most 50
//!   chars, unique ignoring case
//! - `category`: optional string (or null), at most 100 chars
//! - `isPinned`, `isArchived`: optional booleans
//! - `createdAt`, `updatedAt`: optional RFC 3339 timestamps
//! - `metadata`: optional object, at most 100,000 chars serialized
//!
//! [`validate`] never fails; it always returns a [`ValidationReport`].

use chrono::DateTime;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

pub const MAX_TITLE_LEN: usize = 500;
pub const MAX_CONTENT_LEN: usize = 10_000_000;
pub const MAX_TAGS: usize = 50;
pub const MAX_TAG_LEN: usize = 50;
pub const MAX_CATEGORY_LEN: usize = 100;
pub const MAX_METADATA_LEN: usize = 100_000;

/// Validates a candidate document.
///
/// # Examples
/// ```
/// use notevault::validation::validate;
/// use serde_json::json;
///
/// assert!(validate(&json!({ "title": "Groceries" })).is_valid);
/// assert!(validate(&json!({ "title": "a", "tags": ["x", "X"] })).errors.len() == 1);
///
/// assert!(!validate(&json!({ "title": "" })).is_valid);
/// assert!(!validate(&json!({ "content": "no title" })).is_valid);
/// assert!(!validate(&json!(["not", "an", "object"])).is_valid);
/// ```
pub fn validate(candidate: &Value) -> ValidationReport {
    let mut errors = Vec::new();

    let Some(doc) = candidate.as_object() else {
        return ValidationReport::single(ValidationIssue::Malformed(format!(
            "expected an object, found {}",
            type_name(candidate)
        )));
    };

    match doc.get("title") {
        None | Some(Value::Null) => errors.push(ValidationIssue::MissingTitle),
        Some(Value::String(title)) => {
            if title.trim().is_empty() {
                errors.push(ValidationIssue::EmptyTitle);
            }
            check_len(&mut errors, "title", title, MAX_TITLE_LEN);
        }
        Some(_) => errors.push(ValidationIssue::WrongType {
            field: "title",
            expected: "string",
        }),
    }

    match doc.get("content") {
        None => {}
        Some(Value::String(content)) => check_len(&mut errors, "content", content, MAX_CONTENT_LEN),
        Some(_) => errors.push(ValidationIssue::WrongType {
            field: "content",
            expected: "string",
        }),
    }

    if let Some(tags) = doc.get("tags") {
        check_tags(&mut errors, tags);
    }

    match doc.get("category") {
        None | Some(Value::Null) => {}
        Some(Value::String(category)) => {
            check_len(&mut errors, "category", category, MAX_CATEGORY_LEN)
        }
        Some(_) => errors.push(ValidationIssue::WrongType {
            field: "category",
            expected: "string",
        }),
    }

    for field in ["isPinned", "isArchived"] {
        if let Some(value) = doc.get(field) {
            if !value.is_boolean() {
                errors.push(ValidationIssue::WrongType {
                    field,
                    expected: "boolean",
                });
            }
        }
    }

    for field in ["createdAt", "updatedAt"] {
        match doc.get(field) {
            None => {}
            Some(Value::String(raw)) => {
                if DateTime::parse_from_rfc3339(raw).is_err() {
                    errors.push(ValidationIssue::InvalidTimestamp {
                        field,
                        value: raw.clone(),
                    });
                }
            }
            Some(_) => errors.push(ValidationIssue::WrongType {
                field,
                expected: "timestamp string",
            }),
        }
    }

    match doc.get("metadata") {
        None => {}
        Some(meta @ Value::Object(_)) => {
            let size = meta.to_string().chars().count();
            if size > MAX_METADATA_LEN {
                errors.push(ValidationIssue::TooLong {
                    field: "metadata",
                    max: MAX_METADATA_LEN,
                    actual: size,
                });
            }
        }
        Some(_) => errors.push(ValidationIssue::WrongType {
            field: "metadata",
            expected: "object",
        }),
    }

    ValidationReport::from_errors(errors)
}

fn check_len(errors: &mut Vec<ValidationIssue>, field: &'static str, value: &str, max: usize) {
    let actual = value.chars().count();
    if actual > max {
        errors.push(ValidationIssue::TooLong { field, max, actual });
    }
}

fn check_tags(errors: &mut Vec<ValidationIssue>, tags: &Value) {
    let Some(tags) = tags.as_array() else {
        errors.push(ValidationIssue::WrongType {
            field: "tags",
            expected: "array",
        });
        return;
    };

    if tags.len() > MAX_TAGS {
        errors.push(ValidationIssue::TooManyTags(tags.len()));
    }

    let mut seen = HashSet::new();
    for (index, tag) in tags.iter().enumerate() {
        let Some(tag) = tag.as_str() else {
            errors.push(ValidationIssue::WrongType {
                field: "tags",
                expected: "array of strings",
            });
            continue;
        };
        if tag.trim().is_empty() {
            errors.push(ValidationIssue::EmptyTag(index));
            continue;
        }
        if tag.chars().count() > MAX_TAG_LEN {
            errors.push(ValidationIssue::TagTooLong(tag.to_string()));
        }
        if !seen.insert(tag.to_lowercase()) {
            errors.push(ValidationIssue::DuplicateTag(tag.to_string()));
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Outcome of validating one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<ValidationIssue>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    pub fn single(issue: ValidationIssue) -> Self {
        Self::from_errors(vec![issue])
    }

    pub fn valid() -> Self {
        Self::from_errors(Vec::new())
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum ValidationIssue {
    /// The candidate is not a JSON object
    Malformed(String),
    MissingTitle,
    /// Title is present but blank
    EmptyTitle,
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    TooManyTags(usize),
    /// Blank tag at the given position
    EmptyTag(usize),
    TagTooLong(String),
    /// Same tag appears twice, ignoring case
    DuplicateTag(String),
    InvalidTimestamp {
        field: &'static str,
        value: String,
    },
    /// Another note in the same collection already uses this id
    DuplicateId(String),
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::Malformed(detail) => write!(f, "malformed document: {}", detail),
            ValidationIssue::MissingTitle => write!(f, "title is required"),
            ValidationIssue::EmptyTitle => write!(f, "title cannot be empty"),
            ValidationIssue::WrongType { field, expected } => {
                write!(f, "{} must be a {}", field, expected)
            }
            ValidationIssue::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationIssue::TooManyTags(count) => {
                write!(f, "too many tags ({}, max {})", count, MAX_TAGS)
            }
            ValidationIssue::EmptyTag(index) => write!(f, "tag #{} is empty", index + 1),
            ValidationIssue::TagTooLong(tag) => {
                write!(f, "tag '{}' is longer than {} chars", tag, MAX_TAG_LEN)
            }
            ValidationIssue::DuplicateTag(tag) => write!(f, "duplicate tag '{}'", tag),
            ValidationIssue::InvalidTimestamp { field, value } => {
                write!(f, "{} is not a valid timestamp: '{}'", field, value)
            }
            ValidationIssue::DuplicateId(id) => write!(f, "duplicate note id {}", id),
        }
    }
}

impl std::error::Error for ValidationIssue {}
