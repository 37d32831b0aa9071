//! Per-route body schemas and field validation.
//!
//! # Rules
//!
//! - `required`: value must be present and not `null`
//! - `type`: one of string, number, integer, email
//! - `min_length`: character floor for strings
//! - `min`: numeric floor
//!
//! Absent optional fields are skipped. A value of the wrong type skips its
//! length and numeric checks. Every failure is collected; validation never
//! stops at the first error.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Single field failure reported in a 400 response's `details` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    /// Whole number with no fractional part. `25.0` is not an integer.
    Integer,
    Email,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "a string"),
            FieldType::Number => write!(f, "a number"),
            FieldType::Integer => write!(f, "an integer"),
            FieldType::Email => write!(f, "a valid email address"),
        }
    }
}

/// Rule set for one field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldRule {
    pub required: bool,
    pub kind: Option<FieldType>,
    pub min_length: Option<usize>,
    pub min: Option<f64>,
}

impl FieldRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn kind(mut self, kind: FieldType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    fn check(&self, field: &str, value: Option<&Value>, errors: &mut Vec<FieldError>) {
        let mut fail = |message: String| {
            errors.push(FieldError {
                field: field.to_string(),
                message,
            })
        };

        let Some(value) = value.filter(|v| !v.is_null()) else {
            if self.required {
                fail(format!("{field} is required"));
            }
            return;
        };

        if let Some(kind) = self.kind {
            let matches = match kind {
                FieldType::String => value.is_string(),
                FieldType::Number => value.is_number(),
                FieldType::Integer => value.is_i64() || value.is_u64(),
                FieldType::Email => value.as_str().is_some_and(is_valid_email),
            };
            if !matches {
                fail(format!("{field} must be {kind}"));
                return;
            }
        }

        if let (Some(min_length), Some(text)) = (self.min_length, value.as_str()) {
            if text.chars().count() < min_length {
                fail(format!("{field} must be at least {min_length} characters"));
            }
        }

        if let (Some(min), Some(number)) = (self.min, value.as_f64()) {
            if number < min {
                fail(format!("{field} must be at least {min}"));
            }
        }
    }
}

/// Ordered field rules for a route body. Errors are reported in
/// declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<(String, FieldRule)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.fields.push((name.into(), rule));
        self
    }

    /// Validate `body` and return every failure. A non-object body is
    /// treated as having no fields.
    pub fn validate(&self, body: &Value) -> Vec<FieldError> {
        let mut errors = Vec::new();
        for (name, rule) in &self.fields {
            rule.check(name, body.get(name), &mut errors);
        }
        errors
    }
}

/// Conservative email check: one `@`, non-empty local part, and a dotted
/// domain with no leading or trailing dot. Not RFC 5322.
pub fn is_valid_email(candidate: &str) -> bool {
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.find('.') {
        Some(_) => !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    }
}
