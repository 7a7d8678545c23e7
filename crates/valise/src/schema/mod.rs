// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! Declarative container validation.
//!
//! A [`Schema`] is assembled by chained calls and then run against any
//! container: [`Schema::validate`] stops at the first violation (declaration
//! order), [`Schema::validate_all`] collects every violation, and
//! [`Schema::validate_result`] adapts to the crate's `Result` form.
//!
//! ```
//! use valise::{Container, Schema, ValueKind};
//!
//! let schema = Schema::new()
//!     .require("age", ValueKind::Int)
//!     .range("age", 0, 150)
//!     .optional("nickname", ValueKind::String)
//!     .length("nickname", 1, 32);
//!
//! let c = Container::new();
//! c.set("age", 42i32).expect("set should succeed");
//! assert!(schema.validate(&c).is_none());
//! ```

use crate::container::Container;
use crate::error::{ErrorCode, ErrorInfo, VoidResult};
use crate::value::{Value, ValueData, ValueKind};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

const MODULE: &str = "schema";

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Violation category, mirrored by the validation error codes (3xx).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    MissingRequired,
    TypeMismatch,
    OutOfRange,
    LengthViolation,
    PatternMismatch,
    NotInEnumeration,
    CustomPredicateFailed,
    NestedValidationFailed,
}

impl ValidationErrorKind {
    /// Matching stable error code.
    pub fn code(self) -> ErrorCode {
        match self {
            Self::MissingRequired => ErrorCode::MissingRequired,
            Self::TypeMismatch => ErrorCode::ValidationTypeMismatch,
            Self::OutOfRange => ErrorCode::OutOfRange,
            Self::LengthViolation => ErrorCode::LengthViolation,
            Self::PatternMismatch => ErrorCode::PatternMismatch,
            Self::NotInEnumeration => ErrorCode::NotInEnumeration,
            Self::CustomPredicateFailed => ErrorCode::CustomPredicateFailed,
            Self::NestedValidationFailed => ErrorCode::NestedValidationFailed,
        }
    }
}

/// One schema violation; nested failures carry their inner errors.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub field: String,
    pub message: String,
    pub nested: Vec<ValidationError>,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, field: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.to_string(),
            message: message.into(),
            nested: Vec::new(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

enum Constraint {
    IntRange { min: i64, max: i64 },
    FloatRange { min: f64, max: f64 },
    Length { min: usize, max: usize },
    Pattern { source: String, compiled: Option<Regex> },
    OneOf(Vec<ValueData>),
    Custom(Predicate),
    Nested(Arc<Schema>),
}

struct FieldRule {
    name: String,
    kind: Option<ValueKind>,
    required: bool,
    constraints: Vec<Constraint>,
}

/// Declarative field specification (see module docs).
#[derive(Default)]
pub struct Schema {
    rules: Vec<FieldRule>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    fn rule_mut(&mut self, name: &str) -> &mut FieldRule {
        let position = match self.rules.iter().position(|rule| rule.name == name) {
            Some(position) => position,
            None => {
                self.rules.push(FieldRule {
                    name: name.to_string(),
                    kind: None,
                    required: false,
                    constraints: Vec::new(),
                });
                self.rules.len() - 1
            }
        };
        &mut self.rules[position]
    }

    /// Field must be present with the given kind.
    pub fn require(mut self, name: &str, kind: ValueKind) -> Self {
        let rule = self.rule_mut(name);
        rule.kind = Some(kind);
        rule.required = true;
        self
    }

    /// Field may be absent; when present it must carry the given kind.
    pub fn optional(mut self, name: &str, kind: ValueKind) -> Self {
        let rule = self.rule_mut(name);
        rule.kind = Some(kind);
        self
    }

    /// Integer range constraint (inclusive).
    pub fn range(mut self, name: &str, min: i64, max: i64) -> Self {
        self.rule_mut(name).constraints.push(Constraint::IntRange { min, max });
        self
    }

    /// Floating-point range constraint (inclusive).
    pub fn range_f64(mut self, name: &str, min: f64, max: f64) -> Self {
        self.rule_mut(name)
            .constraints
            .push(Constraint::FloatRange { min, max });
        self
    }

    /// Length bounds: characters for strings, bytes for `bytes`, elements
    /// for arrays.
    pub fn length(mut self, name: &str, min: usize, max: usize) -> Self {
        self.rule_mut(name).constraints.push(Constraint::Length { min, max });
        self
    }

    /// Full-match regex constraint for string fields. An invalid pattern
    /// reports `PatternMismatch` at validation time.
    pub fn pattern(mut self, name: &str, pattern: &str) -> Self {
        let compiled = match Regex::new(&format!("^(?:{pattern})$")) {
            Ok(re) => Some(re),
            Err(e) => {
                log::warn!("[valise] schema pattern {pattern:?} failed to compile: {e}");
                None
            }
        };
        self.rule_mut(name).constraints.push(Constraint::Pattern {
            source: pattern.to_string(),
            compiled,
        });
        self
    }

    /// Enumeration membership (structural equality).
    pub fn one_of(mut self, name: &str, values: Vec<ValueData>) -> Self {
        self.rule_mut(name).constraints.push(Constraint::OneOf(values));
        self
    }

    /// Caller-supplied predicate over the whole value.
    pub fn custom<F>(mut self, name: &str, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.rule_mut(name)
            .constraints
            .push(Constraint::Custom(Arc::new(predicate)));
        self
    }

    /// Sub-schema for a container-kind field.
    pub fn field(mut self, name: &str, sub_schema: Schema) -> Self {
        let rule = self.rule_mut(name);
        if rule.kind.is_none() {
            rule.kind = Some(ValueKind::Container);
        }
        rule.constraints.push(Constraint::Nested(Arc::new(sub_schema)));
        self
    }

    /// First violation in declaration order, or `None`.
    pub fn validate(&self, container: &Container) -> Option<ValidationError> {
        for rule in &self.rules {
            let errors = check_rule(rule, container, true);
            if let Some(first) = errors.into_iter().next() {
                return Some(first);
            }
        }
        None
    }

    /// Every violation, in declaration order.
    pub fn validate_all(&self, container: &Container) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for rule in &self.rules {
            errors.extend(check_rule(rule, container, false));
        }
        errors
    }

    /// Adapter to the crate's `Result` form: first violation becomes an
    /// [`ErrorInfo`] with the matching validation code.
    pub fn validate_result(&self, container: &Container) -> VoidResult {
        match self.validate(container) {
            None => Ok(()),
            Some(error) => Err(ErrorInfo::with_details(
                error.kind.code(),
                MODULE,
                format!("{error}"),
            )),
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.rules.iter().map(|rule| rule.name.as_str()).collect();
        f.debug_struct("Schema").field("fields", &names).finish()
    }
}

/// Run one rule; `stop_early` short-circuits after the first violation.
fn check_rule(rule: &FieldRule, container: &Container, stop_early: bool) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let Ok(value) = container.get_value(&rule.name) else {
        if rule.required {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingRequired,
                &rule.name,
                "required field is missing",
            ));
        }
        return errors;
    };

    if let Some(expected) = rule.kind {
        if value.kind() != expected {
            errors.push(ValidationError::new(
                ValidationErrorKind::TypeMismatch,
                &rule.name,
                format!("expected {}, got {}", expected.name(), value.kind().name()),
            ));
            // Constraint checks against the wrong kind would only cascade.
            return errors;
        }
    }

    for constraint in &rule.constraints {
        if stop_early && !errors.is_empty() {
            break;
        }
        if let Some(error) = check_constraint(constraint, rule, &value) {
            errors.push(error);
        }
    }
    errors
}

fn check_constraint(
    constraint: &Constraint,
    rule: &FieldRule,
    value: &Value,
) -> Option<ValidationError> {
    match constraint {
        Constraint::IntRange { min, max } => {
            let Some(wide) = value.data().as_integer() else {
                return Some(ValidationError::new(
                    ValidationErrorKind::TypeMismatch,
                    &rule.name,
                    format!("range constraint on non-integer {}", value.kind().name()),
                ));
            };
            if wide < i128::from(*min) || wide > i128::from(*max) {
                return Some(ValidationError::new(
                    ValidationErrorKind::OutOfRange,
                    &rule.name,
                    format!("value {wide} outside [{min}, {max}]"),
                ));
            }
            None
        }
        Constraint::FloatRange { min, max } => {
            let v = match value.data() {
                ValueData::Float(v) => f64::from(*v),
                ValueData::Double(v) => *v,
                _ => {
                    return Some(ValidationError::new(
                        ValidationErrorKind::TypeMismatch,
                        &rule.name,
                        format!("range constraint on non-float {}", value.kind().name()),
                    ))
                }
            };
            if !(v >= *min && v <= *max) {
                return Some(ValidationError::new(
                    ValidationErrorKind::OutOfRange,
                    &rule.name,
                    format!("value {v} outside [{min}, {max}]"),
                ));
            }
            None
        }
        Constraint::Length { min, max } => {
            let len = match value.data() {
                ValueData::Str(s) => s.as_str().chars().count(),
                ValueData::Bytes(b) => b.len(),
                ValueData::Array(a) => a.len(),
                _ => {
                    return Some(ValidationError::new(
                        ValidationErrorKind::TypeMismatch,
                        &rule.name,
                        format!("length constraint on {}", value.kind().name()),
                    ))
                }
            };
            if len < *min || len > *max {
                return Some(ValidationError::new(
                    ValidationErrorKind::LengthViolation,
                    &rule.name,
                    format!("length {len} outside [{min}, {max}]"),
                ));
            }
            None
        }
        Constraint::Pattern { source, compiled } => {
            let Some(text) = value.data().as_str() else {
                return Some(ValidationError::new(
                    ValidationErrorKind::TypeMismatch,
                    &rule.name,
                    format!("pattern constraint on {}", value.kind().name()),
                ));
            };
            match compiled {
                Some(re) if re.is_match(text) => None,
                Some(_) => Some(ValidationError::new(
                    ValidationErrorKind::PatternMismatch,
                    &rule.name,
                    format!("{text:?} does not match {source:?}"),
                )),
                None => Some(ValidationError::new(
                    ValidationErrorKind::PatternMismatch,
                    &rule.name,
                    format!("invalid pattern {source:?}"),
                )),
            }
        }
        Constraint::OneOf(allowed) => {
            if allowed.iter().any(|candidate| candidate == value.data()) {
                None
            } else {
                Some(ValidationError::new(
                    ValidationErrorKind::NotInEnumeration,
                    &rule.name,
                    format!("value not in {}-member enumeration", allowed.len()),
                ))
            }
        }
        Constraint::Custom(predicate) => {
            if predicate(value) {
                None
            } else {
                Some(ValidationError::new(
                    ValidationErrorKind::CustomPredicateFailed,
                    &rule.name,
                    "custom predicate rejected value",
                ))
            }
        }
        Constraint::Nested(sub_schema) => {
            let Some(inner) = value.data().as_container() else {
                return Some(ValidationError::new(
                    ValidationErrorKind::TypeMismatch,
                    &rule.name,
                    format!("nested schema on {}", value.kind().name()),
                ));
            };
            let nested = sub_schema.validate_all(inner);
            if nested.is_empty() {
                None
            } else {
                let mut error = ValidationError::new(
                    ValidationErrorKind::NestedValidationFailed,
                    &rule.name,
                    format!("{} nested violation(s)", nested.len()),
                );
                error.nested = nested;
                Some(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> Container {
        let c = Container::new();
        c.set("age", 42i32).expect("set should succeed");
        c.set("name", "ada").expect("set should succeed");
        c
    }

    #[test]
    fn test_valid_container_passes() {
        let schema = Schema::new()
            .require("age", ValueKind::Int)
            .range("age", 0, 150)
            .require("name", ValueKind::String)
            .length("name", 1, 32);
        assert!(schema.validate(&person()).is_none());
        assert!(schema.validate_all(&person()).is_empty());
        assert!(schema.validate_result(&person()).is_ok());
    }

    #[test]
    fn test_range_violation() {
        let schema = Schema::new().require("age", ValueKind::Int).range("age", 0, 150);
        let c = Container::new();
        c.set("age", 200i32).expect("set should succeed");

        let error = schema.validate(&c).expect("validation should fail");
        assert_eq!(error.kind, ValidationErrorKind::OutOfRange);
        assert_eq!(error.field, "age");

        let err = schema.validate_result(&c).unwrap_err();
        assert_eq!(err.code, ErrorCode::OutOfRange);
    }

    #[test]
    fn test_missing_required() {
        let schema = Schema::new().require("age", ValueKind::Int);
        let error = schema.validate(&Container::new()).expect("validation should fail");
        assert_eq!(error.kind, ValidationErrorKind::MissingRequired);
    }

    #[test]
    fn test_optional_field_absent_ok_but_wrong_kind_fails() {
        let schema = Schema::new().optional("nickname", ValueKind::String);
        assert!(schema.validate(&Container::new()).is_none());

        let c = Container::new();
        c.set("nickname", 5i32).expect("set should succeed");
        let error = schema.validate(&c).expect("validation should fail");
        assert_eq!(error.kind, ValidationErrorKind::TypeMismatch);
    }

    #[test]
    fn test_float_range() {
        let schema = Schema::new()
            .require("ratio", ValueKind::Double)
            .range_f64("ratio", 0.0, 1.0);
        let c = Container::new();
        c.set("ratio", 1.5f64).expect("set should succeed");
        let error = schema.validate(&c).expect("validation should fail");
        assert_eq!(error.kind, ValidationErrorKind::OutOfRange);

        c.set("ratio", 0.5f64).expect("set should succeed");
        assert!(schema.validate(&c).is_none());
    }

    #[test]
    fn test_nan_fails_float_range() {
        let schema = Schema::new().range_f64("ratio", 0.0, 1.0);
        let c = Container::new();
        c.set("ratio", f64::NAN).expect("set should succeed");
        assert_eq!(
            schema.validate(&c).expect("validation should fail").kind,
            ValidationErrorKind::OutOfRange
        );
    }

    #[test]
    fn test_pattern_full_match() {
        let schema = Schema::new().pattern("id", "[a-z]{3}-[0-9]{2}");
        let c = Container::new();
        c.set("id", "abc-42").expect("set should succeed");
        assert!(schema.validate(&c).is_none());

        c.set("id", "prefix abc-42 suffix").expect("set should succeed");
        assert_eq!(
            schema.validate(&c).expect("validation should fail").kind,
            ValidationErrorKind::PatternMismatch
        );
    }

    #[test]
    fn test_invalid_pattern_reports_mismatch() {
        let schema = Schema::new().pattern("id", "(unclosed");
        let c = Container::new();
        c.set("id", "anything").expect("set should succeed");
        let error = schema.validate(&c).expect("validation should fail");
        assert_eq!(error.kind, ValidationErrorKind::PatternMismatch);
        assert!(error.message.contains("invalid pattern"));
    }

    #[test]
    fn test_one_of() {
        let schema = Schema::new().one_of(
            "unit",
            vec![ValueData::string("celsius"), ValueData::string("kelvin")],
        );
        let c = Container::new();
        c.set("unit", "kelvin").expect("set should succeed");
        assert!(schema.validate(&c).is_none());

        c.set("unit", "fahrenheit").expect("set should succeed");
        assert_eq!(
            schema.validate(&c).expect("validation should fail").kind,
            ValidationErrorKind::NotInEnumeration
        );
    }

    #[test]
    fn test_custom_predicate() {
        let schema = Schema::new().custom("even", |value| {
            value.get::<i64>().map(|v| v % 2 == 0).unwrap_or(false)
        });
        let c = Container::new();
        c.set("even", 4i32).expect("set should succeed");
        assert!(schema.validate(&c).is_none());

        c.set("even", 5i32).expect("set should succeed");
        assert_eq!(
            schema.validate(&c).expect("validation should fail").kind,
            ValidationErrorKind::CustomPredicateFailed
        );
    }

    #[test]
    fn test_nested_schema() {
        let schema = Schema::new().field(
            "endpoint",
            Schema::new()
                .require("host", ValueKind::String)
                .require("port", ValueKind::Int)
                .range("port", 1, 65535),
        );

        let inner = Container::new();
        inner.set("host", "example.com").expect("set should succeed");
        inner.set("port", 0i32).expect("set should succeed");
        let c = Container::new();
        c.set("endpoint", ValueData::from(inner)).expect("set should succeed");

        let error = schema.validate(&c).expect("validation should fail");
        assert_eq!(error.kind, ValidationErrorKind::NestedValidationFailed);
        assert_eq!(error.nested.len(), 1);
        assert_eq!(error.nested[0].kind, ValidationErrorKind::OutOfRange);
        assert_eq!(error.nested[0].field, "port");
    }

    #[test]
    fn test_validate_all_superset_of_validate() {
        let schema = Schema::new()
            .require("a", ValueKind::Int)
            .require("b", ValueKind::Int)
            .range("b", 0, 10)
            .length("name", 1, 3);
        let c = Container::new();
        c.set("b", 99i32).expect("set should succeed");
        c.set("name", "toolong").expect("set should succeed");

        let first = schema.validate(&c).expect("validation should fail");
        let all = schema.validate_all(&c);
        assert!(all.len() >= 2);
        assert_eq!(all[0], first, "validate returns the first of validate_all");
    }

    #[test]
    fn test_declaration_order_decides_first_error() {
        let schema = Schema::new()
            .length("z_name", 1, 2)
            .require("a_field", ValueKind::Int);
        let c = Container::new();
        c.set("z_name", "long").expect("set should succeed");

        // z_name was declared first, so its violation wins despite the name.
        let first = schema.validate(&c).expect("validation should fail");
        assert_eq!(first.field, "z_name");
    }
}
