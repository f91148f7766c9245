//! Validator callables and their attachment to record fields.
//!
//! A template declares [`ValidatorBinding`]s: a named callable plus the
//! ordered list of fields it guards. When a schema is generated each binding
//! becomes a [`BoundValidator`], checked against the fields that actually
//! exist in its record.

use std::fmt;
use std::sync::Arc;

use toml::{Table, Value};

use crate::error::InifigError;
use crate::types::SectionKey;

/// A validator: takes the candidate value and returns the value to keep, or
/// a message explaining why it was rejected.
pub type ValidatorFn =
    Arc<dyn Fn(&Value, &ValidationContext<'_>) -> Result<Value, String> + Send + Sync>;

/// What a validator can see besides the value itself.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub model: &'a str,
    pub section: &'a SectionKey,
    pub field: &'a str,
    /// Fields of the same record that have already been validated.
    pub data: &'a Table,
}

/// When a validator runs relative to the standard type check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidatorMode {
    /// After the type check; the validator only sees well-typed values.
    #[default]
    After,
}

/// A validator as declared by a template.
#[derive(Clone)]
pub struct ValidatorBinding {
    pub name: String,
    pub validator: ValidatorFn,
    /// Fields the validator runs against, in order.
    pub fields: Vec<String>,
}

impl ValidatorBinding {
    pub fn new<F>(name: &str, fields: &[&str], validator: F) -> Self
    where
        F: Fn(&Value, &ValidationContext<'_>) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            validator: Arc::new(validator),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl fmt::Debug for ValidatorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorBinding")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// A validator attached to the fields of one generated record.
#[derive(Clone)]
pub struct BoundValidator {
    pub name: String,
    validator: ValidatorFn,
    first_field: String,
    other_fields: Vec<String>,
    pub mode: ValidatorMode,
    pub check_fields: bool,
}

impl BoundValidator {
    /// Attach `binding` to a record of `model` with the given field names.
    ///
    /// With `check_fields` enabled, every field the binding names must exist
    /// in `known_fields`.
    pub fn bind(
        binding: &ValidatorBinding,
        model: &str,
        scope: &SectionKey,
        known_fields: &[&str],
        mode: ValidatorMode,
        check_fields: bool,
    ) -> Result<Self, InifigError> {
        let Some((first, rest)) = binding.fields.split_first() else {
            return Err(InifigError::Template {
                model: model.to_string(),
                reason: format!(
                    "validator '{}' in {scope} is not bound to any field",
                    binding.name
                ),
            });
        };

        if check_fields
            && let Some(missing) = binding
                .fields
                .iter()
                .find(|f| !known_fields.contains(&f.as_str()))
        {
            return Err(InifigError::UnknownValidatorField {
                validator: binding.name.clone(),
                field: missing.clone(),
                scope: scope.to_string(),
            });
        }

        Ok(Self {
            name: binding.name.clone(),
            validator: Arc::clone(&binding.validator),
            first_field: first.clone(),
            other_fields: rest.to_vec(),
            mode,
            check_fields,
        })
    }

    pub fn applies_to(&self, field: &str) -> bool {
        self.first_field == field || self.other_fields.iter().any(|f| f == field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.first_field.as_str())
            .chain(self.other_fields.iter().map(String::as_str))
    }

    pub fn run(&self, value: &Value, ctx: &ValidationContext<'_>) -> Result<Value, String> {
        (self.validator)(value, ctx)
    }
}

impl fmt::Debug for BoundValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundValidator")
            .field("name", &self.name)
            .field("fields", &self.fields().collect::<Vec<_>>())
            .field("mode", &self.mode)
            .field("check_fields", &self.check_fields)
            .finish_non_exhaustive()
    }
}

// -- Ready-made validators ---------------------------------------------------

/// Accept only one of the listed string values.
pub fn one_of(
    allowed: &[&str],
) -> impl Fn(&Value, &ValidationContext<'_>) -> Result<Value, String> + Send + Sync + 'static {
    let allowed: Vec<String> = allowed.iter().map(|s| s.to_string()).collect();
    move |value: &Value, _: &ValidationContext<'_>| match value.as_str() {
        Some(s) if allowed.iter().any(|a| a == s) => Ok(value.clone()),
        _ => Err(format!("expected one of: {}", allowed.join(", "))),
    }
}

/// Accept integers (or floats) within `min..=max`.
pub fn range(
    min: i64,
    max: i64,
) -> impl Fn(&Value, &ValidationContext<'_>) -> Result<Value, String> + Send + Sync + 'static {
    move |value: &Value, _: &ValidationContext<'_>| {
        let in_range = match value {
            Value::Integer(i) => (min..=max).contains(i),
            Value::Float(f) => (min as f64..=max as f64).contains(f),
            _ => return Err("expected a number".into()),
        };
        if !in_range {
            return Err(format!("must be between {min} and {max}"));
        }
        Ok(value.clone())
    }
}

/// Reject empty (or whitespace-only) strings; trims surrounding whitespace.
pub fn non_empty(value: &Value, _ctx: &ValidationContext<'_>) -> Result<Value, String> {
    match value.as_str().map(str::trim) {
        Some("") => Err("must not be empty".into()),
        Some(s) => Ok(Value::String(s.to_string())),
        None => Ok(value.clone()),
    }
}
