//! Schema validation over loosely-typed form data.
//!
//! Handlers validate the raw JSON object before deserializing it into a typed
//! record, so a request missing several fields gets one aggregated message
//! instead of the first serde error. The wizard runs the same schemas over its
//! draft through the [`FieldSource`] trait.

use crate::errors::AppError;
use crate::schema::{Check, FieldRule, FormSchema};
use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    // RFC 5322 simplified: local@domain.tld
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email regex is valid")
});

/// Read access to form values, independent of where they are stored.
pub trait FieldSource {
    /// Trimmed text value; blank text counts as absent.
    fn text(&self, field: &str) -> Option<&str>;
    /// Selected options of a multi-select.
    fn choices(&self, field: &str) -> Vec<&str>;
    /// Checkbox value; absent counts as false.
    fn flag(&self, field: &str) -> bool;
}

impl FieldSource for Map<String, Value> {
    fn text(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn choices(&self, field: &str) -> Vec<&str> {
        self.get(field)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    fn flag(&self, field: &str) -> bool {
        self.get(field).and_then(Value::as_bool).unwrap_or(false)
    }
}

/// One violated rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Field-level errors in schema order, at most one per field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Records an error unless the field already has one.
    pub fn push(&mut self, field: &str, message: &str) {
        if self.get(field).is_none() {
            self.0.push(FieldError {
                field: field.to_string(),
                message: message.to_string(),
            });
        }
    }

    pub fn clear_field(&mut self, field: &str) {
        self.0.retain(|e| e.field != field);
    }

    pub fn extend(&mut self, other: FieldErrors) {
        for error in other.0 {
            self.push(&error.field, &error.message);
        }
    }

    /// Human-readable aggregate, e.g. `Validation error: Name is required at "name"`.
    pub fn message(&self) -> String {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{} at \"{}\"", e.message, e.field))
            .collect();
        format!("Validation error: {}", parts.join("; "))
    }

    /// `Ok(())` when empty, otherwise a 400 carrying the aggregated message.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::BadRequest(self.message()))
        }
    }
}

/// Validate email address format.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }
    EMAIL_REGEX.is_match(email)
}

/// Validate and normalize a phone number (default region US).
///
/// Returns: (is_valid, normalized_phone_or_error_msg)
pub fn validate_phone(raw: &str) -> (bool, String) {
    let digits = raw.chars().filter(|c| c.is_ascii_digit()).count();
    if raw.trim().is_empty() || digits < 7 {
        return (false, "Phone too short".to_string());
    }

    match phonenumber::parse(Some(CountryId::US), raw) {
        Ok(number) => {
            if phonenumber::is_valid(&number) {
                let formatted = number.format().mode(Mode::E164).to_string();
                tracing::debug!("Valid phone: {} -> {}", raw, formatted);
                (true, formatted)
            } else {
                tracing::debug!("Invalid phone number: {}", raw);
                (false, "Invalid phone number".to_string())
            }
        }
        Err(e) => {
            tracing::debug!("Failed to parse phone '{}': {:?}", raw, e);
            (false, format!("Parse error: {:?}", e))
        }
    }
}

fn check_passes<S: FieldSource + ?Sized>(source: &S, field: &str, check: Check) -> bool {
    match check {
        Check::Required => source.text(field).is_some(),
        Check::Email => source.text(field).map_or(true, is_valid_email),
        Check::Phone => source.text(field).map_or(true, |p| validate_phone(p).0),
        Check::MinLen(min) => source.text(field).map_or(true, |t| t.chars().count() >= min),
        Check::MaxLen(max) => source.text(field).map_or(true, |t| t.chars().count() <= max),
        Check::MinChoices(min) => source.choices(field).len() >= min,
        Check::Accepted => source.flag(field),
        Check::OneOf(allowed) => source.text(field).map_or(true, |t| allowed.contains(&t)),
        Check::RequiredWhen {
            field: parent,
            option,
        } => !is_chosen(source, parent, option) || source.text(field).is_some(),
    }
}

/// True when `parent` holds `option`, either as a selected choice or as its text value.
pub fn is_chosen<S: FieldSource + ?Sized>(source: &S, parent: &str, option: &str) -> bool {
    source.choices(parent).contains(&option) || source.text(parent) == Some(option)
}

/// Runs rules in order, keeping the first violation per field.
pub fn validate_fields<S: FieldSource + ?Sized>(source: &S, fields: &[FieldRule]) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for field_rule in fields {
        if let Some(violated) = field_rule
            .rules
            .iter()
            .find(|r| !check_passes(source, field_rule.field, r.check))
        {
            errors.push(field_rule.field, violated.message);
        }
    }
    errors
}

impl FormSchema {
    /// Validates the fields owned by a 1-based step. Unknown steps have no rules.
    pub fn validate_step<S: FieldSource + ?Sized>(&self, step: usize, source: &S) -> FieldErrors {
        self.step(step)
            .map(|s| validate_fields(source, s.fields))
            .unwrap_or_default()
    }

    /// Validates every step, as required for a full-record submission.
    pub fn validate_all<S: FieldSource + ?Sized>(&self, source: &S) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for step in 1..=self.step_count() {
            errors.extend(self.validate_step(step, source));
        }
        errors
    }
}

/// Requires a JSON object body and returns its map.
pub fn as_object(body: &Value) -> Result<&Map<String, Value>, AppError> {
    body.as_object()
        .ok_or_else(|| AppError::BadRequest("Request body must be a JSON object".to_string()))
}

/// Validates `body` against every step of `schema`, then deserializes it.
pub fn parse_with_schema<T: serde::de::DeserializeOwned>(
    schema: &FormSchema,
    body: Value,
) -> Result<T, AppError> {
    schema.validate_all(as_object(&body)?).into_result()?;
    serde_json::from_value(body).map_err(|e| {
        AppError::BadRequest(format!("Validation error: {}", e))
    })
}
