/// Write validation
///
/// Field-level errors are collected into a map of field name → messages,
/// which the API returns verbatim with status 400.

use serde::Serialize;
use std::collections::BTreeMap;

pub const DESCRIPTION_MIN_LENGTH: usize = 40;
pub const DESCRIPTION_MAX_LENGTH: usize = 2000;
pub const NAME_MAX_LENGTH: usize = 200;

/// New exercise names closer than this (Levenshtein, case-folded) to an
/// existing name in the same language are rejected
pub const MIN_EDIT_DISTANCE_THRESHOLD: usize = 2;

pub const REQUIRED: &str = "This field is required.";

/// Key for errors that belong to the request as a whole
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Field name → list of violated constraints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), WriteError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(WriteError::Invalid(self))
        }
    }

    /// Check length bounds of a text field, counted in characters
    pub fn check_length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let length = value.chars().count();
        if length < min {
            self.add(
                field,
                format!("Ensure this field has at least {} characters.", min),
            );
        }
        if length > max {
            self.add(
                field,
                format!("Ensure this field has no more than {} characters.", max),
            );
        }
    }

    pub fn missing_object(&mut self, field: &str, id: i64) {
        self.add(field, format!("Invalid pk \"{}\" - object does not exist.", id));
    }
}

/// Resolve a value for a create (`current == None`), full update or partial
/// update. Required fields absent from a create or full update are recorded.
pub fn resolve<T: Clone>(
    errors: &mut FieldErrors,
    field: &str,
    given: Option<T>,
    current: Option<&T>,
    partial: bool,
) -> Option<T> {
    match (given, current) {
        (Some(value), _) => Some(value),
        (None, Some(existing)) if partial => Some(existing.clone()),
        (None, _) => {
            errors.add(field, REQUIRED);
            None
        }
    }
}

/// Like `resolve` for fields with a default on create
pub fn resolve_or<T: Clone>(given: Option<T>, current: Option<&T>, default: T) -> T {
    given.or_else(|| current.cloned()).unwrap_or(default)
}

/// Whether `name` is too close to `existing`
pub fn too_similar(name: &str, existing: &str) -> bool {
    strsim::levenshtein(&name.to_lowercase(), &existing.to_lowercase()) < MIN_EDIT_DISTANCE_THRESHOLD
}

/// Failure of a write operation
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("validation failed")]
    Invalid(FieldErrors),
    #[error("object not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_description_names_the_field() {
        let mut errors = FieldErrors::new();
        errors.check_length("description", "too short", DESCRIPTION_MIN_LENGTH, DESCRIPTION_MAX_LENGTH);
        assert!(errors.contains("description"));
        assert_eq!(
            errors.messages("description"),
            ["Ensure this field has at least 40 characters.".to_string()]
        );
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({"description": ["Ensure this field has at least 40 characters."]})
        );
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let mut errors = FieldErrors::new();
        errors.check_length("description", &"ü".repeat(40), 40, 2000);
        assert!(errors.is_empty());
    }

    #[test]
    fn resolve_handles_create_and_partial_update() {
        let mut errors = FieldErrors::new();
        assert_eq!(resolve(&mut errors, "name", None::<String>, None, false), None);
        assert!(errors.contains("name"));

        let mut errors = FieldErrors::new();
        let current = "Curl".to_string();
        assert_eq!(
            resolve(&mut errors, "name", None, Some(&current), true),
            Some("Curl".to_string())
        );
        assert_eq!(resolve(&mut errors, "name", None, Some(&current), false), None);
        assert_eq!(errors.messages("name"), [REQUIRED.to_string()]);
    }

    #[test]
    fn similarity_is_case_insensitive() {
        assert!(too_similar("Bench Press", "bench press"));
        assert!(too_similar("Bench Presss", "Bench Press"));
        assert!(!too_similar("Bench Pull", "Bench Press"));
    }
}
