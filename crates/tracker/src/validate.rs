//! Field validation shared by the three stores.
//!
//! Rules collect every failure before returning so that a response lists all
//! offending fields at once.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

pub const BLANK: &str = "can't be blank";
pub const NOT_INCLUDED: &str = "is not included in the list";
pub const MAX_STRING_LEN: usize = 255;

pub fn too_long(max: usize) -> String {
    format!("is too long (maximum is {max} characters)")
}

/// Messages keyed by field name, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_result(self) -> Result<(), TrackerError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(TrackerError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field} {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

pub fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

pub fn presence(errors: &mut ValidationErrors, field: &str, value: Option<&str>) {
    if is_blank(value) {
        errors.add(field, BLANK);
    }
}

pub fn max_length(errors: &mut ValidationErrors, field: &str, value: Option<&str>, max: usize) {
    if let Some(v) = value
        && v.chars().count() > max
    {
        errors.add(field, too_long(max));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_covers_missing_empty_and_whitespace() {
        assert!(is_blank(None));
        assert!(is_blank(Some("")));
        assert!(is_blank(Some("  \t\n")));
        assert!(!is_blank(Some(" x ")));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let mut errors = ValidationErrors::new();
        let accented = "é".repeat(MAX_STRING_LEN);
        max_length(&mut errors, "title", Some(&accented), MAX_STRING_LEN);
        assert!(errors.is_empty());

        let over = "a".repeat(MAX_STRING_LEN + 1);
        max_length(&mut errors, "title", Some(&over), MAX_STRING_LEN);
        assert_eq!(
            errors.get("title"),
            ["is too long (maximum is 255 characters)"]
        );
    }

    #[test]
    fn collects_every_failing_field() {
        let mut errors = ValidationErrors::new();
        presence(&mut errors, "title", Some(""));
        presence(&mut errors, "description", None);
        presence(&mut errors, "assigned_to", Some("someone"));

        assert_eq!(errors.fields().collect::<Vec<_>>(), ["description", "title"]);
        assert_eq!(errors.get("title"), [BLANK]);
        assert!(errors.get("assigned_to").is_empty());
        assert!(matches!(
            errors.into_result(),
            Err(TrackerError::Validation(_))
        ));
    }

    #[test]
    fn serializes_as_plain_map() {
        let mut errors = ValidationErrors::new();
        errors.add("text", BLANK);
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "text": ["can't be blank"] }));
        assert_eq!(errors.to_string(), "text can't be blank");
    }
}
