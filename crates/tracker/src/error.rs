use serde::{Deserialize, Serialize};
use std::fmt;

use crate::validate::ValidationErrors;

#[derive(Debug)]
pub enum TrackerError {
    NotFound(String),
    Validation(ValidationErrors),
    Internal(String),
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::NotFound(what) => write!(f, "not found: {what}"),
            TrackerError::Validation(errors) => write!(f, "validation failed: {errors}"),
            TrackerError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for TrackerError {}

impl TrackerError {
    pub fn code(&self) -> Option<&'static str> {
        match self {
            TrackerError::NotFound(_) => Some("not_found"),
            TrackerError::Validation(_) => Some("validation_failed"),
            TrackerError::Internal(_) => None,
        }
    }

    pub fn project_not_found(id: i64) -> Self {
        TrackerError::NotFound(format!("project {id}"))
    }

    pub fn issue_not_found(id: i64) -> Self {
        TrackerError::NotFound(format!("issue {id}"))
    }

    pub fn comment_not_found(id: i64) -> Self {
        TrackerError::NotFound(format!("comment {id}"))
    }
}

/// Body for failures that carry a message. Validation failures use
/// `{"errors": {...}}` instead, and NotFound has no body at all.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<&TrackerError> for ErrorResponse {
    fn from(err: &TrackerError) -> Self {
        ErrorResponse {
            error: err.to_string(),
            code: err.code().map(String::from),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub errors: ValidationErrors,
}
