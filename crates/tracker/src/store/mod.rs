//! Per-resource stores over the shared [`Db`](crate::db::Db) connection.
//!
//! Each store resolves its ancestors before touching its own table, so a
//! missing parent always surfaces as `NotFound` ahead of any validation.

mod comments;
mod issues;
mod projects;

pub use comments::CommentStore;
pub use issues::IssueStore;
pub use projects::ProjectStore;

use crate::error::TrackerError;

pub(crate) fn internal(context: &'static str) -> impl FnOnce(rusqlite::Error) -> TrackerError {
    move |e| TrackerError::Internal(format!("{context}: {e}"))
}

/// Supplied value wins; an absent field falls back to the stored one.
pub(crate) fn merge_field(input: &Option<Option<String>>, current: Option<&str>) -> Option<String> {
    match input {
        Some(value) => value.clone(),
        None => current.map(str::to_string),
    }
}
