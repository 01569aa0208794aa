use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub type ProjectId = i64;
pub type IssueId = i64;
pub type CommentId = i64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    ToDo,
    Active,
    OnHold,
    Resolved,
}

/// Fixed mapping between status names and the integers stored in `issues.status`.
const STATUS_CODES: [(Status, i64); 4] = [
    (Status::ToDo, 0),
    (Status::Active, 1),
    (Status::OnHold, 2),
    (Status::Resolved, 3),
];

impl Status {
    pub const ALL: [Status; 4] = [
        Status::ToDo,
        Status::Active,
        Status::OnHold,
        Status::Resolved,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::ToDo => "to_do",
            Status::Active => "active",
            Status::OnHold => "on_hold",
            Status::Resolved => "resolved",
        }
    }

    pub fn code(self) -> i64 {
        STATUS_CODES[self as usize].1
    }

    pub fn from_code(code: i64) -> Option<Status> {
        STATUS_CODES
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(status, _)| *status)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown status: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    pub description: String,
    pub assigned_to: String,
    pub status: Status,
    pub project_id: ProjectId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    pub issue_id: IssueId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Response shapes ---

/// Issue as returned by create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueWithProject {
    #[serde(flatten)]
    pub issue: Issue,
    pub project: Project,
}

/// Issue as returned by list and show.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueWithProjectAndComments {
    #[serde(flatten)]
    pub issue: Issue,
    pub project: Project,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithIssue {
    #[serde(flatten)]
    pub comment: Comment,
    pub issue: Issue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub projects: i64,
    pub issues: i64,
    pub comments: i64,
}

// --- Input field sets ---
//
// Each field is `None` when the key was absent, `Some(None)` when it was an
// explicit null, and `Some(Some(v))` otherwise. Updates leave absent fields
// untouched; creates treat them as blank.

fn explicit<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A status as submitted: either its name or its stored integer code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StatusInput {
    Name(String),
    Code(i64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProjectFields {
    #[serde(default, deserialize_with = "explicit")]
    pub name: Option<Option<String>>,
}

impl ProjectFields {
    pub fn named(name: impl Into<String>) -> Self {
        ProjectFields {
            name: Some(Some(name.into())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IssueFields {
    #[serde(default, deserialize_with = "explicit")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub assigned_to: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub status: Option<Option<StatusInput>>,
}

impl IssueFields {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        assigned_to: impl Into<String>,
    ) -> Self {
        IssueFields::default()
            .with_title(title)
            .with_description(description)
            .with_assigned_to(assigned_to)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(Some(title.into()));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }

    pub fn with_assigned_to(mut self, assigned_to: impl Into<String>) -> Self {
        self.assigned_to = Some(Some(assigned_to.into()));
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(Some(StatusInput::Name(status.into())));
        self
    }

    pub fn with_status_code(mut self, code: i64) -> Self {
        self.status = Some(Some(StatusInput::Code(code)));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommentFields {
    #[serde(default, deserialize_with = "explicit")]
    pub text: Option<Option<String>>,
}

impl CommentFields {
    pub fn with_text(text: impl Into<String>) -> Self {
        CommentFields {
            text: Some(Some(text.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_fixed() {
        assert_eq!(Status::ToDo.code(), 0);
        assert_eq!(Status::Active.code(), 1);
        assert_eq!(Status::OnHold.code(), 2);
        assert_eq!(Status::Resolved.code(), 3);
        assert_eq!(Status::from_code(2), Some(Status::OnHold));
        assert_eq!(Status::from_code(4), None);
        assert_eq!(Status::from_code(-1), None);
    }

    #[test]
    fn status_serializes_as_name() {
        let json = serde_json::to_value(Status::OnHold).unwrap();
        assert_eq!(json, "on_hold");
        assert_eq!("to_do".parse::<Status>().unwrap(), Status::ToDo);
        assert!("done".parse::<Status>().is_err());
        assert!("ToDo".parse::<Status>().is_err());
    }

    #[test]
    fn fields_distinguish_absent_from_null() {
        let absent: IssueFields = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert_eq!(absent.title, Some(Some("x".to_string())));
        assert_eq!(absent.description, None);

        let null: IssueFields = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(null.description, Some(None));
        assert_eq!(null.title, None);
    }

    #[test]
    fn code_table_is_indexed_by_variant() {
        for (status, code) in STATUS_CODES {
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn status_field_accepts_names_and_codes() {
        let named: IssueFields = serde_json::from_str(r#"{"status": "active"}"#).unwrap();
        assert_eq!(named.status, Some(Some(StatusInput::Name("active".into()))));

        let coded: IssueFields = serde_json::from_str(r#"{"status": 7}"#).unwrap();
        assert_eq!(coded.status, Some(Some(StatusInput::Code(7))));
    }

    #[test]
    fn fields_ignore_unpermitted_keys() {
        let fields: CommentFields =
            serde_json::from_str(r#"{"text": "hi", "issue_id": 42, "id": 7}"#).unwrap();
        assert_eq!(fields, CommentFields::with_text("hi"));
    }

    #[test]
    fn embedded_issue_flattens_record_fields() {
        let ts = Utc::now();
        let project = Project {
            id: 1,
            name: "alpha".into(),
            created_at: ts,
            updated_at: ts,
        };
        let issue = Issue {
            id: 3,
            title: "t".into(),
            description: "d".into(),
            assigned_to: "a".into(),
            status: Status::Active,
            project_id: 1,
            created_at: ts,
            updated_at: ts,
        };
        let value = serde_json::to_value(IssueWithProject { issue, project }).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["status"], "active");
        assert_eq!(value["project"]["name"], "alpha");
    }
}
