use std::collections::HashMap;

use crate::db::{Db, comment_from_row, issue_from_row, now};
use crate::error::TrackerError;
use crate::store::{internal, merge_field};
use crate::types::{
    Comment, Issue, IssueFields, IssueId, IssueWithProject, IssueWithProjectAndComments, ProjectId,
    Status, StatusInput,
};
use crate::validate::{self, BLANK, MAX_STRING_LEN, NOT_INCLUDED, ValidationErrors};

pub struct IssueStore<'a> {
    db: &'a Db,
}

/// A fully validated set of issue columns, ready to write.
struct IssueDraft {
    title: String,
    description: String,
    assigned_to: String,
    status: Status,
}

impl IssueDraft {
    fn resolve(fields: &IssueFields, current: Option<&Issue>) -> Result<IssueDraft, TrackerError> {
        let title = merge_field(&fields.title, current.map(|i| i.title.as_str()));
        let description = merge_field(&fields.description, current.map(|i| i.description.as_str()));
        let assigned_to = merge_field(&fields.assigned_to, current.map(|i| i.assigned_to.as_str()));

        let mut errors = ValidationErrors::new();
        validate::presence(&mut errors, "title", title.as_deref());
        validate::max_length(&mut errors, "title", title.as_deref(), MAX_STRING_LEN);
        validate::presence(&mut errors, "description", description.as_deref());
        validate::presence(&mut errors, "assigned_to", assigned_to.as_deref());
        validate::max_length(&mut errors, "assigned_to", assigned_to.as_deref(), MAX_STRING_LEN);

        let status = match &fields.status {
            None => Some(current.map_or_else(Status::default, |i| i.status)),
            Some(None) => {
                errors.add("status", BLANK);
                None
            }
            Some(Some(StatusInput::Name(name))) if validate::is_blank(Some(name)) => {
                errors.add("status", BLANK);
                None
            }
            Some(Some(input)) => {
                let parsed = match input {
                    StatusInput::Name(name) => name.parse::<Status>().ok(),
                    StatusInput::Code(code) => Status::from_code(*code),
                };
                if parsed.is_none() {
                    errors.add("status", NOT_INCLUDED);
                }
                parsed
            }
        };

        errors.into_result()?;

        Ok(IssueDraft {
            title: title.unwrap_or_default(),
            description: description.unwrap_or_default(),
            assigned_to: assigned_to.unwrap_or_default(),
            status: status.unwrap_or_default(),
        })
    }
}

impl<'a> IssueStore<'a> {
    pub(crate) fn new(db: &'a Db) -> Self {
        IssueStore { db }
    }

    /// Unscoped lookup, for callers that only hold an issue id.
    pub fn find(&self, id: IssueId) -> Result<Issue, TrackerError> {
        self.db
            .conn
            .query_row(
                "SELECT * FROM issues WHERE id = ?1",
                rusqlite::params![id],
                issue_from_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => TrackerError::issue_not_found(id),
                other => TrackerError::Internal(format!("failed to get issue: {other}")),
            })
    }

    fn scoped(&self, project_id: ProjectId, id: IssueId) -> Result<Issue, TrackerError> {
        self.db
            .conn
            .query_row(
                "SELECT * FROM issues WHERE id = ?1 AND project_id = ?2",
                rusqlite::params![id, project_id],
                issue_from_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => TrackerError::issue_not_found(id),
                other => TrackerError::Internal(format!("failed to get issue: {other}")),
            })
    }

    pub fn list(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<IssueWithProjectAndComments>, TrackerError> {
        let project = self.db.projects().get(project_id)?;

        let mut issue_stmt = self
            .db
            .conn
            .prepare("SELECT * FROM issues WHERE project_id = ?1 ORDER BY id")
            .map_err(internal("failed to prepare issues query"))?;
        let issues = issue_stmt
            .query_map(rusqlite::params![project_id], issue_from_row)
            .map_err(internal("failed to query issues"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal("failed to read issues"))?;

        // One query for every comment in the project rather than one per issue.
        let mut comment_stmt = self
            .db
            .conn
            .prepare(
                "SELECT c.* FROM comments c
                 JOIN issues i ON i.id = c.issue_id
                 WHERE i.project_id = ?1
                 ORDER BY c.id",
            )
            .map_err(internal("failed to prepare comments query"))?;
        let mut comments_by_issue: HashMap<IssueId, Vec<Comment>> = HashMap::new();
        for comment in comment_stmt
            .query_map(rusqlite::params![project_id], comment_from_row)
            .map_err(internal("failed to query comments"))?
        {
            let comment = comment.map_err(internal("failed to read comments"))?;
            comments_by_issue
                .entry(comment.issue_id)
                .or_default()
                .push(comment);
        }

        Ok(issues
            .into_iter()
            .map(|issue| IssueWithProjectAndComments {
                comments: comments_by_issue.remove(&issue.id).unwrap_or_default(),
                project: project.clone(),
                issue,
            })
            .collect())
    }

    pub fn get(&self, project_id: ProjectId, id: IssueId) -> Result<Issue, TrackerError> {
        self.db.projects().get(project_id)?;
        self.scoped(project_id, id)
    }

    pub fn show(
        &self,
        project_id: ProjectId,
        id: IssueId,
    ) -> Result<IssueWithProjectAndComments, TrackerError> {
        let project = self.db.projects().get(project_id)?;
        let issue = self.scoped(project_id, id)?;
        let comments = self.db.comments().for_issue(issue.id)?;
        Ok(IssueWithProjectAndComments {
            issue,
            project,
            comments,
        })
    }

    pub fn create(
        &self,
        project_id: ProjectId,
        fields: &IssueFields,
    ) -> Result<IssueWithProject, TrackerError> {
        let project = self.db.projects().get(project_id)?;
        let draft = IssueDraft::resolve(fields, None)?;

        let ts = now();
        self.db
            .conn
            .execute(
                "INSERT INTO issues (title, description, assigned_to, status, project_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    draft.title,
                    draft.description,
                    draft.assigned_to,
                    draft.status.code(),
                    project_id,
                    ts,
                    ts,
                ],
            )
            .map_err(internal("failed to create issue"))?;

        let id = self.db.conn.last_insert_rowid();
        tracing::info!(project_id, issue_id = id, status = %draft.status, "issue created");

        Ok(IssueWithProject {
            issue: self.find(id)?,
            project,
        })
    }

    pub fn update(
        &self,
        project_id: ProjectId,
        id: IssueId,
        fields: &IssueFields,
    ) -> Result<IssueWithProject, TrackerError> {
        let project = self.db.projects().get(project_id)?;
        let current = self.scoped(project_id, id)?;
        if *fields == IssueFields::default() {
            return Ok(IssueWithProject {
                issue: current,
                project,
            });
        }

        let draft = IssueDraft::resolve(fields, Some(&current))?;

        self.db
            .conn
            .execute(
                "UPDATE issues
                 SET title = ?1, description = ?2, assigned_to = ?3, status = ?4, updated_at = ?5
                 WHERE id = ?6",
                rusqlite::params![
                    draft.title,
                    draft.description,
                    draft.assigned_to,
                    draft.status.code(),
                    now(),
                    id,
                ],
            )
            .map_err(internal("failed to update issue"))?;

        tracing::info!(project_id, issue_id = id, status = %draft.status, "issue updated");

        Ok(IssueWithProject {
            issue: self.find(id)?,
            project,
        })
    }

    /// Removes the issue; its comments cascade with it.
    pub fn delete(&self, project_id: ProjectId, id: IssueId) -> Result<(), TrackerError> {
        self.get(project_id, id)?;

        self.db
            .conn
            .execute("DELETE FROM issues WHERE id = ?1", rusqlite::params![id])
            .map_err(internal("failed to delete issue"))?;

        tracing::info!(project_id, issue_id = id, "issue deleted");
        Ok(())
    }
}
