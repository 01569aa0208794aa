use crate::db::{Db, comment_from_row, now};
use crate::error::TrackerError;
use crate::store::internal;
use crate::types::{Comment, CommentFields, CommentId, CommentWithIssue, IssueId};
use crate::validate::{self, ValidationErrors};

pub struct CommentStore<'a> {
    db: &'a Db,
}

fn validate_text(text: Option<&str>) -> Result<(), TrackerError> {
    let mut errors = ValidationErrors::new();
    validate::presence(&mut errors, "text", text);
    errors.into_result()
}

impl<'a> CommentStore<'a> {
    pub(crate) fn new(db: &'a Db) -> Self {
        CommentStore { db }
    }

    pub(crate) fn for_issue(&self, issue_id: IssueId) -> Result<Vec<Comment>, TrackerError> {
        let mut stmt = self
            .db
            .conn
            .prepare("SELECT * FROM comments WHERE issue_id = ?1 ORDER BY id")
            .map_err(internal("failed to prepare comments query"))?;
        stmt.query_map(rusqlite::params![issue_id], comment_from_row)
            .map_err(internal("failed to query comments"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal("failed to read comments"))
    }

    fn scoped(&self, issue_id: IssueId, id: CommentId) -> Result<Comment, TrackerError> {
        self.db
            .conn
            .query_row(
                "SELECT * FROM comments WHERE id = ?1 AND issue_id = ?2",
                rusqlite::params![id, issue_id],
                comment_from_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => TrackerError::comment_not_found(id),
                other => TrackerError::Internal(format!("failed to get comment: {other}")),
            })
    }

    pub fn list(&self, issue_id: IssueId) -> Result<Vec<CommentWithIssue>, TrackerError> {
        let issue = self.db.issues().find(issue_id)?;
        Ok(self
            .for_issue(issue_id)?
            .into_iter()
            .map(|comment| CommentWithIssue {
                comment,
                issue: issue.clone(),
            })
            .collect())
    }

    pub fn get(&self, issue_id: IssueId, id: CommentId) -> Result<Comment, TrackerError> {
        self.db.issues().find(issue_id)?;
        self.scoped(issue_id, id)
    }

    pub fn show(&self, issue_id: IssueId, id: CommentId) -> Result<CommentWithIssue, TrackerError> {
        let issue = self.db.issues().find(issue_id)?;
        let comment = self.scoped(issue_id, id)?;
        Ok(CommentWithIssue { comment, issue })
    }

    pub fn create(
        &self,
        issue_id: IssueId,
        fields: &CommentFields,
    ) -> Result<CommentWithIssue, TrackerError> {
        let issue = self.db.issues().find(issue_id)?;
        let text = fields.text.clone().flatten();
        validate_text(text.as_deref())?;

        let ts = now();
        self.db
            .conn
            .execute(
                "INSERT INTO comments (text, issue_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![text, issue_id, ts, ts],
            )
            .map_err(internal("failed to create comment"))?;

        let id = self.db.conn.last_insert_rowid();
        tracing::info!(issue_id, comment_id = id, "comment created");

        Ok(CommentWithIssue {
            comment: self.scoped(issue_id, id)?,
            issue,
        })
    }

    pub fn update(
        &self,
        issue_id: IssueId,
        id: CommentId,
        fields: &CommentFields,
    ) -> Result<CommentWithIssue, TrackerError> {
        let issue = self.db.issues().find(issue_id)?;
        let comment = self.scoped(issue_id, id)?;
        let Some(text) = &fields.text else {
            return Ok(CommentWithIssue { comment, issue });
        };
        validate_text(text.as_deref())?;

        self.db
            .conn
            .execute(
                "UPDATE comments SET text = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![text, now(), id],
            )
            .map_err(internal("failed to update comment"))?;

        tracing::info!(issue_id, comment_id = id, "comment updated");

        Ok(CommentWithIssue {
            comment: self.scoped(issue_id, id)?,
            issue,
        })
    }

    pub fn delete(&self, issue_id: IssueId, id: CommentId) -> Result<(), TrackerError> {
        self.get(issue_id, id)?;

        self.db
            .conn
            .execute("DELETE FROM comments WHERE id = ?1", rusqlite::params![id])
            .map_err(internal("failed to delete comment"))?;

        tracing::info!(issue_id, comment_id = id, "comment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IssueFields, ProjectFields};
    use crate::validate::BLANK;

    fn setup() -> (Db, IssueId) {
        let db = Db::open_in_memory().unwrap();
        let project = db
            .projects()
            .create(&ProjectFields::named("Test Project"))
            .unwrap();
        let issue = db
            .issues()
            .create(
                project.id,
                &IssueFields::new("Test Issue", "Test Description", "Test User"),
            )
            .unwrap();
        (db, issue.issue.id)
    }

    #[test]
    fn create_and_list() {
        let (db, issue_id) = setup();

        let created = db
            .comments()
            .create(issue_id, &CommentFields::with_text("Test comment"))
            .unwrap();
        assert!(created.comment.id > 0);
        assert_eq!(created.comment.text, "Test comment");
        assert_eq!(created.issue.id, issue_id);

        let listed = db.comments().list(issue_id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].comment.text, "Test comment");
        assert_eq!(listed[0].issue.id, issue_id);
    }

    #[test]
    fn blank_text_is_rejected_and_not_persisted() {
        let (db, issue_id) = setup();

        match db.comments().create(issue_id, &CommentFields::with_text("")) {
            Err(TrackerError::Validation(errors)) => assert_eq!(errors.get("text"), [BLANK]),
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(db.counts().unwrap().comments, 0);
    }

    #[test]
    fn list_is_scoped_to_issue() {
        let (db, issue_id) = setup();
        let project_id = db.issues().find(issue_id).unwrap().project_id;
        let other = db
            .issues()
            .create(project_id, &IssueFields::new("Other Issue", "d", "a"))
            .unwrap();
        db.comments()
            .create(issue_id, &CommentFields::with_text("mine"))
            .unwrap();
        let foreign = db
            .comments()
            .create(other.issue.id, &CommentFields::with_text("Other comment"))
            .unwrap();

        let listed = db.comments().list(issue_id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].comment.text, "mine");

        assert!(matches!(
            db.comments().get(issue_id, foreign.comment.id),
            Err(TrackerError::NotFound(_))
        ));
        assert!(matches!(
            db.comments().list(9999),
            Err(TrackerError::NotFound(_))
        ));
    }

    #[test]
    fn update_text() {
        let (db, issue_id) = setup();
        let created = db
            .comments()
            .create(issue_id, &CommentFields::with_text("before"))
            .unwrap();

        let updated = db
            .comments()
            .update(
                issue_id,
                created.comment.id,
                &CommentFields::with_text("Updated comment"),
            )
            .unwrap();
        assert_eq!(updated.comment.text, "Updated comment");
        assert_eq!(
            db.comments().get(issue_id, created.comment.id).unwrap().text,
            "Updated comment"
        );

        let rejected = db
            .comments()
            .update(issue_id, created.comment.id, &CommentFields { text: Some(None) });
        assert!(matches!(rejected, Err(TrackerError::Validation(_))));
        assert_eq!(
            db.comments().show(issue_id, created.comment.id).unwrap().comment.text,
            "Updated comment"
        );
    }

    #[test]
    fn delete_is_a_leaf_operation() {
        let (db, issue_id) = setup();
        let created = db
            .comments()
            .create(issue_id, &CommentFields::with_text("bye"))
            .unwrap();

        db.comments().delete(issue_id, created.comment.id).unwrap();

        let counts = db.counts().unwrap();
        assert_eq!(counts.comments, 0);
        assert_eq!(counts.issues, 1);
        assert!(matches!(
            db.comments().delete(issue_id, created.comment.id),
            Err(TrackerError::NotFound(_))
        ));
    }
}
