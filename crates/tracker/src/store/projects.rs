use crate::db::{Db, now, project_from_row};
use crate::error::TrackerError;
use crate::store::internal;
use crate::types::{Project, ProjectFields, ProjectId};
use crate::validate::{self, ValidationErrors};

pub struct ProjectStore<'a> {
    db: &'a Db,
}

fn validate_name(name: Option<&str>) -> Result<(), TrackerError> {
    let mut errors = ValidationErrors::new();
    validate::presence(&mut errors, "name", name);
    errors.into_result()
}

impl<'a> ProjectStore<'a> {
    pub(crate) fn new(db: &'a Db) -> Self {
        ProjectStore { db }
    }

    pub fn list(&self) -> Result<Vec<Project>, TrackerError> {
        let mut stmt = self
            .db
            .conn
            .prepare("SELECT * FROM projects ORDER BY id")
            .map_err(internal("failed to prepare projects query"))?;
        stmt.query_map([], project_from_row)
            .map_err(internal("failed to query projects"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal("failed to read projects"))
    }

    pub fn get(&self, id: ProjectId) -> Result<Project, TrackerError> {
        self.db
            .conn
            .query_row(
                "SELECT * FROM projects WHERE id = ?1",
                rusqlite::params![id],
                project_from_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => TrackerError::project_not_found(id),
                other => TrackerError::Internal(format!("failed to get project: {other}")),
            })
    }

    pub fn create(&self, fields: &ProjectFields) -> Result<Project, TrackerError> {
        let name = fields.name.clone().flatten();
        validate_name(name.as_deref())?;

        let ts = now();
        self.db
            .conn
            .execute(
                "INSERT INTO projects (name, created_at, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![name, ts, ts],
            )
            .map_err(internal("failed to create project"))?;

        let id = self.db.conn.last_insert_rowid();
        tracing::info!(project_id = id, "project created");
        self.get(id)
    }

    pub fn update(&self, id: ProjectId, fields: &ProjectFields) -> Result<Project, TrackerError> {
        let project = self.get(id)?;
        let Some(name) = &fields.name else {
            return Ok(project);
        };
        validate_name(name.as_deref())?;

        self.db
            .conn
            .execute(
                "UPDATE projects SET name = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![name, now(), id],
            )
            .map_err(internal("failed to update project"))?;

        tracing::info!(project_id = id, "project updated");
        self.get(id)
    }

    /// Removes the project. Its issues and their comments go with it through
    /// `ON DELETE CASCADE`, inside the same statement.
    pub fn delete(&self, id: ProjectId) -> Result<(), TrackerError> {
        self.get(id)?;

        self.db
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", rusqlite::params![id])
            .map_err(internal("failed to delete project"))?;

        tracing::info!(project_id = id, "project deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CommentFields, IssueFields};
    use crate::validate::BLANK;

    #[test]
    fn create_and_get() {
        let db = Db::open_in_memory().unwrap();

        let project = db
            .projects()
            .create(&ProjectFields::named("Test Project"))
            .unwrap();
        assert!(project.id > 0);
        assert_eq!(project.name, "Test Project");

        let fetched = db.projects().get(project.id).unwrap();
        assert_eq!(fetched, project);
    }

    #[test]
    fn list_returns_storage_order() {
        let db = Db::open_in_memory().unwrap();
        for name in ["first", "second", "third"] {
            db.projects().create(&ProjectFields::named(name)).unwrap();
        }

        let names: Vec<String> = db
            .projects()
            .list()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn get_nonexistent() {
        let db = Db::open_in_memory().unwrap();
        let result = db.projects().get(9999);
        assert!(matches!(result, Err(TrackerError::NotFound(_))));
    }

    #[test]
    fn blank_name_is_rejected_and_not_persisted() {
        let db = Db::open_in_memory().unwrap();

        for fields in [
            ProjectFields::named(""),
            ProjectFields::named("   "),
            ProjectFields::default(),
            ProjectFields { name: Some(None) },
        ] {
            match db.projects().create(&fields) {
                Err(TrackerError::Validation(errors)) => assert_eq!(errors.get("name"), [BLANK]),
                other => panic!("expected validation failure, got {other:?}"),
            }
        }
        assert_eq!(db.counts().unwrap().projects, 0);
    }

    #[test]
    fn update_name() {
        let db = Db::open_in_memory().unwrap();
        let project = db.projects().create(&ProjectFields::named("old")).unwrap();

        let updated = db
            .projects()
            .update(project.id, &ProjectFields::named("Updated Project"))
            .unwrap();
        assert_eq!(updated.name, "Updated Project");
        assert!(updated.updated_at >= project.updated_at);
        assert_eq!(db.projects().get(project.id).unwrap().name, "Updated Project");
    }

    #[test]
    fn update_with_blank_name_keeps_stored_value() {
        let db = Db::open_in_memory().unwrap();
        let project = db.projects().create(&ProjectFields::named("keep")).unwrap();

        let result = db.projects().update(project.id, &ProjectFields::named(""));
        assert!(matches!(result, Err(TrackerError::Validation(_))));
        assert_eq!(db.projects().get(project.id).unwrap().name, "keep");
    }

    #[test]
    fn update_without_fields_is_a_no_op() {
        let db = Db::open_in_memory().unwrap();
        let project = db.projects().create(&ProjectFields::named("same")).unwrap();

        let unchanged = db
            .projects()
            .update(project.id, &ProjectFields::default())
            .unwrap();
        assert_eq!(unchanged, project);
    }

    #[test]
    fn update_and_delete_nonexistent() {
        let db = Db::open_in_memory().unwrap();
        assert!(matches!(
            db.projects().update(42, &ProjectFields::named("x")),
            Err(TrackerError::NotFound(_))
        ));
        assert!(matches!(
            db.projects().delete(42),
            Err(TrackerError::NotFound(_))
        ));
    }

    #[test]
    fn delete_cascades_to_issues_and_comments() {
        let db = Db::open_in_memory().unwrap();
        let doomed = db.projects().create(&ProjectFields::named("doomed")).unwrap();
        let kept = db.projects().create(&ProjectFields::named("kept")).unwrap();

        for project_id in [doomed.id, doomed.id, doomed.id, kept.id] {
            let issue = db
                .issues()
                .create(project_id, &IssueFields::new("t", "d", "a"))
                .unwrap();
            db.comments()
                .create(issue.issue.id, &CommentFields::with_text("c"))
                .unwrap();
        }

        let before = db.counts().unwrap();
        assert_eq!((before.issues, before.comments), (4, 4));

        db.projects().delete(doomed.id).unwrap();

        let after = db.counts().unwrap();
        assert_eq!(after.projects, 1);
        assert_eq!(after.issues, 1);
        assert_eq!(after.comments, 1);
        assert_eq!(db.issues().list(kept.id).unwrap().len(), 1);
        assert!(matches!(
            db.projects().get(doomed.id),
            Err(TrackerError::NotFound(_))
        ));
    }
}
