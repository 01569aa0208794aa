use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rusqlite::types::Type;

use crate::error::TrackerError;
use crate::store::{CommentStore, IssueStore, ProjectStore};
use crate::types::{Comment, Counts, Issue, Project, Status};

pub struct Db {
    pub conn: Connection,
    pub path: Option<PathBuf>,
}

fn parse_dt(idx: usize, s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamps(row: &rusqlite::Row) -> Result<(DateTime<Utc>, DateTime<Utc>), rusqlite::Error> {
    let created_idx = row.as_ref().column_index("created_at")?;
    let updated_idx = row.as_ref().column_index("updated_at")?;
    let created_at: String = row.get(created_idx)?;
    let updated_at: String = row.get(updated_idx)?;
    Ok((
        parse_dt(created_idx, &created_at)?,
        parse_dt(updated_idx, &updated_at)?,
    ))
}

pub(crate) fn project_from_row(row: &rusqlite::Row) -> Result<Project, rusqlite::Error> {
    let (created_at, updated_at) = timestamps(row)?;
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at,
        updated_at,
    })
}

pub(crate) fn issue_from_row(row: &rusqlite::Row) -> Result<Issue, rusqlite::Error> {
    let status_idx = row.as_ref().column_index("status")?;
    let code: i64 = row.get(status_idx)?;
    let status = Status::from_code(code).ok_or(rusqlite::Error::IntegralValueOutOfRange(
        status_idx, code,
    ))?;
    let (created_at, updated_at) = timestamps(row)?;

    Ok(Issue {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        assigned_to: row.get("assigned_to")?,
        status,
        project_id: row.get("project_id")?,
        created_at,
        updated_at,
    })
}

pub(crate) fn comment_from_row(row: &rusqlite::Row) -> Result<Comment, rusqlite::Error> {
    let (created_at, updated_at) = timestamps(row)?;
    Ok(Comment {
        id: row.get("id")?,
        text: row.get("text")?,
        issue_id: row.get("issue_id")?,
        created_at,
        updated_at,
    })
}

impl Db {
    pub fn open(data_dir: &Path) -> Result<Db, TrackerError> {
        let tracker_dir = data_dir.join(".tracker");
        fs::create_dir_all(&tracker_dir)
            .map_err(|e| TrackerError::Internal(format!("failed to create .tracker dir: {e}")))?;

        let db_path = tracker_dir.join("tracker.sqlite");
        let conn = Connection::open(&db_path)
            .map_err(|e| TrackerError::Internal(format!("failed to open database: {e}")))?;

        Self::configure(&conn)?;
        Self::run_migrations(&conn)?;

        tracing::info!(path = %db_path.display(), "database opened");
        Ok(Db {
            conn,
            path: Some(db_path),
        })
    }

    pub fn open_in_memory() -> Result<Db, TrackerError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| TrackerError::Internal(format!("failed to open database: {e}")))?;

        Self::configure(&conn)?;
        Self::run_migrations(&conn)?;

        tracing::info!("in-memory database opened");
        Ok(Db { conn, path: None })
    }

    fn configure(conn: &Connection) -> Result<(), TrackerError> {
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| TrackerError::Internal(format!("failed to set busy_timeout: {e}")))?;
        // Cascading deletes depend on this; SQLite leaves it off per connection.
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| TrackerError::Internal(format!("failed to enable foreign_keys: {e}")))?;
        Ok(())
    }

    fn run_migrations(conn: &Connection) -> Result<(), TrackerError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS projects (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                name       TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS issues (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL CHECK (length(title) <= 255),
                description TEXT NOT NULL,
                assigned_to TEXT NOT NULL CHECK (length(assigned_to) <= 255),
                status      INTEGER NOT NULL DEFAULT 0 CHECK (status IN (0, 1, 2, 3)),
                project_id  INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_issues_project_id ON issues(project_id);

            CREATE TABLE IF NOT EXISTS comments (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                text       TEXT NOT NULL,
                issue_id   INTEGER NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_comments_issue_id ON comments(issue_id);",
        )
        .map_err(|e| TrackerError::Internal(format!("migration failed: {e}")))?;

        Ok(())
    }

    pub fn projects(&self) -> ProjectStore<'_> {
        ProjectStore::new(self)
    }

    pub fn issues(&self) -> IssueStore<'_> {
        IssueStore::new(self)
    }

    pub fn comments(&self) -> CommentStore<'_> {
        CommentStore::new(self)
    }

    pub fn counts(&self) -> Result<Counts, TrackerError> {
        self.conn
            .query_row(
                "SELECT
                    (SELECT COUNT(*) FROM projects),
                    (SELECT COUNT(*) FROM issues),
                    (SELECT COUNT(*) FROM comments)",
                [],
                |row| {
                    Ok(Counts {
                        projects: row.get(0)?,
                        issues: row.get(1)?,
                        comments: row.get(2)?,
                    })
                },
            )
            .map_err(|e| TrackerError::Internal(format!("failed to count rows: {e}")))
    }
}

pub fn now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp_db() -> (Db, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Db::open(dir.path()).unwrap();
        (db, dir)
    }

    #[test]
    fn open_creates_tables() {
        let (db, _dir) = open_temp_db();

        let tables: Vec<String> = db
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert!(tables.contains(&"projects".to_string()));
        assert!(tables.contains(&"issues".to_string()));
        assert!(tables.contains(&"comments".to_string()));
        assert!(db.path.as_ref().unwrap().ends_with(".tracker/tracker.sqlite"));
    }

    #[test]
    fn open_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let db1 = Db::open(dir.path()).unwrap();
        db1.conn
            .execute(
                "INSERT INTO projects (name, created_at, updated_at) VALUES ('kept', ?1, ?1)",
                [now()],
            )
            .unwrap();
        drop(db1);

        let db2 = Db::open(dir.path()).unwrap();
        assert_eq!(db2.counts().unwrap().projects, 1);
    }

    #[test]
    fn foreign_keys_enforced() {
        let db = Db::open_in_memory().unwrap();

        let result = db.conn.execute(
            "INSERT INTO issues (title, description, assigned_to, project_id, created_at, updated_at)
             VALUES ('t', 'd', 'a', 9999, ?1, ?1)",
            [now()],
        );

        assert!(
            result.is_err(),
            "should reject issue referencing nonexistent project"
        );
    }

    #[test]
    fn status_column_defaults_to_zero_and_rejects_unknown_codes() {
        let db = Db::open_in_memory().unwrap();
        let ts = now();
        db.conn
            .execute(
                "INSERT INTO projects (name, created_at, updated_at) VALUES ('p', ?1, ?1)",
                [&ts],
            )
            .unwrap();
        let project_id = db.conn.last_insert_rowid();
        db.conn
            .execute(
                "INSERT INTO issues (title, description, assigned_to, project_id, created_at, updated_at)
                 VALUES ('t', 'd', 'a', ?1, ?2, ?2)",
                rusqlite::params![project_id, ts],
            )
            .unwrap();

        let code: i64 = db
            .conn
            .query_row("SELECT status FROM issues", [], |row| row.get(0))
            .unwrap();
        assert_eq!(code, 0);

        let result = db.conn.execute("UPDATE issues SET status = 7", []);
        assert!(result.is_err(), "status outside 0..=3 should be rejected");
    }

    #[test]
    fn counts_start_at_zero() {
        let db = Db::open_in_memory().unwrap();
        assert_eq!(
            db.counts().unwrap(),
            Counts {
                projects: 0,
                issues: 0,
                comments: 0
            }
        );
    }
}
