use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::config::ServerConfig;
use crate::db::Db;
use crate::error::{ErrorResponse, TrackerError, ValidationResponse};
use crate::types::{CommentFields, IssueFields, ProjectFields};

type AppState = Arc<Mutex<Db>>;

enum AppError {
    Tracker(TrackerError),
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Tracker(TrackerError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
            AppError::Tracker(TrackerError::Validation(errors)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ValidationResponse { errors }),
            )
                .into_response(),
            AppError::Tracker(err @ TrackerError::Internal(_)) => {
                tracing::error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::from(&err)),
                )
                    .into_response()
            }
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: msg,
                    code: Some("bad_request".to_string()),
                }),
            )
                .into_response(),
        }
    }
}

impl From<TrackerError> for AppError {
    fn from(err: TrackerError) -> Self {
        AppError::Tracker(err)
    }
}

fn lock(state: &AppState) -> Result<MutexGuard<'_, Db>, AppError> {
    state
        .lock()
        .map_err(|_| TrackerError::Internal("database lock poisoned".to_string()).into())
}

/// Ids that do not parse cannot name a row, so they are reported as missing.
fn parse_id(raw: &str, kind: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| TrackerError::NotFound(format!("{kind} {raw}")).into())
}

type Body = Result<Json<Value>, JsonRejection>;

/// Reads the permitted fields from a body that is either flat or wrapped in
/// its resource key, e.g. `{"issue": {"title": ...}}`.
///
/// Callers resolve the target rows first so a missing parent reports 404
/// regardless of what the body holds.
fn permitted_body<T: DeserializeOwned>(body: Body, root: &str) -> Result<T, AppError> {
    let Json(value) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    permitted(value, root)
}

fn permitted<T: DeserializeOwned>(mut body: Value, root: &str) -> Result<T, AppError> {
    if body.get(root).is_some_and(Value::is_object) {
        let inner = body[root].take();
        body = inner;
    }
    serde_json::from_value(body).map_err(|e| AppError::BadRequest(format!("invalid {root} body: {e}")))
}

pub fn router(db: Db) -> Router {
    let state: AppState = Arc::new(Mutex::new(db));

    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(show_project)
                .patch(update_project)
                .put(update_project)
                .delete(delete_project),
        )
        .route(
            "/projects/{project_id}/issues",
            get(list_issues).post(create_issue),
        )
        .route(
            "/projects/{project_id}/issues/{id}",
            get(show_issue)
                .patch(update_issue)
                .put(update_issue)
                .delete(delete_issue),
        )
        .route(
            "/issues/{issue_id}/comments",
            get(list_comments).post(create_comment),
        )
        .route(
            "/issues/{issue_id}/comments/{id}",
            get(show_comment)
                .patch(update_comment)
                .put(update_comment)
                .delete(delete_comment),
        )
        .route("/status", get(status))
        .with_state(state)
}

pub async fn serve(config: ServerConfig) -> Result<(), TrackerError> {
    let db = config.open_db()?;
    let app = router(db);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TrackerError::Internal(format!("failed to bind {addr}: {e}")))?;

    tracing::info!("tracker listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TrackerError::Internal(format!("server error: {e}")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install ctrl+c handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

async fn status(State(db): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let db = lock(&db)?;
    Ok(Json(db.counts()?))
}

// --- Project endpoints ---

async fn list_projects(State(db): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let db = lock(&db)?;
    Ok(Json(db.projects().list()?))
}

async fn show_project(
    State(db): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "project")?;
    let db = lock(&db)?;
    Ok(Json(db.projects().get(id)?))
}

async fn create_project(
    State(db): State<AppState>,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let fields: ProjectFields = permitted_body(body, "project")?;
    let db = lock(&db)?;
    let project = db.projects().create(&fields)?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn update_project(
    State(db): State<AppState>,
    Path(id): Path<String>,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "project")?;
    let db = lock(&db)?;
    db.projects().get(id)?;
    let fields: ProjectFields = permitted_body(body, "project")?;
    Ok(Json(db.projects().update(id, &fields)?))
}

async fn delete_project(
    State(db): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "project")?;
    let db = lock(&db)?;
    db.projects().delete(id)?;
    Ok(Json(json!({ "message": "Project deleted successfully" })))
}

// --- Issue endpoints ---

async fn list_issues(
    State(db): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let project_id = parse_id(&project_id, "project")?;
    let db = lock(&db)?;
    Ok(Json(db.issues().list(project_id)?))
}

async fn show_issue(
    State(db): State<AppState>,
    Path((project_id, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let project_id = parse_id(&project_id, "project")?;
    let id = parse_id(&id, "issue")?;
    let db = lock(&db)?;
    Ok(Json(db.issues().show(project_id, id)?))
}

async fn create_issue(
    State(db): State<AppState>,
    Path(project_id): Path<String>,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let project_id = parse_id(&project_id, "project")?;
    let db = lock(&db)?;
    db.projects().get(project_id)?;
    let fields: IssueFields = permitted_body(body, "issue")?;
    let issue = db.issues().create(project_id, &fields)?;
    Ok((StatusCode::CREATED, Json(issue)))
}

async fn update_issue(
    State(db): State<AppState>,
    Path((project_id, id)): Path<(String, String)>,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let project_id = parse_id(&project_id, "project")?;
    let id = parse_id(&id, "issue")?;
    let db = lock(&db)?;
    db.issues().get(project_id, id)?;
    let fields: IssueFields = permitted_body(body, "issue")?;
    Ok(Json(db.issues().update(project_id, id, &fields)?))
}

async fn delete_issue(
    State(db): State<AppState>,
    Path((project_id, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let project_id = parse_id(&project_id, "project")?;
    let id = parse_id(&id, "issue")?;
    let db = lock(&db)?;
    db.issues().delete(project_id, id)?;
    Ok(Json(json!({ "message": "Issue deleted successfully" })))
}

// --- Comment endpoints ---

async fn list_comments(
    State(db): State<AppState>,
    Path(issue_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let issue_id = parse_id(&issue_id, "issue")?;
    let db = lock(&db)?;
    Ok(Json(db.comments().list(issue_id)?))
}

async fn show_comment(
    State(db): State<AppState>,
    Path((issue_id, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let issue_id = parse_id(&issue_id, "issue")?;
    let id = parse_id(&id, "comment")?;
    let db = lock(&db)?;
    Ok(Json(db.comments().show(issue_id, id)?))
}

async fn create_comment(
    State(db): State<AppState>,
    Path(issue_id): Path<String>,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let issue_id = parse_id(&issue_id, "issue")?;
    let db = lock(&db)?;
    db.issues().find(issue_id)?;
    let fields: CommentFields = permitted_body(body, "comment")?;
    let comment = db.comments().create(issue_id, &fields)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update_comment(
    State(db): State<AppState>,
    Path((issue_id, id)): Path<(String, String)>,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let issue_id = parse_id(&issue_id, "issue")?;
    let id = parse_id(&id, "comment")?;
    let db = lock(&db)?;
    db.comments().get(issue_id, id)?;
    let fields: CommentFields = permitted_body(body, "comment")?;
    Ok(Json(db.comments().update(issue_id, id, &fields)?))
}

async fn delete_comment(
    State(db): State<AppState>,
    Path((issue_id, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let issue_id = parse_id(&issue_id, "issue")?;
    let id = parse_id(&id, "comment")?;
    let db = lock(&db)?;
    db.comments().delete(issue_id, id)?;
    Ok(Json(json!({ "message": "Comment deleted successfully" })))
}
