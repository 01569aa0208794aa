use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde_json::{Value, json};

use crate::config::default_server_url;
use crate::error::{ErrorResponse, TrackerError, ValidationResponse};

pub struct Client {
    http: HttpClient,
    base_url: String,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    pub fn new() -> Self {
        Self::with_base_url(default_server_url())
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Client {
            http: HttpClient::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn check_reachable(&self) -> Result<(), String> {
        match self.http.get(self.url("/status")).send() {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(format!("server returned status {}", resp.status())),
            Err(e) => Err(format!("cannot reach server at {}: {}", self.base_url, e)),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn parse_error(resp: Response, path: &str) -> TrackerError {
        match resp.status() {
            StatusCode::NOT_FOUND => TrackerError::NotFound(path.to_string()),
            StatusCode::UNPROCESSABLE_ENTITY => match resp.json::<ValidationResponse>() {
                Ok(body) => TrackerError::Validation(body.errors),
                Err(e) => TrackerError::Internal(format!("unreadable validation response: {e}")),
            },
            status => match resp.json::<ErrorResponse>() {
                Ok(body) => TrackerError::Internal(body.error),
                Err(_) => TrackerError::Internal(format!("server returned status {status}")),
            },
        }
    }

    fn send(&self, req: RequestBuilder, path: &str) -> Result<Value, TrackerError> {
        let resp = req
            .send()
            .map_err(|e| TrackerError::Internal(e.to_string()))?;

        if resp.status().is_success() {
            resp.json().map_err(|e| TrackerError::Internal(e.to_string()))
        } else {
            Err(Self::parse_error(resp, path))
        }
    }

    fn get(&self, path: &str) -> Result<Value, TrackerError> {
        self.send(self.http.get(self.url(path)), path)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, TrackerError> {
        self.send(self.http.post(self.url(path)).json(body), path)
    }

    fn patch(&self, path: &str, body: &Value) -> Result<Value, TrackerError> {
        self.send(self.http.patch(self.url(path)).json(body), path)
    }

    fn delete(&self, path: &str) -> Result<Value, TrackerError> {
        self.send(self.http.delete(self.url(path)), path)
    }

    pub fn status(&self) -> Result<Value, TrackerError> {
        self.get("/status")
    }

    // --- Projects ---

    pub fn list_projects(&self) -> Result<Value, TrackerError> {
        self.get("/projects")
    }

    pub fn get_project(&self, id: i64) -> Result<Value, TrackerError> {
        self.get(&format!("/projects/{id}"))
    }

    pub fn create_project(&self, name: &str) -> Result<Value, TrackerError> {
        self.post("/projects", &json!({ "project": { "name": name } }))
    }

    pub fn update_project(&self, id: i64, name: &str) -> Result<Value, TrackerError> {
        self.patch(
            &format!("/projects/{id}"),
            &json!({ "project": { "name": name } }),
        )
    }

    pub fn delete_project(&self, id: i64) -> Result<Value, TrackerError> {
        self.delete(&format!("/projects/{id}"))
    }

    // --- Issues ---

    pub fn list_issues(&self, project_id: i64) -> Result<Value, TrackerError> {
        self.get(&format!("/projects/{project_id}/issues"))
    }

    pub fn get_issue(&self, project_id: i64, id: i64) -> Result<Value, TrackerError> {
        self.get(&format!("/projects/{project_id}/issues/{id}"))
    }

    pub fn create_issue(&self, project_id: i64, fields: &Value) -> Result<Value, TrackerError> {
        self.post(
            &format!("/projects/{project_id}/issues"),
            &json!({ "issue": fields }),
        )
    }

    pub fn update_issue(
        &self,
        project_id: i64,
        id: i64,
        fields: &Value,
    ) -> Result<Value, TrackerError> {
        self.patch(
            &format!("/projects/{project_id}/issues/{id}"),
            &json!({ "issue": fields }),
        )
    }

    pub fn delete_issue(&self, project_id: i64, id: i64) -> Result<Value, TrackerError> {
        self.delete(&format!("/projects/{project_id}/issues/{id}"))
    }

    // --- Comments ---

    pub fn list_comments(&self, issue_id: i64) -> Result<Value, TrackerError> {
        self.get(&format!("/issues/{issue_id}/comments"))
    }

    pub fn get_comment(&self, issue_id: i64, id: i64) -> Result<Value, TrackerError> {
        self.get(&format!("/issues/{issue_id}/comments/{id}"))
    }

    pub fn create_comment(&self, issue_id: i64, text: &str) -> Result<Value, TrackerError> {
        self.post(
            &format!("/issues/{issue_id}/comments"),
            &json!({ "comment": { "text": text } }),
        )
    }

    pub fn update_comment(&self, issue_id: i64, id: i64, text: &str) -> Result<Value, TrackerError> {
        self.patch(
            &format!("/issues/{issue_id}/comments/{id}"),
            &json!({ "comment": { "text": text } }),
        )
    }

    pub fn delete_comment(&self, issue_id: i64, id: i64) -> Result<Value, TrackerError> {
        self.delete(&format!("/issues/{issue_id}/comments/{id}"))
    }
}
