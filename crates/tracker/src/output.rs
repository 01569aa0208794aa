use serde_json::Value;

use crate::error::{ErrorResponse, TrackerError, ValidationResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Json,
    Human,
}

pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(_) => println!("{value}"),
    }
}

pub fn print_error(err: &TrackerError, mode: OutputMode) {
    match mode {
        OutputMode::Json => {
            let body = match err {
                TrackerError::Validation(errors) => serde_json::to_string(&ValidationResponse {
                    errors: errors.clone(),
                }),
                other => serde_json::to_string(&ErrorResponse::from(other)),
            };
            match body {
                Ok(s) => eprintln!("{s}"),
                Err(_) => eprintln!("error: {err}"),
            }
        }
        OutputMode::Human => {
            eprintln!("error: {err}");
        }
    }
}

fn str_field<'a>(value: &'a Value, key: &str, fallback: &'a str) -> &'a str {
    value[key].as_str().unwrap_or(fallback)
}

fn id_field(value: &Value) -> String {
    value["id"]
        .as_i64()
        .map_or_else(|| "?".to_string(), |id| id.to_string())
}

fn print_list(value: &Value, empty: &str, print_item: impl Fn(&Value)) {
    match value.as_array() {
        Some(arr) if arr.is_empty() => println!("{empty}"),
        Some(arr) => arr.iter().for_each(print_item),
        None => print_json(value),
    }
}

pub fn print_project(value: &Value, mode: OutputMode) {
    match mode {
        OutputMode::Json => print_json(value),
        OutputMode::Human => {
            let id = id_field(value);
            let name = str_field(value, "name", "?");
            println!("#{id}  {name}");
        }
    }
}

pub fn print_project_list(value: &Value, mode: OutputMode) {
    match mode {
        OutputMode::Json => print_json(value),
        OutputMode::Human => print_list(value, "(no projects)", |p| {
            print_project(p, OutputMode::Human)
        }),
    }
}

pub fn print_issue(value: &Value, mode: OutputMode) {
    match mode {
        OutputMode::Json => print_json(value),
        OutputMode::Human => {
            let id = id_field(value);
            let title = str_field(value, "title", "?");
            let status = str_field(value, "status", "?");
            let assigned_to = str_field(value, "assigned_to", "-");
            println!("#{id}  {status:<8} {title}  @{assigned_to}");
        }
    }
}

pub fn print_issue_detail(value: &Value, mode: OutputMode) {
    match mode {
        OutputMode::Json => print_json(value),
        OutputMode::Human => {
            print_issue(value, OutputMode::Human);

            let project = str_field(&value["project"], "name", "?");
            let created = str_field(value, "created_at", "?");
            println!("  project: {project}  created: {created}");
            if let Some(desc) = value["description"].as_str() {
                println!("  description: {desc}");
            }

            if let Some(comments) = value["comments"].as_array()
                && !comments.is_empty()
            {
                println!("  comments:");
                for c in comments {
                    let at = str_field(c, "created_at", "?");
                    let text = str_field(c, "text", "");
                    println!("    [{at}] {text}");
                }
            }
        }
    }
}

pub fn print_issue_list(value: &Value, mode: OutputMode) {
    match mode {
        OutputMode::Json => print_json(value),
        OutputMode::Human => print_list(value, "(no issues)", |i| {
            print_issue(i, OutputMode::Human)
        }),
    }
}

pub fn print_comment(value: &Value, mode: OutputMode) {
    match mode {
        OutputMode::Json => print_json(value),
        OutputMode::Human => {
            let id = id_field(value);
            let at = str_field(value, "created_at", "?");
            let text = str_field(value, "text", "");
            println!("#{id}  [{at}] {text}");
        }
    }
}

pub fn print_comment_list(value: &Value, mode: OutputMode) {
    match mode {
        OutputMode::Json => print_json(value),
        OutputMode::Human => print_list(value, "(no comments)", |c| {
            print_comment(c, OutputMode::Human)
        }),
    }
}

pub fn print_message(value: &Value, mode: OutputMode) {
    match mode {
        OutputMode::Json => print_json(value),
        OutputMode::Human => println!("{}", str_field(value, "message", "ok")),
    }
}

pub fn print_status(value: &Value, mode: OutputMode) {
    match mode {
        OutputMode::Json => print_json(value),
        OutputMode::Human => {
            let count = |key: &str| value[key].as_i64().unwrap_or(0);
            println!(
                "projects: {}  issues: {}  comments: {}",
                count("projects"),
                count("issues"),
                count("comments")
            );
        }
    }
}
