use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use tracker::client::Client;
use tracker::config::{DEFAULT_HOST, DEFAULT_PORT, ServerConfig, Storage};
use tracker::error::TrackerError;
use tracker::output::{self, OutputMode};

#[derive(Parser)]
#[command(name = "trk", about = "Projects, issues and comments over HTTP")]
struct Cli {
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server.
    Serve {
        #[arg(long, env = "TRK_HOST", default_value = DEFAULT_HOST)]
        host: String,
        #[arg(long, env = "TRK_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(long, env = "TRK_DATA_DIR", conflicts_with = "in_memory")]
        data_dir: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        in_memory: bool,
    },
    /// Row counts on the configured server.
    Status,
    Project {
        #[command(subcommand)]
        subcmd: ProjectSubcommand,
    },
    Issue {
        #[command(subcommand)]
        subcmd: IssueSubcommand,
    },
    Comment {
        #[command(subcommand)]
        subcmd: CommentSubcommand,
    },
}

#[derive(Subcommand)]
enum ProjectSubcommand {
    List,
    Show { id: i64 },
    Create { name: String },
    Rename { id: i64, name: String },
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum IssueSubcommand {
    List {
        project: i64,
    },
    Show {
        project: i64,
        id: i64,
    },
    Create {
        project: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        assigned_to: String,
        #[arg(long)]
        status: Option<String>,
    },
    Update {
        project: i64,
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        assigned_to: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    Delete {
        project: i64,
        id: i64,
    },
}

#[derive(Subcommand)]
enum CommentSubcommand {
    List { issue: i64 },
    Show { issue: i64, id: i64 },
    Add { issue: i64, text: String },
    Edit { issue: i64, id: i64, text: String },
    Delete { issue: i64, id: i64 },
}

fn fail(err: TrackerError, mode: OutputMode) -> ! {
    output::print_error(&err, mode);
    process::exit(1);
}

/// Client for the configured server, or exit if it cannot be reached.
fn connect(mode: OutputMode) -> Client {
    let client = Client::new();
    if let Err(e) = client.check_reachable() {
        fail(TrackerError::Internal(e), mode);
    }
    client
}

fn issue_body(
    title: Option<String>,
    description: Option<String>,
    assigned_to: Option<String>,
    status: Option<String>,
) -> Value {
    let mut body = Map::new();
    for (key, value) in [
        ("title", title),
        ("description", description),
        ("assigned_to", assigned_to),
        ("status", status),
    ] {
        if let Some(v) = value {
            body.insert(key.into(), Value::String(v));
        }
    }
    Value::Object(body)
}

fn serve(host: String, port: u16, data_dir: Option<PathBuf>, in_memory: bool) {
    let storage = if in_memory {
        Storage::Memory
    } else {
        match data_dir.map_or_else(std::env::current_dir, Ok) {
            Ok(dir) => Storage::File(dir),
            Err(e) => {
                eprintln!("error: cannot resolve data dir: {e}");
                process::exit(1);
            }
        }
    };
    let config = ServerConfig {
        host,
        port,
        storage,
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(tracker::server::serve(config)) {
        tracing::error!("{e}");
        process::exit(1);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match cli.command {
        Commands::Serve {
            host,
            port,
            data_dir,
            in_memory,
        } => serve(host, port, data_dir, in_memory),

        Commands::Status => {
            let client = connect(mode);
            match client.status() {
                Ok(v) => {
                    if mode == OutputMode::Human {
                        println!("server: {}", client.base_url());
                    }
                    output::print_status(&v, mode)
                }
                Err(e) => fail(e, mode),
            }
        }

        Commands::Project { subcmd } => {
            let client = connect(mode);
            match subcmd {
                ProjectSubcommand::List => match client.list_projects() {
                    Ok(v) => output::print_project_list(&v, mode),
                    Err(e) => fail(e, mode),
                },
                ProjectSubcommand::Show { id } => match client.get_project(id) {
                    Ok(v) => output::print_project(&v, mode),
                    Err(e) => fail(e, mode),
                },
                ProjectSubcommand::Create { name } => match client.create_project(&name) {
                    Ok(v) => output::print_project(&v, mode),
                    Err(e) => fail(e, mode),
                },
                ProjectSubcommand::Rename { id, name } => {
                    match client.update_project(id, &name) {
                        Ok(v) => output::print_project(&v, mode),
                        Err(e) => fail(e, mode),
                    }
                }
                ProjectSubcommand::Delete { id } => match client.delete_project(id) {
                    Ok(v) => output::print_message(&v, mode),
                    Err(e) => fail(e, mode),
                },
            }
        }

        Commands::Issue { subcmd } => {
            let client = connect(mode);
            match subcmd {
                IssueSubcommand::List { project } => match client.list_issues(project) {
                    Ok(v) => output::print_issue_list(&v, mode),
                    Err(e) => fail(e, mode),
                },
                IssueSubcommand::Show { project, id } => match client.get_issue(project, id) {
                    Ok(v) => output::print_issue_detail(&v, mode),
                    Err(e) => fail(e, mode),
                },
                IssueSubcommand::Create {
                    project,
                    title,
                    description,
                    assigned_to,
                    status,
                } => {
                    let body = issue_body(Some(title), Some(description), Some(assigned_to), status);
                    match client.create_issue(project, &body) {
                        Ok(v) => output::print_issue(&v, mode),
                        Err(e) => fail(e, mode),
                    }
                }
                IssueSubcommand::Update {
                    project,
                    id,
                    title,
                    description,
                    assigned_to,
                    status,
                } => {
                    let body = issue_body(title, description, assigned_to, status);
                    match client.update_issue(project, id, &body) {
                        Ok(v) => output::print_issue(&v, mode),
                        Err(e) => fail(e, mode),
                    }
                }
                IssueSubcommand::Delete { project, id } => {
                    match client.delete_issue(project, id) {
                        Ok(v) => output::print_message(&v, mode),
                        Err(e) => fail(e, mode),
                    }
                }
            }
        }

        Commands::Comment { subcmd } => {
            let client = connect(mode);
            match subcmd {
                CommentSubcommand::List { issue } => match client.list_comments(issue) {
                    Ok(v) => output::print_comment_list(&v, mode),
                    Err(e) => fail(e, mode),
                },
                CommentSubcommand::Show { issue, id } => match client.get_comment(issue, id) {
                    Ok(v) => output::print_comment(&v, mode),
                    Err(e) => fail(e, mode),
                },
                CommentSubcommand::Add { issue, text } => {
                    match client.create_comment(issue, &text) {
                        Ok(v) => output::print_comment(&v, mode),
                        Err(e) => fail(e, mode),
                    }
                }
                CommentSubcommand::Edit { issue, id, text } => {
                    match client.update_comment(issue, id, &text) {
                        Ok(v) => output::print_comment(&v, mode),
                        Err(e) => fail(e, mode),
                    }
                }
                CommentSubcommand::Delete { issue, id } => {
                    match client.delete_comment(issue, id) {
                        Ok(v) => output::print_message(&v, mode),
                        Err(e) => fail(e, mode),
                    }
                }
            }
        }
    }
}
