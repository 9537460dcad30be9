use clap::{Parser, Subcommand};
use notes::{AuthStatus, GithubClient, RepoId};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use viewer::service::{describe_content, Request, Response, Service};
use viewer::settings::Settings;

#[derive(Parser)]
#[command(name = "git-notes-viewer")]
#[command(about = "Browse Git notes attached to GitHub commits")]
struct Cli {
    /// Path to the settings file
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and render the notes attached to a commit
    Show {
        /// Repository as owner/repo
        repo: String,
        /// Commit SHA, full or abbreviated
        commit: String,
        /// Notes refs to check instead of the configured ones
        #[arg(short = 'r', long = "ref")]
        refs: Vec<String>,
        /// Print the raw service response as JSON
        #[arg(long)]
        json: bool,
    },
    /// List note refs advertised by a repository
    Refs {
        /// Repository as owner/repo
        repo: String,
        /// Print the raw service response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check the configured access token
    Auth,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let settings = Settings::load(cli.settings.as_deref())?;
    let client = Arc::new(GithubClient::new(settings.github_config())?);
    let service = Service::new(client, settings.extra_refs.clone());

    match cli.command {
        Commands::Show {
            repo,
            commit,
            refs,
            json,
        } => {
            let repo: RepoId = repo.parse()?;
            let response = service
                .handle(Request::FetchNote {
                    owner: repo.owner,
                    repo: repo.repo,
                    commit,
                    refs,
                })
                .await;

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(());
            }

            match response {
                Response::Notes { notes } => {
                    for note in &notes {
                        println!("{}", describe_content(note));
                    }
                    info!("Checked {} ref(s)", notes.len());
                }
                other => return Err(describe_failure(other).into()),
            }
        }
        Commands::Refs { repo, json } => {
            let repo: RepoId = repo.parse()?;
            let response = service
                .handle(Request::GetRefs {
                    owner: repo.owner,
                    repo: repo.repo,
                })
                .await;

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(());
            }

            match response {
                Response::Refs { refs } => {
                    for note_ref in refs {
                        println!("{}", note_ref);
                    }
                }
                other => return Err(describe_failure(other).into()),
            }
        }
        Commands::Auth => match service.handle(Request::CheckAuth).await {
            Response::Auth { auth } => match auth {
                AuthStatus::Valid { login } => println!("Token is valid for {}", login),
                AuthStatus::Invalid => return Err("Token was rejected by GitHub".into()),
                AuthStatus::Missing => {
                    println!("No token configured; only public repositories are reachable")
                }
            },
            other => return Err(describe_failure(other).into()),
        },
    }

    Ok(())
}

fn describe_failure(response: Response) -> String {
    match response {
        Response::Error {
            message,
            settings_hint,
            ..
        } => {
            if settings_hint {
                format!(
                    "{} (check the token in your settings file; see --settings)",
                    message
                )
            } else {
                message
            }
        }
        other => format!("Unexpected response: {:?}", other),
    }
}
