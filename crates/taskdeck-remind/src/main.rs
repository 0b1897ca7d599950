use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use taskdeck_core::slack::SlackExport;
use taskdeck_core::Project;
use taskdeck_storage::TaskStore;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod message;

const SLACK_POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

fn resolve_db_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("TASKDECK_DB") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    Ok(std::env::current_dir()?.join("tasks.db"))
}

fn resolve_slack_export_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("TASKDECK_SLACK_EXPORT") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    Ok(std::env::current_dir()?.join("slack.json"))
}

fn load_export(path: &Path) -> Result<SlackExport> {
    if !path.exists() {
        bail!("{} not found", path.display());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let token =
        std::env::var("SLACK_BOT_TOKEN").context("SLACK_BOT_TOKEN is not set in the environment")?;

    let export_path = resolve_slack_export_path()?;
    let export = load_export(&export_path)?;
    let Some(self_dm) = export.find_self_dm() else {
        bail!(
            "Could not find a self-DM entry in {} (needs a DM name containing \"self\")",
            export_path.display()
        );
    };

    let store = TaskStore::open(resolve_db_path()?)?;
    let reopened = store.reopen_snoozed_due()?;
    if reopened > 0 {
        info!(reopened, "snoozed tasks reopened before reminder");
    }

    let mut groups = Vec::new();
    for project in Project::ALL {
        let tasks = store.get_open_tasks(Some(project))?;
        if !tasks.is_empty() {
            groups.push((project, tasks));
        }
    }
    let text = message::compose(Utc::now().date_naive(), &groups);

    let client = reqwest::Client::new();
    let response = match client
        .post(SLACK_POST_MESSAGE_URL)
        .bearer_auth(&token)
        .json(&PostMessageRequest {
            channel: &self_dm.id,
            text: &text,
        })
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "transport failure posting reminder");
            std::process::exit(1);
        }
    };

    let body: PostMessageResponse = response
        .json()
        .await
        .context("Failed to decode Slack response")?;
    if !body.ok {
        error!(
            error = body.error.as_deref().unwrap_or("unknown"),
            "Slack API rejected the reminder"
        );
        std::process::exit(1);
    }

    info!(channel = %self_dm.id, "reminder sent");
    println!("✓ Reminder sent to {} ({})", self_dm.name, self_dm.id);
    Ok(())
}
