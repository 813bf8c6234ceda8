use anyhow::{Context, Result};
use chrono::Utc;
use release_mirror::{StatusSnapshot, StatusView};

use crate::app::App;

/// Print every configured repo's sync state.
pub async fn run(app: &App, json: bool) -> Result<()> {
    let snapshot = StatusView::new(&app.orchestrator)
        .collect(Utc::now(), None)
        .await;

    if json {
        let out = serde_json::to_string_pretty(&snapshot).context("failed to encode status")?;
        println!("{out}");
    } else {
        print!("{}", format_table(&snapshot));
    }

    Ok(())
}

fn format_table(snapshot: &StatusSnapshot) -> String {
    if snapshot.repos.is_empty() {
        return "No repositories configured.\n".to_owned();
    }

    let width = snapshot
        .repos
        .iter()
        .map(|r| r.repo.len())
        .max()
        .unwrap_or(0)
        .max(4);

    let mut out = format!(
        "{:<width$}  {:<8}  {:<12}  {:>5}  PATH\n",
        "REPO", "STATUS", "VERSION", "FILES"
    );
    for repo in &snapshot.repos {
        out.push_str(&format!(
            "{:<width$}  {:<8}  {:<12}  {:>5}  {}\n",
            repo.repo,
            repo.status.to_string(),
            repo.version.as_deref().unwrap_or("-"),
            repo.file_count,
            if repo.path.is_empty() { "/" } else { repo.path.as_str() },
        ));
        if let Some(message) = repo.message.as_deref().or(repo.error.as_deref()) {
            out.push_str(&format!("{:<width$}  {message}\n", ""));
        }
    }
    out
}
