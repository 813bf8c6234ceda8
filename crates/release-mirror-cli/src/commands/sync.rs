use anyhow::Result;
use release_mirror::{Feedback, ProgressSink, RepoResult};

use crate::app::App;

/// Prints progress lines: errors and warnings to stderr, the rest to stdout.
struct PrintSink;

impl ProgressSink for PrintSink {
    fn emit(&self, feedback: Feedback) {
        match &feedback {
            Feedback::Warning(_) | Feedback::Error(_) | Feedback::Aborted(_) => {
                eprintln!("{feedback}")
            }
            Feedback::Info(_) | Feedback::Complete => println!("{feedback}"),
        }
    }
}

/// Run one sync pass in the foreground.
pub async fn run(app: &App, repo: Option<&str>) -> Result<()> {
    let outcome = app
        .orchestrator
        .run_sync(repo, &PrintSink)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    if outcome.timed_out {
        anyhow::bail!("sync pass timed out");
    }

    let total = outcome.repos.len();
    let problems = outcome.problem_count();
    let synced = outcome
        .repos
        .iter()
        .filter(|o| matches!(o.result, RepoResult::Synced { .. }))
        .count();

    if total > 0 && problems == total {
        anyhow::bail!("all {total} repositories failed to sync");
    }
    if problems > 0 {
        eprintln!("Synced {synced} repositories ({problems} with problems)");
    }

    Ok(())
}
