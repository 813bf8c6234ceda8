use std::sync::Arc;

use anyhow::{Context, Result};
use release_mirror::{Scheduler, SyncOrchestrator, VersionStateStore};
use release_mirror_github::{GitHubReleaseClient, GitHubReleaseClientConfig};
use release_mirror_store::{DirectoryObjectStore, SqliteRecordStore};

use crate::config::AppConfig;

/// Everything a command needs, wired from config.
pub struct App {
    pub config: AppConfig,
    pub github: Arc<GitHubReleaseClient>,
    pub orchestrator: Arc<SyncOrchestrator>,
}

impl App {
    /// Open the record database and the object directory under the data
    /// dir. Failing to open either is fatal.
    pub async fn build(config: AppConfig) -> Result<Self> {
        let data_dir = config.data_dir()?;
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

        let records = SqliteRecordStore::open(&data_dir.join("records.db"))
            .map_err(|e| anyhow::anyhow!("{e}"))
            .context("failed to open record store")?;

        let objects = DirectoryObjectStore::open(data_dir.join("objects"))
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))
            .context("failed to open object store")?;

        let github = Arc::new(GitHubReleaseClient::new(GitHubReleaseClientConfig {
            token: config.github_token.clone(),
            api_base_url: config.api_base_url.clone(),
        }));

        let orchestrator = SyncOrchestrator::new(
            config.repos.clone(),
            github.clone(),
            Arc::new(objects),
            VersionStateStore::new(Arc::new(records)),
        )
        .with_time_budget(config.sync_budget());

        tracing::info!(
            repos = config.repos.len(),
            data_dir = %data_dir.display(),
            "release mirror ready"
        );

        Ok(Self {
            github,
            orchestrator: Arc::new(orchestrator),
            config,
        })
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(self.orchestrator.clone(), self.config.check_interval())
    }
}
