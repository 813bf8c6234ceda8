use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::orchestrator::SyncOrchestrator;
use crate::ownership::belongs_to;
use crate::record::{SyncRecord, SyncStatus};
use crate::repo::{RepoConfig, storage_prefix};

/// A record left in `syncing` for longer than this is considered abandoned.
pub const STALE_SYNCING_WINDOW: Duration = Duration::from_secs(20 * 60);

/// One row of the status page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoStatus {
    pub repo: String,
    pub path: String,
    pub version: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
    pub status: SyncStatus,
    pub message: Option<String>,
    pub error: Option<String>,
    pub file_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub repos: Vec<RepoStatus>,
    pub last_check: Option<DateTime<Utc>>,
    pub is_syncing: bool,
}

/// Read-side projection of every configured repo's record.
///
/// Reading also repairs records whose state no longer matches reality: a
/// changed storage path, a pass that died mid-sync, or a `synced` record
/// that lost its file list. Repairs are written back before projecting.
pub struct StatusView<'a> {
    orchestrator: &'a SyncOrchestrator,
}

impl<'a> StatusView<'a> {
    pub fn new(orchestrator: &'a SyncOrchestrator) -> Self {
        Self { orchestrator }
    }

    pub async fn collect(
        &self,
        now: DateTime<Utc>,
        last_check: Option<DateTime<Utc>>,
    ) -> StatusSnapshot {
        let mut repos = Vec::with_capacity(self.orchestrator.configs().len());
        for config in self.orchestrator.configs() {
            repos.push(self.repo_status(config, now).await);
        }

        StatusSnapshot {
            repos,
            last_check,
            is_syncing: self.orchestrator.is_syncing(),
        }
    }

    async fn repo_status(&self, config: &RepoConfig, now: DateTime<Utc>) -> RepoStatus {
        let state = self.orchestrator.state();
        let repo = config.repo.as_str();

        let record = match state.get(repo).await {
            Ok(Some(record)) => record,
            Ok(None) => return placeholder(config, SyncStatus::Pending, "not yet synced"),
            Err(e) => {
                tracing::warn!(repo, error = %e, "could not read sync record");
                return RepoStatus {
                    error: Some(e.to_string()),
                    ..placeholder(config, SyncStatus::Error, "could not read sync state")
                };
            }
        };

        let healed = self.heal(record.clone(), config, now).await;
        if healed != record
            && let Err(e) = state.put(repo, &healed).await
        {
            tracing::warn!(repo, error = %e, "could not save repaired record");
        }
        let record = healed;

        RepoStatus {
            repo: record.repo,
            path: record.path,
            version: record.version,
            last_update: record.last_update,
            status: record.status,
            message: record.message,
            error: record.error,
            file_count: record.file_paths.len(),
        }
    }

    async fn heal(
        &self,
        mut record: SyncRecord,
        config: &RepoConfig,
        now: DateTime<Utc>,
    ) -> SyncRecord {
        let repo = config.repo.as_str();

        if record.path != config.storage_path {
            tracing::info!(
                repo,
                from = %record.path,
                to = %config.storage_path,
                "storage path changed"
            );
            record.path = config.storage_path.clone();
            record.set_status(SyncStatus::Pending);
            record.message = Some("storage path changed, re-sync required".into());
        }

        if record.is_stuck_syncing(now, STALE_SYNCING_WINDOW) {
            tracing::info!(repo, "sync record stuck in syncing; marking as error");
            record.set_status(SyncStatus::Error);
            record.message = Some("sync timed out, retry".into());
        }

        if record.status == SyncStatus::Synced && record.file_paths.is_empty() {
            let owned = self.owned_keys(repo, &config.storage_path).await;
            if owned.is_empty() {
                tracing::info!(repo, "synced record has no files; marking pending");
                record.set_status(SyncStatus::Pending);
                record.message = Some("re-sync required".into());
            } else {
                tracing::info!(repo, files = owned.len(), "restored file list from object store");
                record.file_paths = owned;
            }
        }

        record
    }

    async fn owned_keys(&self, repo: &str, storage_path: &str) -> Vec<String> {
        let prefix = storage_prefix(storage_path);
        match self.orchestrator.objects().list(&prefix).await {
            Ok(objects) => objects
                .into_iter()
                .map(|object| object.key)
                .filter(|key| belongs_to(key, repo))
                .collect(),
            Err(e) => {
                tracing::warn!(repo, error = %e, "could not list objects");
                Vec::new()
            }
        }
    }
}

fn placeholder(config: &RepoConfig, status: SyncStatus, message: &str) -> RepoStatus {
    RepoStatus {
        repo: config.repo.clone(),
        path: config.storage_path.clone(),
        version: None,
        last_update: None,
        status,
        message: Some(message.to_owned()),
        error: None,
        file_count: 0,
    }
}
