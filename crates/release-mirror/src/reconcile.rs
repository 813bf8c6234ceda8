use crate::ownership::{belongs_to, file_name, has_repo_token};
use crate::repo::RepoConfig;
use crate::state::VersionStateStore;
use crate::storage::{ObjectStore, StoreError};

/// Summary of one [`FileReconciler::purge`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub deleted: usize,
    pub failed: usize,
    /// Keys this repo's heuristic matched but another repo's did too.
    pub skipped_ambiguous: usize,
}

/// Removes a repo's previously uploaded objects.
///
/// The recorded file list is trusted first. Keys outside it are deleted
/// only when they can be attributed to this repo and to no other
/// configured repo.
pub struct FileReconciler<'a> {
    state: &'a VersionStateStore,
    objects: &'a dyn ObjectStore,
    configs: &'a [RepoConfig],
}

impl<'a> FileReconciler<'a> {
    pub fn new(
        state: &'a VersionStateStore,
        objects: &'a dyn ObjectStore,
        configs: &'a [RepoConfig],
    ) -> Self {
        Self {
            state,
            objects,
            configs,
        }
    }

    /// Delete `target`'s objects under its storage prefix.
    ///
    /// Individual delete failures are counted and skipped. Only a failed
    /// listing is an error. The record's file list is cleared afterwards
    /// regardless of how many deletes succeeded.
    pub async fn purge(&self, target: &RepoConfig) -> Result<PurgeReport, StoreError> {
        let repo = target.repo.as_str();

        let recorded = match self.state.get(repo).await {
            Ok(record) => record.map(|r| r.file_paths).unwrap_or_default(),
            Err(e) => {
                tracing::warn!(repo, error = %e, "could not load recorded file list");
                Vec::new()
            }
        };

        let prefix = target.storage_prefix();
        let objects = self.objects.list(&prefix).await?;
        tracing::debug!(
            repo,
            %prefix,
            listed = objects.len(),
            recorded = recorded.len(),
            "purging old files"
        );

        let mut report = PurgeReport::default();
        let mut doomed = Vec::new();

        for object in objects {
            let key = object.key;
            if !key.starts_with(&prefix) {
                continue;
            }

            if recorded.contains(&key) || has_repo_token(file_name(&key), target.name()) {
                doomed.push(key);
                continue;
            }

            if !belongs_to(&key, repo) {
                continue;
            }

            if let Some(other) = self.other_claimant(&key, repo) {
                tracing::info!(repo, %key, other, "leaving key claimed by another repo");
                report.skipped_ambiguous += 1;
                continue;
            }

            doomed.push(key);
        }

        for key in doomed {
            match self.objects.delete(&key).await {
                Ok(()) => {
                    tracing::debug!(repo, %key, "deleted");
                    report.deleted += 1;
                }
                Err(e) => {
                    tracing::warn!(repo, %key, error = %e, "delete failed");
                    report.failed += 1;
                }
            }
        }

        if let Err(e) = self.state.clear_file_list(repo).await {
            tracing::warn!(repo, error = %e, "could not clear recorded file list");
        }

        tracing::info!(repo, deleted = report.deleted, failed = report.failed, "purge finished");
        Ok(report)
    }

    fn other_claimant(&self, key: &str, repo: &str) -> Option<&str> {
        self.configs
            .iter()
            .map(|config| config.repo.as_str())
            .filter(|other| *other != repo)
            .find(|other| belongs_to(key, other))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use crate::record::{SyncRecord, SyncStatus};
    use crate::test_support::{InMemoryObjectStore, InMemoryRecordStore};

    use super::*;

    fn setup() -> (VersionStateStore, InMemoryObjectStore, Vec<RepoConfig>) {
        let state = VersionStateStore::new(Arc::new(InMemoryRecordStore::new()));
        let configs = vec![
            RepoConfig::new("acme/widget", "/dl"),
            RepoConfig::new("acme/gadget", "/dl"),
        ];
        (state, InMemoryObjectStore::new(), configs)
    }

    #[tokio::test]
    async fn deletes_recorded_files() {
        let (state, objects, configs) = setup();
        objects.insert("dl/Other/notes.txt", b"x");
        let record = SyncRecord::synced(
            "acme/widget",
            "v1",
            "/dl",
            vec!["dl/Other/notes.txt".into()],
            Utc::now(),
        );
        state.put("acme/widget", &record).await.unwrap();

        let report = FileReconciler::new(&state, &objects, &configs)
            .purge(&configs[0])
            .await
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert!(!objects.contains("dl/Other/notes.txt"));
    }

    #[tokio::test]
    async fn deletes_tokenized_and_owned_files() {
        let (state, objects, configs) = setup();
        objects.insert("dl/Windows/setup_widget.exe", b"x");
        objects.insert("dl/Linux/widget-linux.tar.gz", b"x");

        let report = FileReconciler::new(&state, &objects, &configs)
            .purge(&configs[0])
            .await
            .unwrap();

        assert_eq!(report.deleted, 2);
        assert!(objects.keys().is_empty());
    }

    #[tokio::test]
    async fn ambiguous_key_is_left_alone() {
        let (state, objects, configs) = setup();
        // Claimed by "Windows/widget" and by "/gadget-".
        let shared = "dl/Windows/widget/gadget-tool.exe";
        objects.insert(shared, b"x");

        let report = FileReconciler::new(&state, &objects, &configs)
            .purge(&configs[0])
            .await
            .unwrap();

        assert_eq!(report.deleted, 0);
        assert_eq!(report.skipped_ambiguous, 1);
        assert!(objects.contains(shared));
    }

    #[tokio::test]
    async fn never_touches_other_repos_files() {
        let (state, objects, configs) = setup();
        objects.insert("dl/Windows/setup_gadget.exe", b"x");
        objects.insert("dl/Android/gadget.apk", b"x");
        objects.insert("elsewhere/Windows/setup_widget.exe", b"x");

        let report = FileReconciler::new(&state, &objects, &configs)
            .purge(&configs[0])
            .await
            .unwrap();

        assert_eq!(report.deleted, 0);
        assert_eq!(objects.keys().len(), 3);
    }

    #[tokio::test]
    async fn delete_failure_does_not_abort() {
        let (state, objects, configs) = setup();
        objects.insert("dl/Windows/a_widget.exe", b"x");
        objects.insert("dl/Windows/b_widget.exe", b"x");
        objects.fail_delete("dl/Windows/a_widget.exe");

        let report = FileReconciler::new(&state, &objects, &configs)
            .purge(&configs[0])
            .await
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(report.failed, 1);
        assert!(objects.contains("dl/Windows/a_widget.exe"));
        assert!(!objects.contains("dl/Windows/b_widget.exe"));
    }

    #[tokio::test]
    async fn clears_file_list_even_after_failures() {
        let (state, objects, configs) = setup();
        objects.insert("dl/Windows/a_widget.exe", b"x");
        objects.fail_delete("dl/Windows/a_widget.exe");
        let record = SyncRecord::synced(
            "acme/widget",
            "v1",
            "/dl",
            vec!["dl/Windows/a_widget.exe".into()],
            Utc::now(),
        );
        state.put("acme/widget", &record).await.unwrap();

        FileReconciler::new(&state, &objects, &configs)
            .purge(&configs[0])
            .await
            .unwrap();

        let record = state.get("acme/widget").await.unwrap().unwrap();
        assert!(record.file_paths.is_empty());
        assert_eq!(record.status, SyncStatus::Syncing);
    }

    #[tokio::test]
    async fn listing_failure_is_an_error() {
        let (state, objects, configs) = setup();
        objects.fail_list(true);

        let result = FileReconciler::new(&state, &objects, &configs)
            .purge(&configs[0])
            .await;
        assert!(result.is_err());
    }
}
