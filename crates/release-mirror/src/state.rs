use std::sync::Arc;

use chrono::Utc;

use crate::record::{SyncRecord, SyncStatus};
use crate::repo::record_key;
use crate::storage::{RecordStore, StoreError};

/// Per-repo sync records on top of a key-value [`RecordStore`].
///
/// Nothing is cached: every call goes back to the store, so decisions are
/// always made against the latest persisted state.
#[derive(Clone)]
pub struct VersionStateStore {
    records: Arc<dyn RecordStore>,
}

impl VersionStateStore {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    pub async fn get(&self, repo: &str) -> Result<Option<SyncRecord>, StoreError> {
        let key = record_key(repo);
        let Some(raw) = self.records.get(&key).await? else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key,
                reason: e.to_string(),
            })
    }

    /// Overwrite the record for `repo`.
    pub async fn put(&self, repo: &str, record: &SyncRecord) -> Result<(), StoreError> {
        let key = record_key(repo);
        let raw = serde_json::to_string(record).map_err(|e| StoreError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;

        self.records.put(&key, raw).await?;
        tracing::debug!(
            repo,
            status = %record.status,
            files = record.file_paths.len(),
            "saved sync record"
        );
        Ok(())
    }

    /// Read-modify-write the record for `repo`.
    ///
    /// `transform` receives the current record (if any) and returns the
    /// record to store, or `None` to leave storage untouched. Returns what
    /// was written.
    pub async fn update<F>(
        &self,
        repo: &str,
        transform: F,
    ) -> Result<Option<SyncRecord>, StoreError>
    where
        F: FnOnce(Option<SyncRecord>) -> Option<SyncRecord> + Send,
    {
        let current = self.get(repo).await?;
        let Some(next) = transform(current) else {
            return Ok(None);
        };
        self.put(repo, &next).await?;
        Ok(Some(next))
    }

    /// Drop the recorded file list and mark the repo as syncing.
    ///
    /// Runs before any destructive pass, so a crash mid-sync never leaves a
    /// `synced` record pointing at deleted files. No-op if there is no
    /// record yet.
    pub async fn clear_file_list(&self, repo: &str) -> Result<(), StoreError> {
        self.update(repo, |current| {
            current.map(|mut record| {
                record.file_paths.clear();
                record.set_status(SyncStatus::Syncing);
                record.last_update = Some(Utc::now());
                record
            })
        })
        .await?;
        Ok(())
    }

    /// Record a failed sync attempt, preserving the last synced version.
    pub async fn mark_error(&self, repo: &str, path: &str, error: &str) -> Result<(), StoreError> {
        let now = Utc::now();
        self.update(repo, |current| {
            Some(match current {
                Some(record) => record.into_failed(path, error, now),
                None => SyncRecord::failed(repo, path, error, now),
            })
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::InMemoryRecordStore;

    use super::*;

    fn state() -> (Arc<InMemoryRecordStore>, VersionStateStore) {
        let records = Arc::new(InMemoryRecordStore::new());
        let state = VersionStateStore::new(records.clone());
        (records, state)
    }

    #[tokio::test]
    async fn get_missing_record_is_none() {
        let (_, state) = state();
        assert!(state.get("acme/widget").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_then_get() {
        let (records, state) = state();
        let files = vec!["dl/a".into()];
        let record = SyncRecord::synced("acme/widget", "v1", "/dl", files, Utc::now());

        state.put("acme/widget", &record).await.unwrap();

        assert_eq!(state.get("acme/widget").await.unwrap(), Some(record));
        assert!(records.raw("repo:acme/widget").is_some());
    }

    #[tokio::test]
    async fn clear_file_list_is_noop_without_record() {
        let (records, state) = state();
        state.clear_file_list("acme/widget").await.unwrap();
        assert!(records.raw("repo:acme/widget").is_none());
    }

    #[tokio::test]
    async fn clear_file_list_marks_syncing() {
        let (_, state) = state();
        let files = vec!["dl/a".into()];
        let record = SyncRecord::synced("acme/widget", "v1", "/dl", files, Utc::now());
        state.put("acme/widget", &record).await.unwrap();

        state.clear_file_list("acme/widget").await.unwrap();

        let cleared = state.get("acme/widget").await.unwrap().unwrap();
        assert_eq!(cleared.status, SyncStatus::Syncing);
        assert!(cleared.file_paths.is_empty());
        assert_eq!(cleared.version.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn clear_file_list_drops_previous_error() {
        let (_, state) = state();
        state.mark_error("acme/widget", "/dl", "boom").await.unwrap();

        state.clear_file_list("acme/widget").await.unwrap();

        let cleared = state.get("acme/widget").await.unwrap().unwrap();
        assert_eq!(cleared.status, SyncStatus::Syncing);
        assert!(cleared.error.is_none());
    }

    #[tokio::test]
    async fn update_returning_none_writes_nothing() {
        let (records, state) = state();
        let written = state.update("acme/widget", |_| None).await.unwrap();
        assert!(written.is_none());
        assert!(records.raw("repo:acme/widget").is_none());
    }

    #[tokio::test]
    async fn corrupt_record_is_an_error() {
        let (records, state) = state();
        records.insert_raw("repo:acme/widget", "{not json");

        let result = state.get("acme/widget").await;
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn mark_error_creates_or_preserves() {
        let (_, state) = state();
        state.mark_error("acme/widget", "/dl", "boom").await.unwrap();

        let record = state.get("acme/widget").await.unwrap().unwrap();
        assert_eq!(record.status, SyncStatus::Error);
        assert_eq!(record.error.as_deref(), Some("boom"));
        assert_eq!(record.path, "/dl");
        assert!(record.version.is_none());
    }
}
