use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a repo's sync record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Pending,
    Syncing,
    Synced,
    Error,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Persisted sync state of one repository, stored as JSON under
/// `repo:{owner}/{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    pub repo: String,

    /// Last successfully synced tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub status: SyncStatus,

    /// Storage path in effect when the record was written.
    #[serde(default)]
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,

    /// Object keys uploaded by the last sync. Authoritative for deletion.
    #[serde(default)]
    pub file_paths: Vec<String>,

    /// Present only when `status` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SyncRecord {
    pub fn synced(
        repo: impl Into<String>,
        version: impl Into<String>,
        path: impl Into<String>,
        file_paths: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            repo: repo.into(),
            version: Some(version.into()),
            status: SyncStatus::Synced,
            path: path.into(),
            last_update: Some(now),
            file_paths,
            error: None,
            message: None,
        }
    }

    pub fn syncing(
        repo: impl Into<String>,
        path: impl Into<String>,
        file_paths: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            repo: repo.into(),
            version: None,
            status: SyncStatus::Syncing,
            path: path.into(),
            last_update: Some(now),
            file_paths,
            error: None,
            message: None,
        }
    }

    /// Mark this record failed, keeping the last synced version and
    /// whatever file paths were recorded so far.
    pub fn into_failed(
        mut self,
        path: impl Into<String>,
        error: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        self.status = SyncStatus::Error;
        self.path = path.into();
        self.error = Some(error.into());
        self.message = None;
        self.last_update = Some(now);
        self
    }

    /// A fresh failed record for a repo that has no prior state.
    pub fn failed(
        repo: impl Into<String>,
        path: impl Into<String>,
        error: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::syncing(repo, "", Vec::new(), now).into_failed(path, error, now)
    }

    /// Move to `status`. Leaving `Error` drops the error text, so `error`
    /// is only ever present on failed records.
    pub fn set_status(&mut self, status: SyncStatus) {
        self.status = status;
        if status != SyncStatus::Error {
            self.error = None;
        }
    }

    /// True when the record has sat in `syncing` for longer than `window`.
    pub fn is_stuck_syncing(&self, now: DateTime<Utc>, window: std::time::Duration) -> bool {
        if self.status != SyncStatus::Syncing {
            return false;
        }
        let Some(last_update) = self.last_update else {
            return false;
        };
        let Ok(window) = chrono::TimeDelta::from_std(window) else {
            return false;
        };
        now.signed_duration_since(last_update) > window
    }
}
