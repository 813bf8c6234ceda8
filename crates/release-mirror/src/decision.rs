use crate::ownership::belongs_to;
use crate::record::{SyncRecord, SyncStatus};
use crate::repo::storage_prefix;
use crate::state::VersionStateStore;
use crate::storage::ObjectStore;

/// Why a repo needs to be synced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReason {
    FirstSync,
    PathChanged { from: String, to: String },
    MissingFileList,
    NoFilesInStore,
    Incomplete { actual: usize, expected: usize },
    NewVersion { from: Option<String>, to: String },
    StateUnavailable(String),
}

impl std::fmt::Display for SyncReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstSync => write!(f, "no previous sync recorded"),
            Self::PathChanged { from, to } => {
                write!(f, "storage path changed from `{from}` to `{to}`")
            }
            Self::MissingFileList => write!(f, "record is synced but lists no files"),
            Self::NoFilesInStore => write!(f, "no files found in the object store"),
            Self::Incomplete { actual, expected } => {
                write!(f, "only {actual} of {expected} files present")
            }
            Self::NewVersion { from, to } => write!(
                f,
                "new version {to} (was {})",
                from.as_deref().unwrap_or("unknown")
            ),
            Self::StateUnavailable(e) => write!(f, "could not read sync state: {e}"),
        }
    }
}

/// Outcome of [`UpdateDecision::needs_sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    UpToDate,
    Needed(SyncReason),
}

impl Verdict {
    pub fn is_needed(&self) -> bool {
        matches!(self, Self::Needed(_))
    }
}

/// Decides whether a repo's mirrored files are current.
pub struct UpdateDecision<'a> {
    state: &'a VersionStateStore,
    objects: &'a dyn ObjectStore,
}

impl<'a> UpdateDecision<'a> {
    pub fn new(state: &'a VersionStateStore, objects: &'a dyn ObjectStore) -> Self {
        Self { state, objects }
    }

    /// Check `repo` against the latest tag and the configured storage path.
    ///
    /// `expected_assets` is the number of valid upstream assets, when known.
    /// With it, the live object store is compared against the release; the
    /// recorded file list is healed from the listing when the two disagree.
    /// Any failure to read state resolves to "sync needed".
    pub async fn needs_sync(
        &self,
        repo: &str,
        current_tag: &str,
        storage_path: &str,
        expected_assets: Option<usize>,
    ) -> Verdict {
        let record = match self.state.get(repo).await {
            Ok(Some(record)) => record,
            Ok(None) => return Verdict::Needed(SyncReason::FirstSync),
            Err(e) => {
                tracing::warn!(
                    repo,
                    error = %e,
                    "could not read sync record; assuming sync needed"
                );
                return Verdict::Needed(SyncReason::StateUnavailable(e.to_string()));
            }
        };

        if record.path != storage_path {
            return Verdict::Needed(SyncReason::PathChanged {
                from: record.path.clone(),
                to: storage_path.to_owned(),
            });
        }

        if record.status == SyncStatus::Synced && record.file_paths.is_empty() {
            return Verdict::Needed(SyncReason::MissingFileList);
        }

        if let Some(expected) = expected_assets
            && let Some(verdict) = self.check_store(&record, storage_path, expected).await
        {
            return verdict;
        }

        if record.version.as_deref() == Some(current_tag) {
            return Verdict::UpToDate;
        }

        Verdict::Needed(SyncReason::NewVersion {
            from: record.version.clone(),
            to: current_tag.to_owned(),
        })
    }

    /// Compare the live listing to the expected asset count. Returns a
    /// verdict only when the listing alone forces a sync.
    async fn check_store(
        &self,
        record: &SyncRecord,
        storage_path: &str,
        expected: usize,
    ) -> Option<Verdict> {
        let prefix = storage_prefix(storage_path);
        let objects = match self.objects.list(&prefix).await {
            Ok(objects) => objects,
            Err(e) => {
                tracing::warn!(
                    repo = %record.repo,
                    error = %e,
                    "object listing failed; assuming sync needed"
                );
                return Some(Verdict::Needed(SyncReason::StateUnavailable(e.to_string())));
            }
        };

        let owned: Vec<String> = objects
            .into_iter()
            .filter(|object| belongs_to(&object.key, &record.repo))
            .map(|object| object.key)
            .collect();
        let actual = owned.len();

        if actual == 0 {
            return Some(Verdict::Needed(SyncReason::NoFilesInStore));
        }

        if expected > 0 && actual < expected {
            return Some(Verdict::Needed(SyncReason::Incomplete { actual, expected }));
        }

        if record.file_paths.len() != actual {
            self.heal_file_list(&record.repo, owned).await;
        }

        None
    }

    async fn heal_file_list(&self, repo: &str, owned: Vec<String>) {
        let count = owned.len();
        let result = self
            .state
            .update(repo, |current| {
                current.map(|mut record| {
                    record.file_paths = owned;
                    record
                })
            })
            .await;

        match result {
            Ok(_) => tracing::info!(repo, files = count, "rebuilt file list from object store"),
            Err(e) => tracing::warn!(repo, error = %e, "could not rebuild file list"),
        }
    }
}
