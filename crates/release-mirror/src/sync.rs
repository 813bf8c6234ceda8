use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::source::SourceError;
use crate::storage::StoreError;

/// Errors that can occur during sync operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No repos configured.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("repository {0} is not configured")]
    UnknownRepo(String),

    #[error("a sync pass is already running")]
    AlreadyRunning,

    #[error("could not fetch release for {repo}: {source}")]
    Upstream {
        repo: String,
        #[source]
        source: SourceError,
    },

    #[error("download of {asset} failed: {source}")]
    Download {
        asset: String,
        #[source]
        source: SourceError,
    },

    #[error("upload of {asset} failed: {source}")]
    Upload {
        asset: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("sync timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Single-flight flag shared by every trigger of a sync pass.
#[derive(Debug, Clone, Default)]
pub struct SyncGuard {
    running: Arc<AtomicBool>,
}

impl SyncGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard. Returns `None` while another pass holds it.
    pub fn try_acquire(&self) -> Option<SyncPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncPermit {
                running: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Proof of holding the [`SyncGuard`]. Releases it on drop, on every exit
/// path including cancellation.
#[derive(Debug)]
pub struct SyncPermit {
    running: Arc<AtomicBool>,
}

impl Drop for SyncPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}
