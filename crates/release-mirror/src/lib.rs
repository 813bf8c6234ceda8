pub mod decision;
pub mod feedback;
pub mod orchestrator;
pub mod ownership;
pub mod platform;
pub mod reconcile;
pub mod record;
pub mod release;
pub mod repo;
pub mod scheduler;
pub mod source;
pub mod state;
pub mod status;
pub mod storage;
pub mod sync;
pub mod upload;

pub use decision::{SyncReason, UpdateDecision, Verdict};
pub use feedback::{COMPLETION_SENTINEL, Feedback, LogSink, ProgressSink};
pub use orchestrator::{RepoOutcome, RepoResult, SyncOrchestrator, SyncOutcome, SyncPass};
pub use ownership::belongs_to;
pub use platform::{Platform, PlatformTally};
pub use reconcile::{FileReconciler, PurgeReport};
pub use record::{SyncRecord, SyncStatus};
pub use release::{AssetRef, ReleaseInfo, is_valid_asset_name};
pub use repo::{RepoConfig, RepoConfigError};
pub use scheduler::{Scheduler, TickOutcome};
pub use source::{ReleaseSource, SourceError};
pub use state::VersionStateStore;
pub use status::{RepoStatus, StatusSnapshot, StatusView};
pub use storage::{ObjectStore, RecordStore, StoreError, StoredObject};
pub use sync::{SyncError, SyncGuard, SyncPermit};
pub use upload::{AssetUploader, UploadedAsset};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
