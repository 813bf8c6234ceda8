use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::feedback::LogSink;
use crate::orchestrator::{SyncOrchestrator, SyncOutcome};
use crate::sync::SyncError;

/// Default time between scheduled passes: one week.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Result of one [`Scheduler::tick`].
#[derive(Debug)]
pub enum TickOutcome {
    /// Another pass holds the guard.
    Busy,
    /// The check interval has not elapsed yet.
    NotDue,
    Ran(SyncOutcome),
    Failed(SyncError),
}

/// Periodic trigger. Call [`tick`](Self::tick) often; it only starts a pass
/// once per check interval, and never while another pass is running.
pub struct Scheduler {
    orchestrator: Arc<SyncOrchestrator>,
    check_interval: Duration,
    last_check: Mutex<Option<DateTime<Utc>>>,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<SyncOrchestrator>, check_interval: Duration) -> Self {
        Self {
            orchestrator,
            check_interval,
            last_check: Mutex::new(None),
        }
    }

    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        *self
            .last_check
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn is_due(&self, now: DateTime<Utc>) -> bool {
        let Some(last) = self.last_check() else {
            return true;
        };
        match chrono::TimeDelta::from_std(self.check_interval) {
            Ok(interval) => now.signed_duration_since(last) >= interval,
            Err(_) => false,
        }
    }

    pub async fn tick(&self, now: DateTime<Utc>) -> TickOutcome {
        if self.orchestrator.is_syncing() {
            tracing::info!("sync already in progress; skipping scheduled check");
            return TickOutcome::Busy;
        }

        if !self.is_due(now) {
            return TickOutcome::NotDue;
        }

        let pass = match self.orchestrator.begin(None) {
            Ok(pass) => pass,
            Err(SyncError::AlreadyRunning) => return TickOutcome::Busy,
            Err(e) => {
                tracing::warn!(error = %e, "scheduled sync not started");
                return TickOutcome::Failed(e);
            }
        };

        tracing::info!(repos = pass.targets().len(), "starting scheduled sync");
        let outcome = pass.run(&LogSink).await;

        *self
            .last_check
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(now);

        TickOutcome::Ran(outcome)
    }
}
