use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;

use crate::decision::{UpdateDecision, Verdict};
use crate::feedback::{Feedback, ProgressSink};
use crate::ownership::belongs_to;
use crate::platform::PlatformTally;
use crate::reconcile::FileReconciler;
use crate::record::SyncRecord;
use crate::release::{AssetRef, ReleaseInfo};
use crate::repo::RepoConfig;
use crate::source::ReleaseSource;
use crate::state::VersionStateStore;
use crate::storage::{ObjectStore, StoreError};
use crate::sync::{SyncError, SyncGuard, SyncPermit};
use crate::upload::AssetUploader;

/// Wall-clock cap on a whole pass.
pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(600);

/// What happened to one repo during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoResult {
    UpToDate {
        tag: String,
    },
    Synced {
        tag: String,
        uploaded: usize,
        tally: PlatformTally,
    },
    /// Upstream release metadata was unavailable; the record was not touched.
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
    },
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoOutcome {
    pub repo: String,
    pub result: RepoResult,
}

/// Result of a whole pass, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub repos: Vec<RepoOutcome>,
    pub timed_out: bool,
}

impl SyncOutcome {
    pub fn get(&self, repo: &str) -> Option<&RepoResult> {
        self.repos
            .iter()
            .find(|outcome| outcome.repo == repo)
            .map(|outcome| &outcome.result)
    }

    /// Number of repos that were skipped, failed or cut off.
    pub fn problem_count(&self) -> usize {
        self.repos
            .iter()
            .filter(|outcome| {
                matches!(
                    outcome.result,
                    RepoResult::Skipped { .. } | RepoResult::Failed { .. } | RepoResult::TimedOut
                )
            })
            .count()
    }
}

/// Runs sync passes over the configured repos.
///
/// Owns the single-flight guard: at most one pass per orchestrator runs at
/// a time, whichever trigger started it.
pub struct SyncOrchestrator {
    configs: Vec<RepoConfig>,
    source: Arc<dyn ReleaseSource>,
    objects: Arc<dyn ObjectStore>,
    state: VersionStateStore,
    guard: SyncGuard,
    time_budget: Duration,
}

impl SyncOrchestrator {
    pub fn new(
        configs: Vec<RepoConfig>,
        source: Arc<dyn ReleaseSource>,
        objects: Arc<dyn ObjectStore>,
        state: VersionStateStore,
    ) -> Self {
        Self {
            configs,
            source,
            objects,
            state,
            guard: SyncGuard::new(),
            time_budget: DEFAULT_TIME_BUDGET,
        }
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }

    pub fn configs(&self) -> &[RepoConfig] {
        &self.configs
    }

    pub fn state(&self) -> &VersionStateStore {
        &self.state
    }

    pub fn objects(&self) -> &dyn ObjectStore {
        self.objects.as_ref()
    }

    pub fn guard(&self) -> &SyncGuard {
        &self.guard
    }

    pub fn is_syncing(&self) -> bool {
        self.guard.is_running()
    }

    /// Repos a pass with this filter would process, in config order.
    pub fn select_targets(&self, filter: Option<&str>) -> Result<Vec<RepoConfig>, SyncError> {
        if self.configs.is_empty() {
            return Err(SyncError::Config("no repositories configured".into()));
        }

        let Some(repo) = filter else {
            return Ok(self.configs.clone());
        };

        let targets: Vec<RepoConfig> = self
            .configs
            .iter()
            .filter(|config| config.repo == repo)
            .cloned()
            .collect();

        if targets.is_empty() {
            return Err(SyncError::UnknownRepo(repo.to_owned()));
        }
        Ok(targets)
    }

    /// Validate the request and claim the guard. The returned pass holds
    /// the guard until it is run to completion or dropped.
    pub fn begin(self: &Arc<Self>, filter: Option<&str>) -> Result<SyncPass, SyncError> {
        let targets = self.select_targets(filter)?;
        let permit = self.guard.try_acquire().ok_or(SyncError::AlreadyRunning)?;

        Ok(SyncPass {
            orchestrator: Arc::clone(self),
            targets,
            _permit: permit,
        })
    }

    /// [`begin`](Self::begin) followed by [`SyncPass::run`].
    pub async fn run_sync(
        self: &Arc<Self>,
        filter: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Result<SyncOutcome, SyncError> {
        let pass = self.begin(filter)?;
        Ok(pass.run(sink).await)
    }

    /// Whether `repo` would be re-synced if a pass ran now. Consults the
    /// upstream release for the expected asset count when it can.
    pub async fn needs_sync(&self, repo: &str, tag: &str, storage_path: &str) -> bool {
        let expected = match self.source.latest_release(repo).await {
            Ok(release) => Some(release.valid_asset_count()),
            Err(e) => {
                tracing::debug!(repo, error = %e, "asset count unavailable");
                None
            }
        };

        UpdateDecision::new(&self.state, self.objects.as_ref())
            .needs_sync(repo, tag, storage_path, expected)
            .await
            .is_needed()
    }

    pub async fn sync_record(&self, repo: &str) -> Result<Option<SyncRecord>, StoreError> {
        self.state.get(repo).await
    }

    async fn process(&self, target: &RepoConfig, sink: &dyn ProgressSink) -> RepoResult {
        let repo = target.repo.as_str();
        sink.emit(Feedback::info(format!("starting sync for {repo}")));

        let release = match self.source.latest_release(repo).await {
            Ok(release) => release,
            Err(source) => {
                let err = SyncError::Upstream {
                    repo: repo.to_owned(),
                    source,
                };
                tracing::warn!(repo, error = %err, "skipping repo");
                sink.emit(Feedback::warning(format!("skipping {repo}: {err}")));
                return RepoResult::Skipped {
                    reason: err.to_string(),
                };
            }
        };

        match self.sync_repo(target, &release, sink).await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(repo, error = %err, "sync failed");
                sink.emit(Feedback::error(format!("{repo}: {err}")));
                if let Err(e) = self
                    .state
                    .mark_error(repo, &target.storage_path, &err.to_string())
                    .await
                {
                    tracing::warn!(repo, error = %e, "could not record failure");
                }
                RepoResult::Failed {
                    error: err.to_string(),
                }
            }
        }
    }

    async fn sync_repo(
        &self,
        target: &RepoConfig,
        release: &ReleaseInfo,
        sink: &dyn ProgressSink,
    ) -> Result<RepoResult, SyncError> {
        let repo = target.repo.as_str();
        let path = target.storage_path.as_str();
        let tag = release.tag.as_str();

        let verdict = UpdateDecision::new(&self.state, self.objects.as_ref())
            .needs_sync(repo, tag, path, Some(release.valid_asset_count()))
            .await;

        let Verdict::Needed(reason) = verdict else {
            // Nothing was uploaded in this pass, so no files are listed.
            let record = SyncRecord::synced(repo, tag, path, Vec::new(), Utc::now());
            self.state.put(repo, &record).await?;
            sink.emit(Feedback::info(format!("{repo} is up to date at {tag}")));
            return Ok(RepoResult::UpToDate {
                tag: tag.to_owned(),
            });
        };

        tracing::info!(repo, tag, %reason, "sync needed");
        sink.emit(Feedback::info(format!("{repo}: {reason}; syncing {tag}")));

        if let Err(e) = self.state.clear_file_list(repo).await {
            tracing::warn!(repo, error = %e, "could not clear file list before purge");
        }

        let report = FileReconciler::new(&self.state, self.objects.as_ref(), &self.configs)
            .purge(target)
            .await?;
        if report.deleted > 0 || report.failed > 0 {
            sink.emit(Feedback::info(format!(
                "{repo}: removed {} old files ({} failed)",
                report.deleted, report.failed
            )));
        }

        let assets: Vec<AssetRef> = release
            .valid_assets()
            .cloned()
            .map(|asset| match asset.source_repo {
                Some(_) => asset,
                None => asset.with_source(repo),
            })
            .collect();

        let uploader = AssetUploader::new(self.source.as_ref(), self.objects.as_ref(), &self.state);
        let mut tally = PlatformTally::default();
        let mut keys = Vec::with_capacity(assets.len());

        for asset in &assets {
            match uploader.upload(asset, repo, path).await {
                Ok(Some(uploaded)) => {
                    tally.record(uploaded.platform);
                    sink.emit(Feedback::info(format!("uploaded {}", uploaded.key)));
                    if belongs_to(&uploaded.key, repo) {
                        keys.push(uploaded.key);
                    }
                }
                Ok(None) => {
                    sink.emit(Feedback::warning(format!(
                        "{repo}: skipped {} from another repository",
                        asset.name
                    )));
                }
                Err(e) => {
                    tracing::warn!(repo, asset = %asset.name, error = %e, "asset skipped");
                    sink.emit(Feedback::error(format!("{repo}: {e}")));
                }
            }
        }

        let uploaded = tally.total();
        let record = SyncRecord::synced(repo, tag, path, keys, Utc::now());
        if let Err(e) = self.state.put(repo, &record).await {
            tracing::warn!(repo, error = %e, "could not save final sync record");
            sink.emit(Feedback::warning(format!("{repo}: could not save sync record: {e}")));
        }

        tracing::info!(repo, tag, uploaded, "repo synced");
        sink.emit(Feedback::info(format!(
            "{repo} synced {tag}: {uploaded} files ({tally})"
        )));

        Ok(RepoResult::Synced {
            tag: tag.to_owned(),
            uploaded,
            tally,
        })
    }
}

/// A claimed, validated sync pass waiting to run.
pub struct SyncPass {
    orchestrator: Arc<SyncOrchestrator>,
    targets: Vec<RepoConfig>,
    _permit: SyncPermit,
}

impl SyncPass {
    pub fn targets(&self) -> &[RepoConfig] {
        &self.targets
    }

    /// Process every target in order, then emit exactly one terminal line.
    ///
    /// If the time budget runs out, every target without an outcome yet is
    /// marked `error` and the pass ends with [`Feedback::Aborted`].
    pub async fn run(self, sink: &dyn ProgressSink) -> SyncOutcome {
        let orchestrator = &self.orchestrator;
        let budget = orchestrator.time_budget;
        let finished = Mutex::new(Vec::with_capacity(self.targets.len()));

        let work = async {
            for target in &self.targets {
                let result = orchestrator.process(target, sink).await;
                finished
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push(RepoOutcome {
                        repo: target.repo.clone(),
                        result,
                    });
            }
        };

        let timed_out = tokio::time::timeout(budget, work).await.is_err();
        let mut repos = finished
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if !timed_out {
            sink.emit(Feedback::Complete);
            return SyncOutcome {
                repos,
                timed_out: false,
            };
        }

        let err = SyncError::Timeout(budget);
        tracing::error!(error = %err, "sync pass aborted");

        for target in &self.targets {
            if repos.iter().any(|outcome| outcome.repo == target.repo) {
                continue;
            }
            if let Err(e) = orchestrator
                .state
                .mark_error(&target.repo, &target.storage_path, &err.to_string())
                .await
            {
                tracing::warn!(repo = %target.repo, error = %e, "could not record timeout");
            }
            repos.push(RepoOutcome {
                repo: target.repo.clone(),
                result: RepoResult::TimedOut,
            });
        }

        sink.emit(Feedback::Aborted(err.to_string()));
        SyncOutcome {
            repos,
            timed_out: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::feedback::COMPLETION_SENTINEL;
    use crate::platform::Platform;
    use crate::record::SyncStatus;
    use crate::test_support::{InMemoryObjectStore, InMemoryRecordStore, InMemoryReleaseSource};

    use super::*;

    struct Fixture {
        source: Arc<InMemoryReleaseSource>,
        objects: Arc<InMemoryObjectStore>,
        records: Arc<InMemoryRecordStore>,
        state: VersionStateStore,
    }

    impl Fixture {
        fn new() -> Self {
            let records = Arc::new(InMemoryRecordStore::new());
            Self {
                source: Arc::new(InMemoryReleaseSource::new()),
                objects: Arc::new(InMemoryObjectStore::new()),
                state: VersionStateStore::new(records.clone()),
                records,
            }
        }

        fn orchestrator(&self, configs: Vec<RepoConfig>) -> Arc<SyncOrchestrator> {
            Arc::new(SyncOrchestrator::new(
                configs,
                self.source.clone(),
                self.objects.clone(),
                self.state.clone(),
            ))
        }

        async fn record(&self, repo: &str) -> Option<SyncRecord> {
            self.state.get(repo).await.unwrap()
        }
    }

    fn widget() -> RepoConfig {
        RepoConfig::new("acme/widget", "/downloads")
    }

    fn lines(sink: Mutex<Vec<Feedback>>) -> Vec<Feedback> {
        sink.into_inner().unwrap()
    }

    #[tokio::test]
    async fn first_sync_uploads_valid_assets() {
        let fx = Fixture::new();
        fx.source.publish(
            "acme/widget",
            "v1.0.0",
            &["widget-win.exe", "widget.apk", "widget-Source-code.zip"],
        );
        let orchestrator = fx.orchestrator(vec![widget()]);
        let sink = Mutex::new(Vec::new());

        let outcome = orchestrator.run_sync(None, &sink).await.unwrap();

        let record = fx.record("acme/widget").await.unwrap();
        assert_eq!(record.status, SyncStatus::Synced);
        assert_eq!(record.version.as_deref(), Some("v1.0.0"));
        assert_eq!(record.file_paths.len(), 2);
        let platforms: Vec<Platform> = record
            .file_paths
            .iter()
            .map(|key| Platform::classify(key))
            .collect();
        assert!(platforms.contains(&Platform::Windows));
        assert!(platforms.contains(&Platform::Android));
        assert!(fx.objects.contains("downloads/Windows/widget-win.exe"));
        assert!(fx.objects.contains("downloads/Android/widget.apk"));

        match outcome.get("acme/widget") {
            Some(RepoResult::Synced { uploaded, tally, .. }) => {
                assert_eq!(*uploaded, 2);
                assert_eq!(tally.count(Platform::Windows), 1);
                assert_eq!(tally.count(Platform::Android), 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let lines = lines(sink);
        assert_eq!(lines.last(), Some(&Feedback::Complete));
        assert_eq!(lines.last().unwrap().to_string(), COMPLETION_SENTINEL);
    }

    #[tokio::test]
    async fn second_pass_on_current_release_is_a_noop() {
        let fx = Fixture::new();
        fx.source
            .publish("acme/widget", "v1.0.0", &["widget-win.exe", "widget.apk"]);
        let orchestrator = fx.orchestrator(vec![widget()]);
        orchestrator
            .run_sync(None, &Mutex::new(Vec::new()))
            .await
            .unwrap();

        let puts = fx.objects.put_count();
        let deletes = fx.objects.delete_count();
        let downloads = fx.source.download_count();

        let outcome = orchestrator
            .run_sync(None, &Mutex::new(Vec::new()))
            .await
            .unwrap();

        assert!(matches!(outcome.get("acme/widget"), Some(RepoResult::UpToDate { .. })));
        assert_eq!(fx.objects.put_count(), puts);
        assert_eq!(fx.objects.delete_count(), deletes);
        assert_eq!(fx.source.download_count(), downloads);

        let record = fx.record("acme/widget").await.unwrap();
        assert_eq!(record.status, SyncStatus::Synced);
        assert_eq!(record.version.as_deref(), Some("v1.0.0"));
        assert!(record.file_paths.is_empty());
    }

    #[tokio::test]
    async fn path_change_alone_forces_sync() {
        let fx = Fixture::new();
        fx.source.publish("acme/widget", "v1.0.0", &["widget.apk"]);
        fx.objects.insert("old/Android/widget.apk", b"apk");
        let record = SyncRecord::synced(
            "acme/widget",
            "v1.0.0",
            "/old",
            vec!["old/Android/widget.apk".into()],
            Utc::now(),
        );
        fx.state.put("acme/widget", &record).await.unwrap();

        let orchestrator = fx.orchestrator(vec![RepoConfig::new("acme/widget", "/new")]);
        assert!(orchestrator.needs_sync("acme/widget", "v1.0.0", "/new").await);
        assert!(!orchestrator.needs_sync("acme/widget", "v1.0.0", "/old").await);

        orchestrator
            .run_sync(None, &Mutex::new(Vec::new()))
            .await
            .unwrap();

        let record = fx.record("acme/widget").await.unwrap();
        assert_eq!(record.path, "/new");
        assert_eq!(record.file_paths, vec!["new/Android/widget.apk".to_owned()]);
    }

    #[tokio::test]
    async fn release_names_sharing_repo_substring_are_replaced_not_leaked() {
        let fx = Fixture::new();
        let app = RepoConfig::new("acme/app", "/dl");
        let orchestrator = fx.orchestrator(vec![app]);

        fx.source.publish("acme/app", "v1", &["myapp-1.0.exe"]);
        orchestrator
            .run_sync(None, &Mutex::new(Vec::new()))
            .await
            .unwrap();

        let record = fx.record("acme/app").await.unwrap();
        assert_eq!(record.file_paths, vec!["dl/Windows/myapp-1.0_app.exe".to_owned()]);

        fx.source.publish("acme/app", "v2", &["myapp-2.0.exe"]);
        orchestrator
            .run_sync(None, &Mutex::new(Vec::new()))
            .await
            .unwrap();

        assert_eq!(fx.objects.keys(), vec!["dl/Windows/myapp-2.0_app.exe".to_owned()]);
        let record = fx.record("acme/app").await.unwrap();
        assert_eq!(record.version.as_deref(), Some("v2"));
        assert_eq!(record.file_paths, vec!["dl/Windows/myapp-2.0_app.exe".to_owned()]);

        let downloads = fx.source.download_count();
        let outcome = orchestrator
            .run_sync(None, &Mutex::new(Vec::new()))
            .await
            .unwrap();
        assert!(matches!(outcome.get("acme/app"), Some(RepoResult::UpToDate { .. })));
        assert_eq!(fx.source.download_count(), downloads);
    }

    #[tokio::test]
    async fn upstream_failure_skips_repo_and_batch_completes() {
        let fx = Fixture::new();
        fx.source.fail_repo("acme/broken");
        fx.source.publish("acme/widget", "v2", &["widget.apk"]);
        let orchestrator = fx.orchestrator(vec![
            RepoConfig::new("acme/broken", "/downloads"),
            widget(),
        ]);
        let sink = Mutex::new(Vec::new());

        let outcome = orchestrator.run_sync(None, &sink).await.unwrap();

        assert!(fx.record("acme/broken").await.is_none());
        assert!(matches!(outcome.get("acme/broken"), Some(RepoResult::Skipped { .. })));
        assert_eq!(fx.record("acme/widget").await.unwrap().status, SyncStatus::Synced);

        let lines = lines(sink);
        assert!(
            lines
                .iter()
                .any(|line| matches!(line, Feedback::Warning(msg) if msg.contains("acme/broken")))
        );
        assert_eq!(lines.last(), Some(&Feedback::Complete));
    }

    #[tokio::test]
    async fn failed_asset_leaves_honest_file_list() {
        let fx = Fixture::new();
        fx.source
            .publish("acme/widget", "v1", &["widget-win.exe", "widget.apk"]);
        fx.source.remove_blob("acme/widget", "widget-win.exe");
        let orchestrator = fx.orchestrator(vec![widget()]);
        let sink = Mutex::new(Vec::new());

        orchestrator.run_sync(None, &sink).await.unwrap();

        let record = fx.record("acme/widget").await.unwrap();
        assert_eq!(record.status, SyncStatus::Synced);
        assert_eq!(record.file_paths, vec!["downloads/Android/widget.apk".to_owned()]);
        assert!(lines(sink).iter().any(Feedback::is_error));
    }

    #[tokio::test]
    async fn purges_previous_version_before_upload() {
        let fx = Fixture::new();
        fx.source.publish("acme/widget", "v1", &["widget-1.apk"]);
        let orchestrator = fx.orchestrator(vec![widget()]);
        orchestrator
            .run_sync(None, &Mutex::new(Vec::new()))
            .await
            .unwrap();

        fx.source.publish("acme/widget", "v2", &["widget-2.apk"]);
        orchestrator
            .run_sync(None, &Mutex::new(Vec::new()))
            .await
            .unwrap();

        assert_eq!(fx.objects.keys(), vec!["downloads/Android/widget-2.apk".to_owned()]);
        let record = fx.record("acme/widget").await.unwrap();
        assert_eq!(record.version.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn purge_failure_marks_repo_error_and_keeps_version() {
        let fx = Fixture::new();
        fx.source.publish("acme/widget", "v2", &["widget.apk"]);
        let record = SyncRecord::synced(
            "acme/widget",
            "v1",
            "/downloads",
            vec!["downloads/Android/widget.apk".into()],
            Utc::now(),
        );
        fx.state.put("acme/widget", &record).await.unwrap();
        fx.objects.fail_list(true);
        let orchestrator = fx.orchestrator(vec![widget()]);

        let outcome = orchestrator
            .run_sync(None, &Mutex::new(Vec::new()))
            .await
            .unwrap();

        assert!(matches!(outcome.get("acme/widget"), Some(RepoResult::Failed { .. })));
        let record = fx.record("acme/widget").await.unwrap();
        assert_eq!(record.status, SyncStatus::Error);
        assert_eq!(record.version.as_deref(), Some("v1"));
        assert_eq!(record.path, "/downloads");
        assert!(record.error.is_some());
    }

    #[tokio::test]
    async fn timeout_marks_unfinished_repos_and_releases_guard() {
        let fx = Fixture::new();
        fx.source.publish("acme/widget", "v1", &["widget.apk"]);
        fx.source.set_delay(Duration::from_millis(200));
        let orchestrator = Arc::new(
            SyncOrchestrator::new(
                vec![widget(), RepoConfig::new("acme/gadget", "/downloads")],
                fx.source.clone(),
                fx.objects.clone(),
                fx.state.clone(),
            )
            .with_time_budget(Duration::from_millis(20)),
        );
        let sink = Mutex::new(Vec::new());

        let outcome = orchestrator.run_sync(None, &sink).await.unwrap();

        assert!(outcome.timed_out);
        assert_eq!(outcome.problem_count(), 2);
        for repo in ["acme/widget", "acme/gadget"] {
            let record = fx.record(repo).await.unwrap();
            assert_eq!(record.status, SyncStatus::Error);
            assert!(record.error.unwrap().contains("timed out"));
        }

        let lines = lines(sink);
        assert!(matches!(lines.last(), Some(Feedback::Aborted(_))));
        assert!(!orchestrator.is_syncing());
    }

    #[tokio::test]
    async fn concurrent_pass_is_rejected() {
        let fx = Fixture::new();
        fx.source.publish("acme/widget", "v1", &["widget.apk"]);
        let orchestrator = fx.orchestrator(vec![widget()]);

        let pass = orchestrator.begin(None).unwrap();
        assert!(orchestrator.is_syncing());
        assert!(matches!(
            orchestrator.begin(None),
            Err(SyncError::AlreadyRunning)
        ));

        pass.run(&Mutex::new(Vec::new())).await;
        assert!(!orchestrator.is_syncing());
        assert!(orchestrator.begin(None).is_ok());
    }

    #[tokio::test]
    async fn filter_selects_single_repo() {
        let fx = Fixture::new();
        fx.source.publish("acme/widget", "v1", &["widget.apk"]);
        fx.source.publish("acme/gadget", "v1", &["gadget.apk"]);
        let orchestrator = fx.orchestrator(vec![
            widget(),
            RepoConfig::new("acme/gadget", "/downloads"),
        ]);

        let outcome = orchestrator
            .run_sync(Some("acme/gadget"), &Mutex::new(Vec::new()))
            .await
            .unwrap();

        assert_eq!(outcome.repos.len(), 1);
        assert!(fx.record("acme/widget").await.is_none());
        assert!(fx.record("acme/gadget").await.is_some());
    }

    #[tokio::test]
    async fn configuration_errors() {
        let fx = Fixture::new();

        let empty = fx.orchestrator(vec![]);
        assert!(matches!(empty.begin(None), Err(SyncError::Config(_))));

        let orchestrator = fx.orchestrator(vec![widget()]);
        assert!(matches!(
            orchestrator.begin(Some("acme/unknown")),
            Err(SyncError::UnknownRepo(_))
        ));
        assert!(!orchestrator.is_syncing());
    }

    #[tokio::test]
    async fn final_save_failure_is_reported_not_fatal() {
        let fx = Fixture::new();
        fx.source.publish("acme/widget", "v1", &["widget.apk"]);
        fx.records.fail_writes(true);
        let orchestrator = fx.orchestrator(vec![widget()]);
        let sink = Mutex::new(Vec::new());

        let outcome = orchestrator.run_sync(None, &sink).await.unwrap();

        assert!(matches!(outcome.get("acme/widget"), Some(RepoResult::Synced { .. })));
        assert!(fx.objects.contains("downloads/Android/widget.apk"));
        assert_eq!(lines(sink).last(), Some(&Feedback::Complete));
    }
}
