use chrono::Utc;

use crate::ownership::{belongs_to, has_repo_token};
use crate::platform::Platform;
use crate::record::SyncRecord;
use crate::release::AssetRef;
use crate::repo::{repo_name, storage_prefix};
use crate::source::ReleaseSource;
use crate::state::VersionStateStore;
use crate::storage::ObjectStore;
use crate::sync::SyncError;

/// Where an asset ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub key: String,
    pub platform: Platform,
}

/// Copies single release assets into the object store.
pub struct AssetUploader<'a> {
    source: &'a dyn ReleaseSource,
    objects: &'a dyn ObjectStore,
    state: &'a VersionStateStore,
}

impl<'a> AssetUploader<'a> {
    pub fn new(
        source: &'a dyn ReleaseSource,
        objects: &'a dyn ObjectStore,
        state: &'a VersionStateStore,
    ) -> Self {
        Self {
            source,
            objects,
            state,
        }
    }

    /// Download `asset`, store it under its collision-safe key, and append
    /// the key to `repo`'s recorded file list.
    ///
    /// Returns `Ok(None)` without any I/O when the asset was fetched for a
    /// different repo.
    pub async fn upload(
        &self,
        asset: &AssetRef,
        repo: &str,
        storage_path: &str,
    ) -> Result<Option<UploadedAsset>, SyncError> {
        if let Some(source_repo) = &asset.source_repo
            && source_repo != repo
        {
            tracing::warn!(
                repo,
                asset = %asset.name,
                %source_repo,
                "skipping asset from another repo"
            );
            return Ok(None);
        }

        let bytes = self
            .source
            .download(asset)
            .await
            .map_err(|source| SyncError::Download {
                asset: asset.name.clone(),
                source,
            })?;

        let (key, platform) = storage_key(&asset.name, repo, storage_path);
        let size = bytes.len();

        self.objects
            .put(&key, bytes)
            .await
            .map_err(|source| SyncError::Upload {
                asset: asset.name.clone(),
                source,
            })?;
        tracing::info!(repo, %key, size, %platform, "uploaded asset");

        self.record_key(repo, storage_path, &key).await;

        Ok(Some(UploadedAsset { key, platform }))
    }

    /// Bookkeeping failures are logged only: the orchestrator writes the
    /// confirmed key list again at the end of the repo's pass.
    async fn record_key(&self, repo: &str, storage_path: &str, key: &str) {
        if !belongs_to(key, repo) {
            tracing::warn!(repo, key, "uploaded key does not attribute to its repo; not recording");
            return;
        }

        let result = self
            .state
            .update(repo, |current| match current {
                Some(mut record) => {
                    if record.file_paths.iter().any(|p| p == key) {
                        return None;
                    }
                    record.file_paths.push(key.to_owned());
                    Some(record)
                }
                None => Some(SyncRecord::syncing(
                    repo,
                    storage_path,
                    vec![key.to_owned()],
                    Utc::now(),
                )),
            })
            .await;

        if let Err(e) = result {
            tracing::warn!(repo, key, error = %e, "could not record uploaded key");
        }
    }
}

/// Compute the object key and platform for an asset.
///
/// Layout: `{prefix}{Platform}/{file}`, with no platform directory for
/// `Other`. The file name keeps its upstream form only when it mentions the
/// repo name and the resulting key attributes back to the repo. Otherwise
/// it gains a `_{repo name}` token, so same-named assets from different
/// repos do not collide and every stored key stays attributable.
pub fn storage_key(asset_name: &str, repo: &str, storage_path: &str) -> (String, Platform) {
    let platform = Platform::classify(asset_name);
    let mut dir = storage_prefix(storage_path);

    if platform != Platform::Other {
        dir.push_str(platform.label());
        dir.push('/');
    }

    let name = repo_name(repo);
    let plain = format!("{dir}{asset_name}");
    if asset_name.contains(name) && belongs_to(&plain, repo) {
        return (plain, platform);
    }

    (format!("{dir}{}", with_repo_token(asset_name, name)), platform)
}

/// Insert `_{repo_name}` before the extension, or append it when there is
/// none. A name that already carries the token is left alone.
pub fn with_repo_token(file_name: &str, repo_name: &str) -> String {
    if has_repo_token(file_name, repo_name) {
        return file_name.to_owned();
    }

    match file_name.rfind('.') {
        Some(dot) if dot > 0 => {
            let (stem, extension) = file_name.split_at(dot);
            format!("{stem}_{repo_name}{extension}")
        }
        _ => format!("{file_name}_{repo_name}"),
    }
}
