use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use release_mirror::{ObjectStore, StoreError, StoredObject};

/// Writes land here first and are renamed into place.
const STAGING_DIR: &str = ".staging";

/// An [`ObjectStore`] over a local directory. Object keys are
/// `/`-separated relative paths below the root.
pub struct DirectoryObjectStore {
    root: PathBuf,
    next_staging_id: AtomicU64,
}

impl DirectoryObjectStore {
    /// Use `root` as the bucket, creating it if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join(STAGING_DIR))
            .await
            .map_err(|e| io_error(&root, e))?;

        Ok(Self {
            root,
            next_staging_id: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        let path = key
            .split('/')
            .fold(self.root.clone(), |path, part| path.join(part));
        Ok(path)
    }

    fn staging_path(&self) -> PathBuf {
        let id = self.next_staging_id.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(STAGING_DIR)
            .join(format!("{}-{id}", std::process::id()))
    }

    /// Remove directories left empty by a delete, up to the root.
    async fn prune_empty_parents(&self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir == self.root || !dir.starts_with(&self.root) {
                break;
            }
            if tokio::fs::remove_dir(dir).await.is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

/// Keys must be relative, `/`-separated, and free of `.`/`..` segments.
fn validate_key(key: &str) -> Result<(), StoreError> {
    let invalid = || StoreError::InvalidKey(key.to_owned());

    if key.is_empty() || key.starts_with('/') || key.contains('\\') {
        return Err(invalid());
    }

    for (i, part) in key.split('/').enumerate() {
        if part.is_empty() || part == "." || part == ".." {
            return Err(invalid());
        }
        if i == 0 && part == STAGING_DIR {
            return Err(invalid());
        }
    }

    Ok(())
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Object(format!("{}: {e}", path.display()))
}

#[async_trait::async_trait]
impl ObjectStore for DirectoryObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StoreError> {
        let mut objects = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, key_prefix)) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(io_error(&dir, e)),
            };

            while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
                let Ok(name) = entry.file_name().into_string() else {
                    tracing::warn!(path = %entry.path().display(), "skipping non-UTF-8 file name");
                    continue;
                };
                if key_prefix.is_empty() && name == STAGING_DIR {
                    continue;
                }

                let key = format!("{key_prefix}{name}");
                let file_type = entry.file_type().await.map_err(|e| io_error(&entry.path(), e))?;

                if file_type.is_dir() {
                    // Only descend where the prefix can still match.
                    let dir_key = format!("{key}/");
                    if dir_key.starts_with(prefix) || prefix.starts_with(&dir_key) {
                        pending.push((entry.path(), dir_key));
                    }
                } else if file_type.is_file() && key.starts_with(prefix) {
                    let size = entry
                        .metadata()
                        .await
                        .map_err(|e| io_error(&entry.path(), e))?
                        .len();
                    objects.push(StoredObject { key, size });
                }
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        let staging = self.staging_path();
        tokio::fs::write(&staging, &bytes)
            .await
            .map_err(|e| io_error(&staging, e))?;

        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(io_error(&path, e));
        }

        tracing::debug!(key, size = bytes.len(), "stored object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_error(&path, e)),
        }

        self.prune_empty_parents(&path).await;
        Ok(())
    }
}
