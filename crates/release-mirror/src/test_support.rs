use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::release::{AssetRef, ReleaseInfo};
use crate::source::{ReleaseSource, SourceError};
use crate::storage::{ObjectStore, RecordStore, StoreError, StoredObject};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// In-memory record store with switchable failures.
#[derive(Default)]
pub struct InMemoryRecordStore {
    values: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw stored value, bypassing failure switches.
    pub fn raw(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    pub fn insert_raw(&self, key: &str, value: &str) {
        lock(&self.values).insert(key.to_owned(), value.to_owned());
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Record("read failure injected".into()));
        }
        Ok(self.raw(key))
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Record("write failure injected".into()));
        }
        lock(&self.values).insert(key.to_owned(), value);
        Ok(())
    }
}

/// In-memory bucket. Keys are kept sorted so listings are deterministic.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_list: AtomicBool,
    fail_put: AtomicBool,
    failing_deletes: Mutex<HashSet<String>>,
    puts: AtomicUsize,
    deletes: AtomicUsize,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, bytes: impl AsRef<[u8]>) {
        lock(&self.objects).insert(key.to_owned(), bytes.as_ref().to_vec());
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.objects).contains_key(key)
    }

    pub fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        lock(&self.objects).get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_put(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, key: &str) {
        lock(&self.failing_deletes).insert(key.to_owned());
    }

    /// Successful puts so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Successful deletes so far.
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StoreError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::Object("list failure injected".into()));
        }
        Ok(lock(&self.objects)
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, bytes)| StoredObject {
                key: key.clone(),
                size: bytes.len() as u64,
            })
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get_bytes(key))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(StoreError::Object(format!("put of {key} failed")));
        }
        lock(&self.objects).insert(key.to_owned(), bytes);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        if lock(&self.failing_deletes).contains(key) {
            return Err(StoreError::Object(format!("delete of {key} failed")));
        }
        lock(&self.objects).remove(key);
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory upstream. Asset bytes are served by download URL.
#[derive(Default)]
pub struct InMemoryReleaseSource {
    releases: Mutex<HashMap<String, ReleaseInfo>>,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    failing_repos: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
    downloads: AtomicUsize,
}

impl InMemoryReleaseSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register downloadable bytes for an asset of `repo` and return its
    /// reference. Does not attach it to any release.
    pub fn add_asset(&self, repo: &str, name: &str, bytes: impl AsRef<[u8]>) -> AssetRef {
        let url = format!("https://example.test/{repo}/{name}");
        lock(&self.blobs).insert(url.clone(), bytes.as_ref().to_vec());
        AssetRef::new(name, url).with_source(repo)
    }

    /// Publish `tag` as the latest release of `repo`, replacing any
    /// previous one. Each asset's content is its own name.
    pub fn publish(&self, repo: &str, tag: &str, asset_names: &[&str]) {
        let assets = asset_names
            .iter()
            .map(|name| self.add_asset(repo, name, name.as_bytes()))
            .collect();
        lock(&self.releases).insert(
            repo.to_owned(),
            ReleaseInfo {
                tag: tag.to_owned(),
                published_at: None,
                assets,
            },
        );
    }

    /// Make every call for `repo` fail with a network error.
    pub fn fail_repo(&self, repo: &str) {
        lock(&self.failing_repos).insert(repo.to_owned());
    }

    /// Drop the bytes behind one asset so its download fails.
    pub fn remove_blob(&self, repo: &str, name: &str) {
        lock(&self.blobs).remove(&format!("https://example.test/{repo}/{name}"));
    }

    /// Sleep before answering each call.
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = Some(delay);
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl ReleaseSource for InMemoryReleaseSource {
    async fn latest_release(&self, repo: &str) -> Result<ReleaseInfo, SourceError> {
        self.pause().await;
        if lock(&self.failing_repos).contains(repo) {
            return Err(SourceError::Network(format!("{repo}: connection refused")));
        }
        lock(&self.releases)
            .get(repo)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(repo.to_owned()))
    }

    async fn download(&self, asset: &AssetRef) -> Result<Vec<u8>, SourceError> {
        self.pause().await;
        let bytes = lock(&self.blobs)
            .get(&asset.download_url)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(asset.download_url.clone()))?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(bytes)
    }
}
