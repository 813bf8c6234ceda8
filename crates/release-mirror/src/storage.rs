use std::sync::Arc;

/// Errors surfaced by the object store or the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object store error: {0}")]
    Object(String),

    #[error("record store error: {0}")]
    Record(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// An entry in the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
}

/// Bucket-style blob storage the mirrored assets are written into.
///
/// Implementations provide per-key atomicity only.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// List objects whose key starts with `prefix`. An empty prefix lists
    /// the whole store.
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// String key-value storage holding the serialized sync records.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StoreError> {
        (**self).list(prefix).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        (**self).put(key, bytes).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key).await
    }
}

#[async_trait::async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        (**self).put(key, value).await
    }
}
