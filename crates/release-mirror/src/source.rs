use std::sync::Arc;

use crate::release::{AssetRef, ReleaseInfo};

/// Errors that can occur when talking to the upstream release host.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("no release found for {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

/// Where releases and their asset bytes come from.
///
/// Implementations must stamp `source_repo` on every asset they return.
#[async_trait::async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Fetch metadata for the latest published release of `repo`.
    async fn latest_release(&self, repo: &str) -> Result<ReleaseInfo, SourceError>;

    /// Download the bytes of one asset. Non-success responses are errors.
    async fn download(&self, asset: &AssetRef) -> Result<Vec<u8>, SourceError>;
}

#[async_trait::async_trait]
impl<T: ReleaseSource + ?Sized> ReleaseSource for Arc<T> {
    async fn latest_release(&self, repo: &str) -> Result<ReleaseInfo, SourceError> {
        (**self).latest_release(repo).await
    }

    async fn download(&self, asset: &AssetRef) -> Result<Vec<u8>, SourceError> {
        (**self).download(asset).await
    }
}
