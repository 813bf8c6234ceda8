use chrono::{DateTime, Utc};
use serde::Deserialize;

use release_mirror::{AssetRef, ReleaseInfo};

/// Response from GitHub's latest-release endpoint.
/// `GET /repos/{owner}/{repo}/releases/latest`
#[derive(Debug, Deserialize)]
pub struct ReleaseResponse {
    pub tag_name: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assets: Vec<AssetResponse>,
}

/// A single release asset.
#[derive(Debug, Deserialize)]
pub struct AssetResponse {
    pub name: String,
    pub browser_download_url: String,
}

impl ReleaseResponse {
    /// Convert to the core model, stamping every asset with `repo`.
    pub fn into_release(self, repo: &str) -> ReleaseInfo {
        ReleaseInfo {
            tag: self.tag_name,
            published_at: self.published_at,
            assets: self
                .assets
                .into_iter()
                .map(|asset| {
                    AssetRef::new(asset.name, asset.browser_download_url).with_source(repo)
                })
                .collect(),
        }
    }
}
