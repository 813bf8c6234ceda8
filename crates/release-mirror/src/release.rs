use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The latest published release of a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub tag: String,
    pub published_at: Option<DateTime<Utc>>,
    pub assets: Vec<AssetRef>,
}

impl ReleaseInfo {
    /// Assets that are worth mirroring.
    pub fn valid_assets(&self) -> impl Iterator<Item = &AssetRef> {
        self.assets.iter().filter(|asset| asset.is_valid())
    }

    pub fn valid_asset_count(&self) -> usize {
        self.valid_assets().count()
    }
}

/// A downloadable release asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub name: String,
    pub download_url: String,
    /// Repository the asset was fetched from.
    pub source_repo: Option<String>,
}

impl AssetRef {
    pub fn new(name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            download_url: download_url.into(),
            source_repo: None,
        }
    }

    pub fn with_source(mut self, repo: impl Into<String>) -> Self {
        self.source_repo = Some(repo.into());
        self
    }

    pub fn is_valid(&self) -> bool {
        is_valid_asset_name(&self.name)
    }
}

/// Source archives, checksums and signatures are not mirrored.
///
/// "Source code" matches regardless of case or of `-`/`_` standing in for
/// the space, so re-uploaded archives like `tool-Source-code.zip` are
/// excluded too.
pub fn is_valid_asset_name(name: &str) -> bool {
    let words = name.to_lowercase().replace(['-', '_'], " ");
    !words.contains("source code") && !name.ends_with(".sha256") && !name.ends_with(".asc")
}
