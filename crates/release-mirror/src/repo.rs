use serde::{Deserialize, Serialize};

/// Errors from parsing a repository declaration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoConfigError {
    #[error("repository declaration is empty")]
    Empty,

    #[error("expected `owner/name`, got `{0}`")]
    InvalidRepo(String),
}

/// A repository to mirror and where its assets land in the object store.
///
/// Deserializing validates the repo identity, so a config file cannot
/// declare a repo that [`RepoConfig::parse`] would reject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRepoConfig")]
pub struct RepoConfig {
    /// Repository identity, `owner/name`.
    pub repo: String,
    /// Storage path prefix, e.g. `/downloads/tool`. May be empty.
    pub storage_path: String,
}

#[derive(Deserialize)]
struct RawRepoConfig {
    repo: String,
    #[serde(default, alias = "path")]
    storage_path: String,
}

impl TryFrom<RawRepoConfig> for RepoConfig {
    type Error = RepoConfigError;

    fn try_from(raw: RawRepoConfig) -> Result<Self, Self::Error> {
        let config = Self::new(raw.repo, raw.storage_path);
        config.validate()?;
        Ok(config)
    }
}

impl RepoConfig {
    pub fn new(repo: impl Into<String>, storage_path: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            storage_path: storage_path.into(),
        }
    }

    /// Parse an `owner/name:path` declaration. Everything after the first
    /// colon is the storage path, so paths may themselves contain colons.
    pub fn parse(declaration: &str) -> Result<Self, RepoConfigError> {
        let declaration = declaration.trim();
        if declaration.is_empty() {
            return Err(RepoConfigError::Empty);
        }

        let (repo, path) = declaration.split_once(':').unwrap_or((declaration, ""));
        let repo = repo.trim();
        if split_repo(repo).is_none() {
            return Err(RepoConfigError::InvalidRepo(repo.to_owned()));
        }

        Ok(Self::new(repo, path.trim()))
    }

    /// Check that `repo` is a well-formed `owner/name`.
    pub fn validate(&self) -> Result<(), RepoConfigError> {
        if self.repo.trim().is_empty() {
            return Err(RepoConfigError::Empty);
        }
        if split_repo(&self.repo).is_none() {
            return Err(RepoConfigError::InvalidRepo(self.repo.clone()));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        repo_name(&self.repo)
    }

    /// Normalized key prefix for this repo's objects.
    pub fn storage_prefix(&self) -> String {
        storage_prefix(&self.storage_path)
    }
}

/// Split `owner/name` into its parts. Both parts must be non-empty.
pub fn split_repo(repo: &str) -> Option<(&str, &str)> {
    let (owner, name) = repo.split_once('/')?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((owner, name))
}

/// The short name of a repo (`name` in `owner/name`).
pub fn repo_name(repo: &str) -> &str {
    split_repo(repo).map(|(_, name)| name).unwrap_or(repo)
}

/// Normalize a storage path into an object key prefix: no leading slash,
/// exactly one trailing slash, or empty for the bucket root.
pub fn storage_prefix(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    }
}

/// Key of a repo's sync record in the record store.
pub fn record_key(repo: &str) -> String {
    format!("repo:{repo}")
}

/// File name of the legacy per-repo version metadata object.
pub fn version_file_name(repo: &str) -> String {
    format!("{}-version.json", repo.replace('/', "-"))
}
