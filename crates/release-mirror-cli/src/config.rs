use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use release_mirror::RepoConfig;
use release_mirror::orchestrator::DEFAULT_TIME_BUDGET;
use release_mirror::scheduler::DEFAULT_CHECK_INTERVAL;
use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub repos: Vec<RepoConfig>,

    #[serde(default)]
    pub github_token: Option<String>,

    /// Override for the GitHub API base URL (GitHub Enterprise, tests).
    #[serde(default)]
    pub api_base_url: Option<String>,

    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Holds the record database and the mirrored objects.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    #[serde(default = "default_sync_budget")]
    pub sync_budget_secs: u64,

    #[serde(default = "default_tick")]
    pub scheduler_tick_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            repos: Vec::new(),
            github_token: None,
            api_base_url: None,
            listen: default_listen(),
            data_dir: None,
            check_interval_secs: default_check_interval(),
            sync_budget_secs: default_sync_budget(),
            scheduler_tick_secs: default_tick(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8787))
}

fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL.as_secs()
}

fn default_sync_budget() -> u64 {
    DEFAULT_TIME_BUDGET.as_secs()
}

fn default_tick() -> u64 {
    60
}

impl AppConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn sync_budget(&self) -> Duration {
        Duration::from_secs(self.sync_budget_secs)
    }

    pub fn scheduler_tick(&self) -> Duration {
        Duration::from_secs(self.scheduler_tick_secs.max(1))
    }

    /// Data directory: configured, or the platform data dir.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let base = dirs::data_dir().context("could not determine data directory")?;
        Ok(base.join("release-mirror"))
    }

    /// Layer environment variables over the file config.
    ///
    /// `REPO_*` variables hold `owner/name:path` declarations and are read in
    /// variable-name order (`REPO_2` before `REPO_10`). A declaration for a
    /// repo already in the file replaces the file entry.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut declarations = Vec::new();

        for (key, value) in vars {
            match key.as_str() {
                "GITHUB_TOKEN" if !value.is_empty() => self.github_token = Some(value),
                "CHECK_INTERVAL" => {
                    self.check_interval_secs = value
                        .trim()
                        .parse()
                        .with_context(|| format!("CHECK_INTERVAL must be seconds, got `{value}`"))?;
                }
                "RELEASE_MIRROR_LISTEN" => {
                    self.listen = value
                        .trim()
                        .parse()
                        .with_context(|| format!("invalid RELEASE_MIRROR_LISTEN `{value}`"))?;
                }
                "RELEASE_MIRROR_DATA_DIR" if !value.is_empty() => {
                    self.data_dir = Some(PathBuf::from(value));
                }
                _ if key.starts_with("REPO_") => declarations.push((key, value)),
                _ => {}
            }
        }

        declarations.sort_by(|(a, _), (b, _)| repo_var_order(a).cmp(&repo_var_order(b)));

        for (key, value) in declarations {
            let repo = RepoConfig::parse(&value).with_context(|| format!("invalid {key}"))?;
            let existing = self
                .repos
                .iter_mut()
                .find(|existing| existing.repo == repo.repo);
            match existing {
                Some(existing) => *existing = repo,
                None => self.repos.push(repo),
            }
        }

        Ok(())
    }
}

/// Numeric suffixes sort numerically, everything else by name after them.
fn repo_var_order(key: &str) -> (bool, u64, &str) {
    match key.trim_start_matches("REPO_").parse::<u64>() {
        Ok(n) => (false, n, key),
        Err(_) => (true, 0, key),
    }
}

/// Config file path: `~/.config/release-mirror/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("release-mirror").join("config.toml"))
}

fn read_file(path: &Path) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config at {}", path.display()))
}

/// Load config from `explicit` (must exist) or the default path (optional),
/// then apply the process environment.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let mut config = match explicit {
        Some(path) => read_file(path)?,
        None => match config_path() {
            Some(path) if path.exists() => read_file(&path)?,
            _ => AppConfig::default(),
        },
    };

    config.apply_env(std::env::vars())?;
    tracing::debug!(repos = config.repos.len(), listen = %config.listen, "loaded config");
    Ok(config)
}
