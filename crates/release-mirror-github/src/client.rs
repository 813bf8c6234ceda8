use std::sync::Mutex;

use release_mirror::{AssetRef, ReleaseInfo, ReleaseSource, SourceError};

use crate::rate_limit::{RateLimit, RateLimitResponse};
use crate::release::ReleaseResponse;

const API_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Configuration for the GitHub releases client.
#[derive(Debug, Clone, Default)]
pub struct GitHubReleaseClientConfig {
    pub token: Option<String>,
    pub api_base_url: Option<String>,
}

/// Fetches latest releases and their assets from GitHub.
pub struct GitHubReleaseClient {
    config: GitHubReleaseClientConfig,
    client: reqwest::Client,
    last_rate_limit: Mutex<Option<RateLimit>>,
}

impl GitHubReleaseClient {
    pub fn new(config: GitHubReleaseClientConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            last_rate_limit: Mutex::new(None),
        }
    }

    fn api_base(&self) -> &str {
        self.config
            .api_base_url
            .as_deref()
            .unwrap_or("https://api.github.com")
            .trim_end_matches('/')
    }

    fn build_request(&self, url: &str, accept: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .get(url)
            .header("User-Agent", "release-mirror")
            .header("Accept", accept);

        if let Some(token) = &self.config.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        req
    }

    /// Quota as of the most recent API response, if any.
    pub fn last_rate_limit(&self) -> Option<RateLimit> {
        *self
            .last_rate_limit
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn remember_rate_limit(&self, response: &reqwest::Response) {
        if let Some(rate) = RateLimit::from_headers(response.headers()) {
            self.store_rate_limit(rate);
        }
    }

    fn store_rate_limit(&self, rate: RateLimit) {
        *self
            .last_rate_limit
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(rate);
    }

    /// Query the current API quota.
    pub async fn rate_limit(&self) -> Result<RateLimit, SourceError> {
        let url = format!("{}/rate_limit", self.api_base());

        let response = self
            .build_request(&url, API_MEDIA_TYPE)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;
        self.remember_rate_limit(&response);

        let response = check_status(response, "rate limit").await?;
        let body: RateLimitResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;
        self.store_rate_limit(body.rate);

        Ok(body.rate)
    }
}

#[async_trait::async_trait]
impl ReleaseSource for GitHubReleaseClient {
    async fn latest_release(&self, repo: &str) -> Result<ReleaseInfo, SourceError> {
        let url = format!("{}/repos/{repo}/releases/latest", self.api_base());
        tracing::debug!(repo, %url, "fetching latest release");

        let response = self
            .build_request(&url, API_MEDIA_TYPE)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;
        self.remember_rate_limit(&response);

        let response = check_status(response, repo).await?;
        let release: ReleaseResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        tracing::info!(
            repo,
            tag = %release.tag_name,
            assets = release.assets.len(),
            "fetched latest release"
        );
        Ok(release.into_release(repo))
    }

    async fn download(&self, asset: &AssetRef) -> Result<Vec<u8>, SourceError> {
        let response = self
            .build_request(&asset.download_url, "application/octet-stream")
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let response = check_status(response, &asset.name).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        tracing::debug!(asset = %asset.name, size = bytes.len(), "downloaded asset");
        Ok(bytes.to_vec())
    }
}

async fn check_status(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response, SourceError> {
    let status = response.status();

    if status.as_u16() == 404 {
        return Err(SourceError::NotFound(what.to_owned()));
    }

    if !status.is_success() {
        return Err(SourceError::Network(format!(
            "HTTP {status} for {what}: {}",
            response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".into())
        )));
    }

    Ok(response)
}
