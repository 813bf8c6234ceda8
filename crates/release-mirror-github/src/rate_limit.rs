use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// GitHub API quota for the current credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    /// When the quota resets, as Unix seconds.
    pub reset: i64,
}

impl RateLimit {
    /// Read the `x-ratelimit-*` headers GitHub attaches to every response.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let field = |name: &str| headers.get(name)?.to_str().ok()?.trim().parse::<i64>().ok();

        Some(Self {
            limit: u64::try_from(field("x-ratelimit-limit")?).ok()?,
            remaining: u64::try_from(field("x-ratelimit-remaining")?).ok()?,
            reset: field("x-ratelimit-reset")?,
        })
    }

    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.reset, 0)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Body of `GET /rate_limit`; only the core quota is used.
#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitResponse {
    pub rate: RateLimit,
}
