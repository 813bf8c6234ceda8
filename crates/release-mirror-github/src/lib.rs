pub mod client;
pub mod rate_limit;
pub mod release;

pub use client::{GitHubReleaseClient, GitHubReleaseClientConfig};
pub use rate_limit::RateLimit;
