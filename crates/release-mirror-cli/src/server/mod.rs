mod handlers;
mod page;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use release_mirror::{Scheduler, SyncError, SyncOrchestrator};
use release_mirror_github::GitHubReleaseClient;
use serde::Serialize;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SyncOrchestrator>,
    pub scheduler: Arc<Scheduler>,
    pub github: Arc<GitHubReleaseClient>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/sync", get(handlers::sync))
        .route("/api/status", get(handlers::status))
        .route("/api/github-rate", get(handlers::github_rate))
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Config(_) => ApiError::BadRequest(e.to_string()),
            SyncError::UnknownRepo(_) => ApiError::NotFound(e.to_string()),
            SyncError::AlreadyRunning => ApiError::Conflict(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use release_mirror::test_support::{
        InMemoryObjectStore, InMemoryRecordStore, InMemoryReleaseSource,
    };
    use release_mirror::{COMPLETION_SENTINEL, RepoConfig, SyncStatus, VersionStateStore};
    use release_mirror_github::GitHubReleaseClientConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct TestServer {
        base: String,
        orchestrator: Arc<SyncOrchestrator>,
        _github: MockServer,
    }

    async fn spawn(configs: Vec<RepoConfig>) -> TestServer {
        let source = Arc::new(InMemoryReleaseSource::new());
        source.publish("acme/widget", "v1.0.0", &["widget-win.exe", "widget.apk"]);

        let orchestrator = Arc::new(SyncOrchestrator::new(
            configs,
            source,
            Arc::new(InMemoryObjectStore::new()),
            VersionStateStore::new(Arc::new(InMemoryRecordStore::new())),
        ));

        let github_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rate_limit"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"rate":{"limit":60,"remaining":42,"reset":1767268800}}"#,
                "application/json",
            ))
            .mount(&github_server)
            .await;

        let state = AppState {
            orchestrator: orchestrator.clone(),
            scheduler: Arc::new(Scheduler::new(orchestrator.clone(), Duration::from_secs(3600))),
            github: Arc::new(GitHubReleaseClient::new(GitHubReleaseClientConfig {
                token: None,
                api_base_url: Some(github_server.uri()),
            })),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });

        TestServer {
            base: format!("http://{addr}"),
            orchestrator,
            _github: github_server,
        }
    }

    fn widget() -> RepoConfig {
        RepoConfig::new("acme/widget", "/downloads")
    }

    #[tokio::test]
    async fn sync_streams_progress_until_sentinel() {
        let server = spawn(vec![widget()]).await;

        let response = reqwest::get(format!("{}/sync", server.base)).await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(
            response.headers()["content-type"]
                .to_str()
                .unwrap()
                .starts_with("text/event-stream")
        );

        let body = response.text().await.unwrap();
        assert!(body.contains("data: starting sync for acme/widget"));
        assert!(body.contains(&format!("data: {COMPLETION_SENTINEL}")));

        let record = server
            .orchestrator
            .sync_record("acme/widget")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, SyncStatus::Synced);
        assert_eq!(record.file_paths.len(), 2);
    }

    #[tokio::test]
    async fn sync_without_repos_is_bad_request() {
        let server = spawn(vec![]).await;
        let response = reqwest::get(format!("{}/sync", server.base)).await.unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn sync_unknown_repo_is_not_found() {
        let server = spawn(vec![widget()]).await;
        let response = reqwest::get(format!("{}/sync?repo=acme/nope", server.base))
            .await
            .unwrap();
        assert_eq!(response.status(), 404);

        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("acme/nope"));
    }

    #[tokio::test]
    async fn sync_while_running_is_conflict() {
        let server = spawn(vec![widget()]).await;
        let _pass = server.orchestrator.begin(None).unwrap();

        let response = reqwest::get(format!("{}/sync", server.base)).await.unwrap();
        assert_eq!(response.status(), 409);
    }

    #[tokio::test]
    async fn status_api_reports_configured_repos() {
        let server = spawn(vec![widget()]).await;

        let body: serde_json::Value = reqwest::get(format!("{}/api/status", server.base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["isSyncing"], false);
        assert_eq!(body["repos"][0]["repo"], "acme/widget");
        assert_eq!(body["repos"][0]["status"], "pending");
    }

    #[tokio::test]
    async fn status_api_includes_last_seen_rate_limit() {
        let server = spawn(vec![widget()]).await;
        let status_url = format!("{}/api/status", server.base);

        let before: serde_json::Value = reqwest::get(&status_url)
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(before["apiRateLimit"].is_null());

        reqwest::get(format!("{}/api/github-rate", server.base)).await.unwrap();

        let after: serde_json::Value = reqwest::get(&status_url)
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(after["apiRateLimit"]["limit"], 60);
        assert_eq!(after["apiRateLimit"]["remaining"], 42);
        assert_eq!(after["repos"][0]["repo"], "acme/widget");
    }

    #[tokio::test]
    async fn github_rate_is_proxied() {
        let server = spawn(vec![widget()]).await;

        let body: serde_json::Value = reqwest::get(format!("{}/api/github-rate", server.base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["limit"], 60);
        assert_eq!(body["remaining"], 42);
    }

    #[tokio::test]
    async fn index_renders_repo_table() {
        let server = spawn(vec![widget()]).await;

        let response = reqwest::get(&server.base).await.unwrap();
        assert_eq!(response.status(), 200);
        let html = response.text().await.unwrap();
        assert!(html.contains("acme/widget"));
        assert!(html.contains("not yet synced"));
    }
}
