use std::convert::Infallible;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::Utc;
use futures::stream::Stream;
use release_mirror::{Feedback, StatusSnapshot, StatusView};
use release_mirror_github::RateLimit;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{ApiError, AppState, page};

async fn snapshot(state: &AppState) -> StatusSnapshot {
    StatusView::new(&state.orchestrator)
        .collect(Utc::now(), state.scheduler.last_check())
        .await
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let snapshot = snapshot(&state).await;
    Html(page::render(&snapshot, state.github.last_rate_limit()))
}

/// `/api/status` body: the snapshot plus the last quota seen from GitHub.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(flatten)]
    pub snapshot: StatusSnapshot,
    pub api_rate_limit: Option<RateLimit>,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        snapshot: snapshot(&state).await,
        api_rate_limit: state.github.last_rate_limit(),
    })
}

pub async fn github_rate(State(state): State<AppState>) -> Result<Json<RateLimit>, ApiError> {
    let rate = state
        .github
        .rate_limit()
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;
    Ok(Json(rate))
}

#[derive(Debug, Deserialize)]
pub struct SyncQuery {
    /// Only sync this repository.
    pub repo: Option<String>,
}

/// Start a pass and stream its progress lines as SSE events.
///
/// The pass runs on its own task, so it finishes even if the client
/// disconnects. The stream ends after the terminal line.
pub async fn sync(
    State(state): State<AppState>,
    Query(query): Query<SyncQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let filter = query.repo.as_deref().filter(|repo| !repo.is_empty());
    let pass = state.orchestrator.begin(filter)?;

    tracing::info!(targets = pass.targets().len(), "sync requested");

    let (tx, rx) = mpsc::unbounded_channel::<Feedback>();
    tokio::spawn(async move {
        pass.run(&tx).await;
    });

    let stream = UnboundedReceiverStream::new(rx)
        .map(|line| Ok::<_, Infallible>(Event::default().data(line.to_string())));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
