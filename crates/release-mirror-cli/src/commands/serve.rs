use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use release_mirror::{Scheduler, TickOutcome};
use tokio::time::MissedTickBehavior;

use crate::app::App;
use crate::server::{self, AppState};

/// Serve HTTP and run scheduled checks until Ctrl-C.
pub async fn run(app: App) -> Result<()> {
    let scheduler = Arc::new(app.scheduler());
    let state = AppState {
        orchestrator: app.orchestrator.clone(),
        scheduler: scheduler.clone(),
        github: app.github.clone(),
    };

    let schedule = tokio::spawn(schedule_loop(scheduler, app.config.scheduler_tick()));

    let listener = tokio::net::TcpListener::bind(app.config.listen)
        .await
        .with_context(|| format!("failed to bind {}", app.config.listen))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    schedule.abort();
    tracing::info!("shut down");
    Ok(())
}

async fn schedule_loop(scheduler: Arc<Scheduler>, tick: std::time::Duration) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        match scheduler.tick(Utc::now()).await {
            TickOutcome::Ran(outcome) => tracing::info!(
                repos = outcome.repos.len(),
                problems = outcome.problem_count(),
                timed_out = outcome.timed_out,
                "scheduled check finished"
            ),
            TickOutcome::Failed(e) => tracing::warn!(error = %e, "scheduled check failed"),
            TickOutcome::Busy => tracing::debug!("sync already running, skipping check"),
            TickOutcome::NotDue => {}
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
