use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// Passive-trigger middleware on the member-facing render paths.
///
/// Awaits the throttled scheduler and monitor before the handler runs. Both
/// are no-ops in the common case (guard cooldown), and every error is
/// swallowed: a scheduler fault must never break page rendering.
#[tracing::instrument(skip(state, req, next))]
pub async fn passive_triggers_middleware(
    State(state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    match state.scheduler.maybe_run_scheduled_publishing().await {
        Ok(outcome) => {
            if !outcome.was_skipped() {
                tracing::debug!("Passive scheduler run executed");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Passive scheduler run failed"),
    }

    // The monitor isolates its own failures into the summary.
    let _ = state.monitor.maybe_run_system_health_monitor().await;

    next.run(req).await
}
