use axum::{
    extract::{Extension, Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use common::db::repositories::AuditRepository;
use common::models::{
    AdminAlert, AlertKind, AuditAction, ContentItem, ContentKind, RunSummary, UserClaims,
};
use common::retry::{run_with_retry, LinearBackoff};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::handlers::{ErrorResponse, SuccessResponse};
use crate::state::AppState;

/// Response body for the external cron trigger
#[derive(Debug, Serialize)]
pub struct CronRunResponse {
    pub success: bool,
    pub summary: RunSummary,
    pub ran_at: DateTime<Utc>,
}

/// Decide whether a cron request is authorized, before any store access.
///
/// Token precedence: `Authorization: Bearer`, then `X-Cron-Secret`, then the
/// `secret` query parameter. With no secret configured the trigger is open
/// only outside production.
pub(crate) fn authorize_cron(
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    configured_secret: Option<&str>,
    is_production: bool,
) -> bool {
    let presented = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
        .or_else(|| {
            headers
                .get("X-Cron-Secret")
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        })
        .or_else(|| query.get("secret").cloned());

    match configured_secret {
        Some(secret) => presented.as_deref() == Some(secret),
        None => !is_production,
    }
}

/// External time-based trigger, token-gated. Wraps the run in bounded
/// retry because nobody is watching this path to retry by hand.
#[tracing::instrument(skip(state, headers, query))]
pub async fn cron_trigger(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<CronRunResponse>, (StatusCode, Json<ErrorResponse>)> {
    if !authorize_cron(
        &headers,
        &query,
        state.config.scheduler.cron_secret.as_deref(),
        state.config.server.is_production(),
    ) {
        tracing::warn!("Unauthorized cron trigger rejected");
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(
                "unauthorized",
                "Invalid or missing cron secret",
            )),
        ));
    }

    let strategy = LinearBackoff::new(
        Duration::from_millis(state.config.scheduler.cron_retry_base_ms),
        state.config.scheduler.cron_max_attempts,
    );

    let summary = run_with_retry(&strategy, || state.scheduler.run_scheduled_publishing())
        .await
        .map_err(|e| {
            let err = common::errors::SchedulerError::RetriesExhausted {
                attempts: state.config.scheduler.cron_max_attempts,
                last_error: e.to_string(),
            };
            tracing::error!(error = %err, "Cron scheduler run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("scheduler_error", err.to_string())),
            )
        })?;

    let audit_repo = AuditRepository::new(state.db_pool.clone());
    if let Err(e) = audit_repo
        .record(
            AuditAction::SchedulerCronRun,
            None,
            serde_json::json!({
                "publishedPosts": summary.published_posts,
                "publishedReviews": summary.published_reviews,
                "itemErrors": summary.errors.len(),
            }),
        )
        .await
    {
        tracing::warn!(error = %e, "Failed to record cron run audit event");
    }

    Ok(Json(CronRunResponse {
        success: true,
        summary,
        ran_at: Utc::now(),
    }))
}

/// Manual "Run Now" action for admins and editors. Runs synchronously,
/// audits unconditionally, and escalates failures as a critical alert on
/// top of the error response.
#[tracing::instrument(skip(state), fields(user_id = %claims.sub))]
pub async fn run_scheduler(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
) -> Result<Json<SuccessResponse<RunSummary>>, (StatusCode, Json<ErrorResponse>)> {
    let result = state.scheduler.run_scheduled_publishing().await;

    let audit_detail = match &result {
        Ok(summary) => serde_json::json!({
            "status": "succeeded",
            "publishedPosts": summary.published_posts,
            "publishedReviews": summary.published_reviews,
            "itemErrors": summary.errors.len(),
        }),
        Err(e) => serde_json::json!({
            "status": "failed",
            "error": e.to_string(),
        }),
    };
    let audit_repo = AuditRepository::new(state.db_pool.clone());
    if let Err(e) = audit_repo
        .record(AuditAction::SchedulerManualRun, Some(claims.sub), audit_detail)
        .await
    {
        tracing::warn!(error = %e, "Failed to record manual run audit event");
    }

    match result {
        Ok(summary) => Ok(Json(SuccessResponse::new(summary))),
        Err(e) => {
            let alert = AdminAlert::new(
                AlertKind::SchedulerRunFailed,
                format!("Manual scheduler run by {} failed: {}", claims.email, e),
                serde_json::json!({ "error": e.to_string() }),
            );
            if let Err(notify_err) = state.notifier.notify_admin_users(&alert).await {
                tracing::warn!(error = %notify_err, "Failed to raise manual-run failure alert");
            }

            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("scheduler_error", e.to_string())),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub publish_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ClearScheduleRequest {
    #[serde(default)]
    pub publish_now: bool,
}

fn parse_kind(kind: &str) -> Option<ContentKind> {
    match kind {
        "posts" => Some(ContentKind::Post),
        "reviews" => Some(ContentKind::Review),
        _ => None,
    }
}

fn kind_not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("not_found", "Unknown content kind")),
    )
}

/// Set or overwrite the publish schedule on a draft.
#[tracing::instrument(skip(state), fields(user_id = %claims.sub))]
pub async fn schedule_item(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Extension(claims): Extension<UserClaims>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<SuccessResponse<ContentItem>>, (StatusCode, Json<ErrorResponse>)> {
    let kind = parse_kind(&kind).ok_or_else(kind_not_found)?;

    let updated = state
        .scheduler
        .schedule_publication(kind, id, req.publish_at, claims.sub)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to schedule item");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("scheduler_error", e.to_string())),
            )
        })?;

    updated.map(|item| Json(SuccessResponse::new(item))).ok_or((
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(
            "not_found",
            "Item not found or not a draft",
        )),
    ))
}

/// Clear a draft's schedule, optionally publishing it immediately instead.
#[tracing::instrument(skip(state), fields(user_id = %claims.sub))]
pub async fn clear_item_schedule(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Extension(claims): Extension<UserClaims>,
    Json(req): Json<ClearScheduleRequest>,
) -> Result<Json<SuccessResponse<ContentItem>>, (StatusCode, Json<ErrorResponse>)> {
    let kind = parse_kind(&kind).ok_or_else(kind_not_found)?;

    let updated = state
        .scheduler
        .clear_schedule(kind, id, claims.sub, req.publish_now)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to clear schedule");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("scheduler_error", e.to_string())),
            )
        })?;

    updated.map(|item| Json(SuccessResponse::new(item))).ok_or((
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(
            "not_found",
            "Item not found or not a draft",
        )),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_accepted() {
        let headers = headers_with("Authorization", "Bearer s3cret");
        assert!(authorize_cron(&headers, &HashMap::new(), Some("s3cret"), true));
    }

    #[test]
    fn test_wrong_token_rejected() {
        let headers = headers_with("Authorization", "Bearer wrong");
        assert!(!authorize_cron(&headers, &HashMap::new(), Some("s3cret"), false));
    }

    #[test]
    fn test_custom_header_accepted() {
        let headers = headers_with("X-Cron-Secret", "s3cret");
        assert!(authorize_cron(&headers, &HashMap::new(), Some("s3cret"), true));
    }

    #[test]
    fn test_query_param_accepted() {
        let mut query = HashMap::new();
        query.insert("secret".to_string(), "s3cret".to_string());
        assert!(authorize_cron(&HeaderMap::new(), &query, Some("s3cret"), true));
    }

    #[test]
    fn test_bearer_takes_precedence_over_query() {
        // A wrong bearer token loses even when the query parameter matches.
        let headers = headers_with("Authorization", "Bearer wrong");
        let mut query = HashMap::new();
        query.insert("secret".to_string(), "s3cret".to_string());
        assert!(!authorize_cron(&headers, &query, Some("s3cret"), false));
    }

    #[test]
    fn test_missing_token_rejected() {
        assert!(!authorize_cron(
            &HeaderMap::new(),
            &HashMap::new(),
            Some("s3cret"),
            false
        ));
    }

    #[test]
    fn test_no_secret_open_outside_production() {
        assert!(authorize_cron(&HeaderMap::new(), &HashMap::new(), None, false));
    }

    #[test]
    fn test_no_secret_closed_in_production() {
        assert!(!authorize_cron(&HeaderMap::new(), &HashMap::new(), None, true));
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!(parse_kind("posts"), Some(ContentKind::Post));
        assert_eq!(parse_kind("reviews"), Some(ContentKind::Review));
        assert_eq!(parse_kind("pages"), None);
    }
}
