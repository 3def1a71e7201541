use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use common::db::repositories::ContentRepository;
use common::models::{ContentItem, ContentKind};
use serde::Serialize;
use uuid::Uuid;

use crate::handlers::{ErrorResponse, SuccessResponse};
use crate::state::AppState;

const LISTING_LIMIT: i64 = 50;

/// Published item as shown in member-facing listings
#[derive(Debug, Serialize)]
pub struct ContentSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl From<ContentItem> for ContentSummary {
    fn from(item: ContentItem) -> Self {
        Self {
            id: item.id,
            title: item.title,
            slug: item.slug,
            published_at: item.published_at,
        }
    }
}

async fn list_published(
    state: &AppState,
    kind: ContentKind,
) -> Result<Json<SuccessResponse<Vec<ContentSummary>>>, (StatusCode, Json<ErrorResponse>)> {
    let repo = ContentRepository::new(state.db_pool.clone());
    let items = repo.list_published(kind, LISTING_LIMIT).await.map_err(|e| {
        tracing::error!(kind = %kind, error = %e, "Failed to list published items");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(
                "internal_error",
                "Failed to load content",
            )),
        )
    })?;

    Ok(Json(SuccessResponse::new(
        items.into_iter().map(ContentSummary::from).collect(),
    )))
}

/// Published articles, newest first
#[tracing::instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<Vec<ContentSummary>>>, (StatusCode, Json<ErrorResponse>)> {
    list_published(&state, ContentKind::Post).await
}

/// Published reviews, newest first
#[tracing::instrument(skip(state))]
pub async fn list_reviews(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<Vec<ContentSummary>>>, (StatusCode, Json<ErrorResponse>)> {
    list_published(&state, ContentKind::Review).await
}
