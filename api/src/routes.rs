use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{auth_middleware, passive_triggers_middleware, require_scheduler_role};
use crate::state::AppState;

/// Create the main application router with all routes and middleware
#[tracing::instrument(skip(state))]
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        // Token-gated inside the handler, before any store access
        .route("/api/scheduler/cron", get(handlers::scheduler::cron_trigger));

    // Member-facing render paths carry the passive triggers
    let content_routes = Router::new()
        .route("/api/posts", get(handlers::content::list_posts))
        .route("/api/reviews", get(handlers::content::list_reviews))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            passive_triggers_middleware,
        ));

    // Scheduler actions (authentication + ADMIN/EDITOR role required)
    let scheduler_routes = Router::new()
        .route("/api/scheduler/run", post(handlers::scheduler::run_scheduler))
        .route(
            "/api/admin/:kind/:id/schedule",
            post(handlers::scheduler::schedule_item),
        )
        .route(
            "/api/admin/:kind/:id/schedule/clear",
            post(handlers::scheduler::clear_item_schedule),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                ))
                .layer(axum::middleware::from_fn(require_scheduler_role)),
        );

    Router::new()
        .merge(public_routes)
        .merge(content_routes)
        .merge(scheduler_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
