use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use common::models::UserClaims;

/// Role middleware for the scheduler actions: ADMIN or EDITOR only.
#[tracing::instrument(skip(req, next))]
pub async fn require_scheduler_role(
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    // Claims were placed here by the auth middleware
    let claims = req
        .extensions()
        .get::<UserClaims>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !claims.role.can_run_scheduler() {
        tracing::warn!(
            user_id = %claims.sub,
            role = ?claims.role,
            "User lacks role for scheduler action"
        );
        return Err(StatusCode::FORBIDDEN);
    }

    tracing::info!(
        user_id = %claims.sub,
        method = %req.method(),
        path = %req.uri().path(),
        "Scheduler action authorized"
    );

    Ok(next.run(req).await)
}
