use axum::{
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use common::models::UserClaims;

use crate::state::AppState;

/// Authentication middleware that validates JWT tokens
#[tracing::instrument(skip(state, req, next))]
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    // Extract Authorization header
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::warn!("Invalid authorization header format");
        StatusCode::UNAUTHORIZED
    })?;

    let claims = validate_token(token, &state.config.auth.jwt_secret)?;

    // Insert claims into request extensions for use by handlers
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Validate a JWT issued by the session layer
fn validate_token(token: &str, jwt_secret: &str) -> Result<UserClaims, StatusCode> {
    let validation = jsonwebtoken::Validation::default();

    let token_data = jsonwebtoken::decode::<UserClaims>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "Failed to validate token");
        StatusCode::UNAUTHORIZED
    })?;

    // Expiry is also checked here so a skewed validator config cannot let
    // stale tokens through.
    let now = chrono::Utc::now().timestamp();
    if token_data.claims.exp < now {
        tracing::warn!("Token expired");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::UserRole;
    use uuid::Uuid;

    fn make_token(secret: &str, exp_offset_secs: i64, role: UserRole) -> String {
        let claims = UserClaims {
            sub: Uuid::new_v4(),
            email: "editor@example.com".to_string(),
            role,
            exp: chrono::Utc::now().timestamp() + exp_offset_secs,
        };
        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_accepted() {
        let token = make_token("secret", 3600, UserRole::Admin);
        let claims = validate_token(&token, "secret").unwrap();
        assert_eq!(claims.role, UserRole::Admin);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = make_token("secret", 3600, UserRole::Admin);
        assert_eq!(
            validate_token(&token, "other-secret").err(),
            Some(StatusCode::UNAUTHORIZED)
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = make_token("secret", -3600, UserRole::Admin);
        assert_eq!(
            validate_token(&token, "secret").err(),
            Some(StatusCode::UNAUTHORIZED)
        );
    }
}
