use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::auth::jwt::JwtManager;
use crate::utils::error::ApiError;

/// Auth middleware - validate the bearer token and expose `Claims` to handlers.
pub async fn require_auth(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let jwt_manager = request
        .extensions()
        .get::<Arc<JwtManager>>()
        .ok_or_else(|| ApiError::InternalError("JWT manager not configured".to_string()))?
        .clone();

    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))?;

    let claims = jwt_manager.validate_token(token)?;
    debug!("Authenticated request for user {}", claims.username);

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
