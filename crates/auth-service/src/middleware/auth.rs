//! Bearer token authentication for protected routes.

use crate::errors::AuthError;
use crate::routes::AppState;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Pull the token out of an `Authorization: Bearer <token>` header value.
fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolve the access token and store the `Principal` in request extensions.
///
/// Handlers behind this layer read it with `Extension<Principal>`.
pub async fn require_principal(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header_value = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AuthError::InvalidToken("Missing Authorization header".to_string()))?;

    let token = bearer_token(header_value).ok_or_else(|| {
        AuthError::InvalidToken("Invalid Authorization header format".to_string())
    })?;

    let principal = state.token_service.resolve_current_principal(token)?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
