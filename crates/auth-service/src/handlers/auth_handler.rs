use crate::errors::AuthError;
use crate::models::{
    CurrentUserResponse, LoginRequest, OrganizationResponse, Principal, RefreshTokenRequest,
    RegistrationRequest, RegistrationResponse, TokenResponse,
};
use crate::routes::AppState;
use axum::extract::rejection::JsonRejection;
use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;

/// Unwrap a JSON body, turning extractor rejections into the standard
/// error envelope.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AuthError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!(
            target: "auth.handler",
            status = %rejection.status(),
            "Rejected request body"
        );
        AuthError::Validation("Request body is missing or malformed".to_string())
    })
}

/// Handle organization registration
///
/// POST /api/v1/auth/register
///
/// Creates the organization and its admin user, then returns the admin's
/// principal with a fresh token pair.
pub async fn handle_register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegistrationResponse>), AuthError> {
    let response = state.token_service.register(json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Handle password login
///
/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AuthError> {
    let tokens = state.token_service.login(json_body(payload)?).await?;
    Ok(Json(tokens))
}

/// Handle refresh token rotation
///
/// POST /api/v1/auth/refresh
pub async fn handle_refresh(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AuthError> {
    let payload = json_body(payload)?;
    let tokens = state.token_service.refresh(&payload.refresh_token).await?;
    Ok(Json(tokens))
}

/// Handle logout
///
/// POST /api/v1/auth/logout
///
/// Always 204 unless the revocation store fails. A body without a usable
/// refresh token is treated like an invalid token.
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<StatusCode, AuthError> {
    if let Ok(payload) = json_body(payload) {
        state.token_service.logout(&payload.refresh_token).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn handle_me(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<CurrentUserResponse>, AuthError> {
    let user = state.token_service.current_user(&principal).await?;
    Ok(Json(CurrentUserResponse { principal, user }))
}

/// GET /api/v1/auth/organization
pub async fn handle_organization(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<OrganizationResponse>, AuthError> {
    let organization = state.token_service.current_organization(&principal).await?;
    Ok(Json(organization))
}
