//! Auth token endpoints.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{ApiResponse, ApiResult};
use crate::auth::{generate_token, verify_password, CurrentUser, TOKEN_SCHEME};
use crate::errors::AppError;
use crate::AppState;

/// Request body for token login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response body carrying a fresh auth token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub auth_token: String,
}

/// POST /api/auth/token/login - Exchange credentials for a token.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<TokenResponse> {
    let user = state
        .repo
        .get_user_by_email(&request.email)
        .await?
        .filter(|user| verify_password(&request.password, &user.password_hash))
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let token = generate_token();
    state.repo.insert_token(&token, &user.id).await?;

    Ok(ApiResponse::new(TokenResponse { auth_token: token }))
}

/// POST /api/auth/token/logout - Revoke the presented token.
pub async fn logout(
    State(state): State<AppState>,
    _user: CurrentUser,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(TOKEN_SCHEME))
        .map(str::trim)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    state.repo.delete_token(token).await?;
    Ok(StatusCode::NO_CONTENT)
}
