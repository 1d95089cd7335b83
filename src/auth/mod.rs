//! Token-based authentication module.
//!
//! Passwords are hashed with Argon2id; sessions are opaque tokens stored
//! server-side and presented as `Authorization: Token <key>`.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::models::User;
use crate::AppState;

/// Scheme prefix expected in the Authorization header.
pub const TOKEN_SCHEME: &str = "Token ";

/// Authenticated user carried in request extensions by the auth layer.
#[derive(Debug, Clone)]
pub struct AuthedUser(pub User);

/// Resolve the Authorization header to a user and stash it in request
/// extensions. Requests without the header pass through anonymously; a
/// header that does not resolve is rejected here, before any handler runs.
pub async fn token_auth_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let Some(value) = header_value else {
        return next.run(request).await;
    };

    let Some(token) = value.strip_prefix(TOKEN_SCHEME) else {
        return AppError::Unauthorized("Unsupported authorization scheme".to_string())
            .into_response();
    };

    match state.repo.get_user_by_token(token.trim()).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(AuthedUser(user));
            next.run(request).await
        }
        Ok(None) => {
            AppError::Unauthorized("Invalid or expired token".to_string()).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Extractor for handlers that require an authenticated caller.
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthedUser>()
            .map(|authed| CurrentUser(authed.0.clone()))
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Extractor for handlers whose view adapts to an optional caller.
pub struct MaybeUser(pub Option<User>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts.extensions.get::<AuthedUser>().map(|a| a.0.clone()),
        ))
    }
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2 hash. Malformed stored hashes
/// count as a failed verification rather than an error.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Mint a new opaque session token.
pub fn generate_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-input").unwrap();
        let b = hash_password("same-input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_stored_hash_fails_closed() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_token_format() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
