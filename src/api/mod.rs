//! REST API module.
//!
//! Contains all API routes and handlers. Success bodies share one envelope;
//! paginated listings nest a `{count, page, limit, results}` block in it.

mod auth;
mod ingredients;
mod recipes;
mod tags;
mod users;

pub use auth::*;
pub use ingredients::*;
pub use recipes::*;
pub use tags::*;
pub use users::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK envelope.
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            status: StatusCode::OK,
        }
    }

    /// 201 Created envelope.
    pub fn created(data: T) -> Self {
        Self {
            success: true,
            data,
            status: StatusCode::CREATED,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Paginated listing block placed inside the success envelope.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub count: i64,
    pub page: u32,
    pub limit: u32,
    pub results: Vec<T>,
}

/// Hard cap on client-requested page sizes.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Resolve optional pagination parameters against the configured default.
pub fn resolve_page(
    page: Option<u32>,
    limit: Option<u32>,
    default_limit: u32,
) -> Result<(u32, u32), AppError> {
    let page = page.unwrap_or(1);
    if page == 0 {
        return Err(AppError::Validation("Page numbers start at 1".to_string()));
    }
    let limit = limit.unwrap_or(default_limit).min(MAX_PAGE_SIZE);
    if limit == 0 {
        return Err(AppError::Validation("Limit must be positive".to_string()));
    }
    Ok((page, limit))
}

#[cfg(test)]
mod page_tests {
    use super::*;

    #[test]
    fn test_defaults_apply() {
        assert_eq!(resolve_page(None, None, 6).unwrap(), (1, 6));
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(resolve_page(Some(2), Some(10_000), 6).unwrap(), (2, 100));
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(resolve_page(Some(0), None, 6).is_err());
        assert!(resolve_page(None, Some(0), 6).is_err());
    }
}
