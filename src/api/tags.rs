//! Tag endpoints. Tags are unpaginated reference data.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{ApiResponse, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{is_valid_slug, resolve_color, CreateTagRequest, Tag};
use crate::AppState;

/// GET /api/tags - List all tags.
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Vec<Tag>> {
    let tags = state.repo.list_tags().await?;
    Ok(ApiResponse::new(tags))
}

/// GET /api/tags/:id - Get a single tag.
pub async fn get_tag(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Tag> {
    let tag = state
        .repo
        .get_tag(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tag {} not found", id)))?;
    Ok(ApiResponse::new(tag))
}

/// POST /api/tags - Create a new tag.
pub async fn create_tag(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<CreateTagRequest>,
) -> ApiResult<Tag> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if !is_valid_slug(&request.slug) {
        return Err(AppError::Validation(format!(
            "Invalid slug '{}': only letters, digits, hyphens and underscores are allowed",
            request.slug
        )));
    }
    let color = resolve_color(&request.color).ok_or_else(|| {
        AppError::Validation(format!(
            "Unknown color '{}': use #RGB/#RRGGBB hex or a CSS basic color name",
            request.color
        ))
    })?;

    let tag = state
        .repo
        .create_tag(request.name.trim(), &color, &request.slug)
        .await?;

    Ok(ApiResponse::created(tag))
}
