//! Ingredient catalog endpoints. Unpaginated reference data with a
//! prefix-search hook for typeahead.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{ApiResponse, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{CreateIngredientRequest, Ingredient};
use crate::AppState;

/// Query parameters for the ingredient listing.
#[derive(Debug, Deserialize)]
pub struct IngredientListQuery {
    /// Case-insensitive name prefix.
    pub name: Option<String>,
}

/// GET /api/ingredients - List ingredients, optionally by name prefix.
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(params): Query<IngredientListQuery>,
) -> ApiResult<Vec<Ingredient>> {
    let ingredients = state.repo.list_ingredients(params.name.as_deref()).await?;
    Ok(ApiResponse::new(ingredients))
}

/// GET /api/ingredients/:id - Get a single ingredient.
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Ingredient> {
    let ingredient = state
        .repo
        .get_ingredient(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ingredient {} not found", id)))?;
    Ok(ApiResponse::new(ingredient))
}

/// POST /api/ingredients - Create a new catalog ingredient.
pub async fn create_ingredient(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<CreateIngredientRequest>,
) -> ApiResult<Ingredient> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if request.measurement_unit.trim().is_empty() {
        return Err(AppError::Validation(
            "Measurement unit is required".to_string(),
        ));
    }

    let ingredient = state
        .repo
        .create_ingredient(request.name.trim(), request.measurement_unit.trim())
        .await?;

    Ok(ApiResponse::created(ingredient))
}
