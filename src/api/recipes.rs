//! Recipe endpoints: CRUD, per-user ledgers and the shopping-list export.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::{resolve_page, ApiResponse, ApiResult, Page};
use crate::auth::{CurrentUser, MaybeUser};
use crate::db::RecipeFilter;
use crate::errors::AppError;
use crate::models::{
    CreateRecipeRequest, RecipeRecord, RecipeSummary, RecipeView, UpdateRecipeRequest, User,
};
use crate::{shopping, storage, AppState};

/// GET /api/recipes - List recipes with filters, newest first.
///
/// The `tags` key repeats, so the query string is taken as raw pairs rather
/// than a struct.
pub async fn list_recipes(
    State(state): State<AppState>,
    MaybeUser(requester): MaybeUser,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Page<RecipeView>> {
    let mut filter = RecipeFilter::default();
    let mut page_param = None;
    let mut limit_param = None;

    for (key, value) in &params {
        match key.as_str() {
            "tags" => filter.tag_slugs.push(value.clone()),
            "author" => filter.author_id = Some(value.clone()),
            "is_favorited" => {
                // Only meaningful for an authenticated caller
                if parse_flag(key, value)? {
                    if let Some(me) = &requester {
                        filter.favorited_by = Some(me.id.clone());
                    }
                }
            }
            "is_in_shopping_cart" => {
                if parse_flag(key, value)? {
                    if let Some(me) = &requester {
                        filter.in_cart_of = Some(me.id.clone());
                    }
                }
            }
            "page" => page_param = Some(parse_number(key, value)?),
            "limit" => limit_param = Some(parse_number(key, value)?),
            _ => {}
        }
    }

    let (page, limit) = resolve_page(page_param, limit_param, state.config.page_size)?;
    let (records, count) = state.repo.list_recipes(&filter, page, limit).await?;

    let requester_id = requester.as_ref().map(|u| u.id.as_str());
    let mut results = Vec::with_capacity(records.len());
    for record in &records {
        results.push(state.repo.build_recipe_view(record, requester_id).await?);
    }

    Ok(ApiResponse::new(Page {
        count,
        page,
        limit,
        results,
    }))
}

/// POST /api/recipes - Publish a new recipe.
pub async fn create_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateRecipeRequest>,
) -> ApiResult<RecipeView> {
    request.validate()?;

    let image_path = storage::store_image(&state.config.media_dir, &request.image).await?;

    // A rejected insert must not leave the decoded image behind
    let id = match state.repo.create_recipe(&user.id, &request, &image_path).await {
        Ok(id) => id,
        Err(err) => {
            storage::remove_image(&state.config.media_dir, &image_path).await;
            return Err(err);
        }
    };

    let record = created_record(&state, &id).await?;
    let view = state.repo.build_recipe_view(&record, Some(&user.id)).await?;
    Ok(ApiResponse::created(view))
}

/// GET /api/recipes/:id - Retrieve one recipe, annotated per requester.
pub async fn get_recipe(
    State(state): State<AppState>,
    MaybeUser(requester): MaybeUser,
    Path(id): Path<String>,
) -> ApiResult<RecipeView> {
    let record = fetch_recipe(&state, &id).await?;
    let requester_id = requester.as_ref().map(|u| u.id.as_str());
    let view = state.repo.build_recipe_view(&record, requester_id).await?;
    Ok(ApiResponse::new(view))
}

/// PATCH /api/recipes/:id - Update a recipe. Author only; the ingredient
/// list and tag set are replaced wholesale.
pub async fn update_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateRecipeRequest>,
) -> ApiResult<RecipeView> {
    let record = fetch_recipe(&state, &id).await?;
    ensure_author(&record, &user)?;
    request.validate()?;

    let image_path = match &request.image {
        Some(data_url) if !data_url.trim().is_empty() => {
            Some(storage::store_image(&state.config.media_dir, data_url).await?)
        }
        _ => None,
    };

    if let Err(err) = state
        .repo
        .update_recipe(&id, &request, image_path.as_deref())
        .await
    {
        if let Some(new_image) = &image_path {
            storage::remove_image(&state.config.media_dir, new_image).await;
        }
        return Err(err);
    }

    let record = fetch_recipe(&state, &id).await?;
    let view = state.repo.build_recipe_view(&record, Some(&user.id)).await?;
    Ok(ApiResponse::new(view))
}

/// DELETE /api/recipes/:id - Delete a recipe. Author only.
pub async fn delete_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let record = fetch_recipe(&state, &id).await?;
    ensure_author(&record, &user)?;

    state.repo.delete_recipe(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/recipes/:id/favorite - Add a recipe to the caller's favorites.
pub async fn add_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<RecipeSummary> {
    let record = fetch_recipe(&state, &id).await?;
    state.repo.add_favorite(&user.id, &record.id).await?;
    Ok(ApiResponse::created(record.summary()))
}

/// DELETE /api/recipes/:id/favorite - Remove a recipe from favorites.
pub async fn remove_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let record = fetch_recipe(&state, &id).await?;
    state.repo.remove_favorite(&user.id, &record.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/recipes/:id/shopping_cart - Add a recipe to the caller's cart.
pub async fn add_to_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<RecipeSummary> {
    let record = fetch_recipe(&state, &id).await?;
    state.repo.add_to_cart(&user.id, &record.id).await?;
    Ok(ApiResponse::created(record.summary()))
}

/// DELETE /api/recipes/:id/shopping_cart - Remove a recipe from the cart.
pub async fn remove_from_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let record = fetch_recipe(&state, &id).await?;
    state.repo.remove_from_cart(&user.id, &record.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/recipes/download_shopping_cart - Export the aggregated shopping
/// list as a PDF attachment.
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    let rows = state.repo.cart_ingredient_rows(&user.id).await?;
    let items = shopping::aggregate(&rows)?;
    let bytes = shopping::render_pdf(&items)?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf"),
        (
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"shopping_list.pdf\"",
        ),
    ];
    Ok((headers, bytes).into_response())
}

async fn fetch_recipe(state: &AppState, id: &str) -> Result<RecipeRecord, AppError> {
    state
        .repo
        .get_recipe_record(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {} not found", id)))
}

async fn created_record(state: &AppState, id: &str) -> Result<RecipeRecord, AppError> {
    state
        .repo
        .get_recipe_record(id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Recipe {} vanished after insert", id)))
}

fn ensure_author(record: &RecipeRecord, user: &User) -> Result<(), AppError> {
    if record.author_id != user.id {
        return Err(AppError::Forbidden(
            "Only the author can modify this recipe".to_string(),
        ));
    }
    Ok(())
}

fn parse_flag(key: &str, value: &str) -> Result<bool, AppError> {
    match value {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(AppError::Validation(format!(
            "Invalid boolean value '{}' for '{}'",
            other, key
        ))),
    }
}

fn parse_number(key: &str, value: &str) -> Result<u32, AppError> {
    value.parse().map_err(|_| {
        AppError::Validation(format!("Invalid numeric value '{}' for '{}'", value, key))
    })
}
