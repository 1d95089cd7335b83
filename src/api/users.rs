//! User account and subscription endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{resolve_page, ApiResponse, ApiResult, Page};
use crate::auth::{hash_password, verify_password, CurrentUser, MaybeUser};
use crate::errors::AppError;
use crate::models::{CreateUserRequest, SetPasswordRequest, User, UserView, UserWithRecipes};
use crate::AppState;

/// Query parameters for the user listing.
#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    /// Case-insensitive substring matched against username or email.
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Query parameters for the subscriptions listing.
#[derive(Debug, Deserialize)]
pub struct SubscriptionsQuery {
    /// Cap on the number of recipes embedded per author.
    pub recipes_limit: Option<u32>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// POST /api/users - Register a new account.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<UserView> {
    validate_registration(&request)?;

    let password_hash = hash_password(&request.password)?;
    let user = state.repo.create_user(&request, &password_hash).await?;

    Ok(ApiResponse::created(UserView::new(&user, false)))
}

/// GET /api/users - List users, annotated per requester.
pub async fn list_users(
    State(state): State<AppState>,
    MaybeUser(requester): MaybeUser,
    Query(params): Query<UserListQuery>,
) -> ApiResult<Page<UserView>> {
    let (page, limit) = resolve_page(params.page, params.limit, state.config.page_size)?;
    let (users, count) = state
        .repo
        .list_users(params.search.as_deref(), page, limit)
        .await?;

    let mut results = Vec::with_capacity(users.len());
    for user in &users {
        let is_subscribed = match &requester {
            Some(me) => state.repo.is_subscribed(&me.id, &user.id).await?,
            None => false,
        };
        results.push(UserView::new(user, is_subscribed));
    }

    Ok(ApiResponse::new(Page {
        count,
        page,
        limit,
        results,
    }))
}

/// GET /api/users/me - The authenticated caller's own profile.
pub async fn me(CurrentUser(user): CurrentUser) -> ApiResult<UserView> {
    Ok(ApiResponse::new(UserView::new(&user, false)))
}

/// GET /api/users/:id - A user profile, annotated per requester.
pub async fn get_user(
    State(state): State<AppState>,
    MaybeUser(requester): MaybeUser,
    Path(id): Path<String>,
) -> ApiResult<UserView> {
    let user = state
        .repo
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

    let is_subscribed = match &requester {
        Some(me) => state.repo.is_subscribed(&me.id, &user.id).await?,
        None => false,
    };

    Ok(ApiResponse::new(UserView::new(&user, is_subscribed)))
}

/// POST /api/users/set_password - Change the caller's password.
pub async fn set_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<SetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    if !verify_password(&request.current_password, &user.password_hash) {
        return Err(AppError::Validation(
            "Current password is incorrect".to_string(),
        ));
    }
    validate_new_password(&request.new_password)?;

    let password_hash = hash_password(&request.new_password)?;
    state.repo.update_password(&user.id, &password_hash).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/users/:id/subscribe - Follow an author.
pub async fn subscribe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<UserWithRecipes> {
    let author = state
        .repo
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

    if author.id == user.id {
        return Err(AppError::InvalidOperation(
            "Cannot subscribe to yourself".to_string(),
        ));
    }

    state.repo.subscribe(&user.id, &author.id).await?;

    let view = author_with_recipes(&state, &author, true, None).await?;
    Ok(ApiResponse::created(view))
}

/// DELETE /api/users/:id/subscribe - Unfollow an author.
pub async fn unsubscribe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let author = state
        .repo
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

    state.repo.unsubscribe(&user.id, &author.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/subscriptions - Authors the caller follows, each with
/// their recipes.
pub async fn subscriptions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<SubscriptionsQuery>,
) -> ApiResult<Page<UserWithRecipes>> {
    let (page, limit) = resolve_page(params.page, params.limit, state.config.page_size)?;
    let (authors, count) = state.repo.list_subscriptions(&user.id, page, limit).await?;

    let mut results = Vec::with_capacity(authors.len());
    for author in &authors {
        results.push(author_with_recipes(&state, author, true, params.recipes_limit).await?);
    }

    Ok(ApiResponse::new(Page {
        count,
        page,
        limit,
        results,
    }))
}

async fn author_with_recipes(
    state: &AppState,
    author: &User,
    is_subscribed: bool,
    recipes_limit: Option<u32>,
) -> Result<UserWithRecipes, AppError> {
    let recipes = state.repo.author_recipes(&author.id, recipes_limit).await?;
    let recipes_count = state.repo.count_author_recipes(&author.id).await?;
    Ok(UserWithRecipes::new(
        UserView::new(author, is_subscribed),
        recipes,
        recipes_count,
    ))
}

fn validate_registration(request: &CreateUserRequest) -> Result<(), AppError> {
    if request.email.trim().is_empty() || !request.email.contains('@') {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    if request.username.trim().is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }
    if !request
        .username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_'))
    {
        return Err(AppError::Validation(
            "Username may contain only letters, digits and .@+-_".to_string(),
        ));
    }
    if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
        return Err(AppError::Validation(
            "First and last name are required".to_string(),
        ));
    }
    validate_new_password(&request.password)
}

fn validate_new_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}
