//! User models: storage record, public views and request bodies.

use serde::{Deserialize, Serialize};

use super::RecipeSummary;

/// A stored user account. Never serialized directly: the password hash
/// stays inside the process.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub created_at: String,
}

/// Public user representation, annotated per requesting user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserView {
    pub fn new(user: &User, is_subscribed: bool) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_subscribed,
        }
    }
}

/// Author entry in subscription listings: the user view plus a capped
/// projection of their recipes and the uncapped total.
#[derive(Debug, Clone, Serialize)]
pub struct UserWithRecipes {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: i64,
}

impl UserWithRecipes {
    pub fn new(view: UserView, recipes: Vec<RecipeSummary>, recipes_count: i64) -> Self {
        Self {
            id: view.id,
            email: view.email,
            username: view.username,
            first_name: view.first_name,
            last_name: view.last_name,
            is_subscribed: view.is_subscribed,
            recipes,
            recipes_count,
        }
    }
}

/// Request body for registering a new user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Request body for changing the caller's password.
#[derive(Debug, Clone, Deserialize)]
pub struct SetPasswordRequest {
    pub current_password: String,
    pub new_password: String,
}
