//! RecipeBox Backend
//!
//! A recipe-sharing REST backend with SQLite persistence, token auth and a
//! PDF shopping-list export.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod import;
mod models;
mod shopping;
mod storage;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting RecipeBox Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Media directory: {:?}", config.media_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Media directory must exist before seed import writes into it and
    // before the static file service mounts it
    tokio::fs::create_dir_all(&config.media_dir).await?;

    // Load reference data if a seed directory is configured
    if let Some(seed_dir) = &config.seed_dir {
        tracing::info!("Importing seed data from {:?}", seed_dir);
        import::import_seed_data(&repo, seed_dir, &config.media_dir).await?;
    }

    // Create application state
    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Auth
        .route("/auth/token/login", post(api::login))
        .route("/auth/token/logout", post(api::logout))
        // Users
        .route("/users", get(api::list_users))
        .route("/users", post(api::register))
        .route("/users/me", get(api::me))
        .route("/users/subscriptions", get(api::subscriptions))
        .route("/users/set_password", post(api::set_password))
        .route("/users/{id}", get(api::get_user))
        .route("/users/{id}/subscribe", post(api::subscribe))
        .route("/users/{id}/subscribe", delete(api::unsubscribe))
        // Tags
        .route("/tags", get(api::list_tags))
        .route("/tags", post(api::create_tag))
        .route("/tags/{id}", get(api::get_tag))
        // Ingredients
        .route("/ingredients", get(api::list_ingredients))
        .route("/ingredients", post(api::create_ingredient))
        .route("/ingredients/{id}", get(api::get_ingredient))
        // Recipes
        .route("/recipes", get(api::list_recipes))
        .route("/recipes", post(api::create_recipe))
        .route(
            "/recipes/download_shopping_cart",
            get(api::download_shopping_cart),
        )
        .route("/recipes/{id}", get(api::get_recipe))
        .route("/recipes/{id}", patch(api::update_recipe))
        .route("/recipes/{id}", delete(api::delete_recipe))
        .route("/recipes/{id}/favorite", post(api::add_favorite))
        .route("/recipes/{id}/favorite", delete(api::remove_favorite))
        .route("/recipes/{id}/shopping_cart", post(api::add_to_cart))
        .route("/recipes/{id}/shopping_cart", delete(api::remove_from_cart))
        // Resolve bearer tokens into request extensions
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::token_auth_layer,
        ));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .nest_service("/media", ServeDir::new(&state.config.media_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
