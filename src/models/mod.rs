//! Data models for the RecipeBox application.
//!
//! Split into storage records and per-operation wire DTOs so that every view
//! is computed from explicit inputs (record + requesting user), never from
//! ambient request state.

mod ingredient;
mod recipe;
mod tag;
mod user;

pub use ingredient::*;
pub use recipe::*;
pub use tag::*;
pub use user::*;
