//! Ingredient catalog model and request body.

use serde::{Deserialize, Serialize};

/// A catalog ingredient: the reference data recipes point at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub measurement_unit: String,
}

/// Request body for creating a new ingredient.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIngredientRequest {
    pub name: String,
    pub measurement_unit: String,
}
