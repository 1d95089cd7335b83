//! Recipe models: storage record, per-requester views and request bodies.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{Tag, UserView};
use crate::errors::AppError;

/// A stored recipe row. Tags, ingredient amounts and per-requester flags
/// are attached when the view is built.
#[derive(Debug, Clone)]
pub struct RecipeRecord {
    pub id: String,
    pub author_id: String,
    pub name: String,
    /// Relative path beneath the media directory.
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
    pub created_at: String,
}

impl RecipeRecord {
    /// Public URL under which the stored image is served.
    pub fn image_url(&self) -> String {
        format!("/media/{}", self.image)
    }

    pub fn summary(&self) -> RecipeSummary {
        RecipeSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            image: self.image_url(),
            cooking_time: self.cooking_time,
        }
    }
}

/// One ingredient line of a recipe as served to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredientView {
    pub id: String,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Full recipe representation, annotated per requesting user.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeView {
    pub id: String,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
}

/// Short recipe projection used by ledger mutation responses and
/// subscription listings.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub cooking_time: i64,
}

/// One (ingredient id, amount) pair in a create/update payload.
#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmount {
    pub id: String,
    pub amount: i64,
}

/// Request body for creating a new recipe.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecipeRequest {
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
    pub tags: Vec<String>,
    pub ingredients: Vec<IngredientAmount>,
    /// Base64 data URL with the recipe image.
    pub image: String,
}

impl CreateRecipeRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_recipe_fields(
            &self.name,
            &self.text,
            self.cooking_time,
            &self.tags,
            &self.ingredients,
        )?;
        if self.image.trim().is_empty() {
            return Err(AppError::Validation("Image is required".to_string()));
        }
        Ok(())
    }
}

/// Request body for updating a recipe. The ingredient list and tag set are
/// replaced wholesale; the image is kept when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRecipeRequest {
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
    pub tags: Vec<String>,
    pub ingredients: Vec<IngredientAmount>,
    #[serde(default)]
    pub image: Option<String>,
}

impl UpdateRecipeRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_recipe_fields(
            &self.name,
            &self.text,
            self.cooking_time,
            &self.tags,
            &self.ingredients,
        )
    }
}

/// Shape checks shared by create and update. Referenced-id existence is
/// verified later against the store.
fn validate_recipe_fields(
    name: &str,
    text: &str,
    cooking_time: i64,
    tags: &[String],
    ingredients: &[IngredientAmount],
) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if text.trim().is_empty() {
        return Err(AppError::Validation("Text is required".to_string()));
    }
    if cooking_time <= 0 {
        return Err(AppError::Validation(
            "Cooking time must be a positive number of minutes".to_string(),
        ));
    }
    if tags.is_empty() {
        return Err(AppError::Validation(
            "At least one tag is required".to_string(),
        ));
    }
    if ingredients.is_empty() {
        return Err(AppError::Validation(
            "At least one ingredient is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for entry in ingredients {
        if entry.amount <= 0 {
            return Err(AppError::Validation(format!(
                "Amount for ingredient {} must be positive",
                entry.id
            )));
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(AppError::Validation(format!(
                "Ingredient {} is listed more than once",
                entry.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateRecipeRequest {
        CreateRecipeRequest {
            name: "Pancakes".to_string(),
            text: "Mix and fry.".to_string(),
            cooking_time: 20,
            tags: vec!["t1".to_string()],
            ingredients: vec![
                IngredientAmount {
                    id: "i1".to_string(),
                    amount: 200,
                },
                IngredientAmount {
                    id: "i2".to_string(),
                    amount: 2,
                },
            ],
            image: "data:image/png;base64,aGk=".to_string(),
        }
    }

    #[test]
    fn test_valid_payload_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_duplicate_ingredient_ids_rejected() {
        let mut req = request();
        req.ingredients.push(IngredientAmount {
            id: "i1".to_string(),
            amount: 50,
        });
        let err = req.validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.message().contains("more than once"));
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        let mut req = request();
        req.ingredients[0].amount = 0;
        assert!(req.validate().is_err());

        let mut req = request();
        req.cooking_time = 0;
        assert!(req.validate().is_err());

        let mut req = request();
        req.cooking_time = -5;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_empty_collections_rejected() {
        let mut req = request();
        req.tags.clear();
        assert!(req.validate().is_err());

        let mut req = request();
        req.ingredients.clear();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_may_omit_image() {
        let req = UpdateRecipeRequest {
            name: "Pancakes".to_string(),
            text: "Mix and fry.".to_string(),
            cooking_time: 20,
            tags: vec!["t1".to_string()],
            ingredients: vec![IngredientAmount {
                id: "i1".to_string(),
                amount: 200,
            }],
            image: None,
        };
        assert!(req.validate().is_ok());
    }
}
