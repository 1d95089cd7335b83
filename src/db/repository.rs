//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity. Uniqueness
//! and relationship rules are enforced by the schema, so concurrent writers
//! cannot sneak past the application-level checks.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::errors::AppError;
use crate::models::{
    CreateRecipeRequest, CreateUserRequest, Ingredient, IngredientAmount, RecipeIngredientView,
    RecipeRecord, RecipeSummary, RecipeView, Tag, UpdateRecipeRequest, User, UserView,
};

/// Filter parameters for recipe listings. Empty fields do not constrain.
#[derive(Debug, Default, Clone)]
pub struct RecipeFilter {
    pub author_id: Option<String>,
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<String>,
    pub in_cart_of: Option<String>,
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== USER OPERATIONS ====================

    /// Create a new user account. The password arrives pre-hashed.
    pub async fn create_user(
        &self,
        request: &CreateUserRequest,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO users (id, email, username, first_name, last_name, password_hash, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(&request.email)
        .bind(&request.username)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(password_hash)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            constraint_error(
                e,
                "A user with this email or username already exists",
                "Invalid user data",
            )
        })?;

        Ok(User {
            id,
            email: request.email.clone(),
            username: request.username.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            password_hash: password_hash.to_string(),
            created_at: now,
        })
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, email, username, first_name, last_name, password_hash, created_at FROM users WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Get a user by email. Lookup is case-insensitive per the schema collation.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, email, username, first_name, last_name, password_hash, created_at FROM users WHERE email = ?"
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// List users, optionally filtered by a username/email substring.
    pub async fn list_users(
        &self,
        search: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<User>, i64), AppError> {
        let (where_sql, pattern) = match search {
            Some(term) if !term.is_empty() => (
                " WHERE username LIKE ? ESCAPE '\\' OR email LIKE ? ESCAPE '\\'",
                Some(format!("%{}%", escape_like(term))),
            ),
            _ => ("", None),
        };

        let count_sql = format!("SELECT COUNT(*) AS cnt FROM users{}", where_sql);
        let mut count_query = sqlx::query(&count_sql);
        if let Some(p) = &pattern {
            count_query = count_query.bind(p).bind(p);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?.get("cnt");

        let list_sql = format!(
            "SELECT id, email, username, first_name, last_name, password_hash, created_at FROM users{} ORDER BY username COLLATE NOCASE LIMIT ? OFFSET ?",
            where_sql
        );
        let mut list_query = sqlx::query(&list_sql);
        if let Some(p) = &pattern {
            list_query = list_query.bind(p).bind(p);
        }
        let rows = list_query
            .bind(limit as i64)
            .bind(page_offset(page, limit))
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.iter().map(user_from_row).collect(), total))
    }

    /// Replace a user's password hash.
    pub async fn update_password(
        &self,
        user_id: &str,
        password_hash: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    // ==================== TOKEN OPERATIONS ====================

    /// Store an auth token for a user.
    pub async fn insert_token(&self, token: &str, user_id: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("INSERT INTO auth_tokens (token, user_id, created_at) VALUES (?, ?, ?)")
            .bind(token)
            .bind(user_id)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Resolve an auth token to its user.
    pub async fn get_user_by_token(&self, token: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            r#"SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.password_hash, u.created_at
               FROM auth_tokens t JOIN users u ON u.id = t.user_id
               WHERE t.token = ?"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Invalidate an auth token. Deleting an already-gone token is a no-op.
    pub async fn delete_token(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM auth_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ==================== TAG OPERATIONS ====================

    /// List all tags.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, AppError> {
        let rows = sqlx::query("SELECT id, name, color, slug FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(tag_from_row).collect())
    }

    /// Get a tag by ID.
    pub async fn get_tag(&self, id: &str) -> Result<Option<Tag>, AppError> {
        let row = sqlx::query("SELECT id, name, color, slug FROM tags WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(tag_from_row))
    }

    /// Get a tag by slug.
    pub async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, AppError> {
        let row = sqlx::query("SELECT id, name, color, slug FROM tags WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(tag_from_row))
    }

    /// Create a new tag. The color is already resolved to a hex literal.
    pub async fn create_tag(&self, name: &str, color: &str, slug: &str) -> Result<Tag, AppError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO tags (id, name, color, slug) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(color)
            .bind(slug)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                constraint_error(
                    e,
                    &format!("Tag slug '{}' is already in use", slug),
                    "Invalid tag data",
                )
            })?;

        Ok(Tag {
            id,
            name: name.to_string(),
            color: color.to_string(),
            slug: slug.to_string(),
        })
    }

    // ==================== INGREDIENT OPERATIONS ====================

    /// List ingredients, optionally restricted to a case-insensitive name
    /// prefix. The prefix is matched against a lowercased copy of the name
    /// maintained at write time, so folding covers more than ASCII.
    pub async fn list_ingredients(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>, AppError> {
        let rows = match prefix {
            Some(term) if !term.is_empty() => {
                sqlx::query(
                    "SELECT id, name, measurement_unit FROM ingredients WHERE name_search LIKE ? ESCAPE '\\' ORDER BY name_search, name"
                )
                .bind(format!("{}%", escape_like(&term.to_lowercase())))
                .fetch_all(&self.pool)
                .await?
            }
            _ => {
                sqlx::query(
                    "SELECT id, name, measurement_unit FROM ingredients ORDER BY name_search, name",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(ingredient_from_row).collect())
    }

    /// Get an ingredient by ID.
    pub async fn get_ingredient(&self, id: &str) -> Result<Option<Ingredient>, AppError> {
        let row = sqlx::query("SELECT id, name, measurement_unit FROM ingredients WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(ingredient_from_row))
    }

    /// Find an ingredient by its (name, unit) pair.
    pub async fn find_ingredient(
        &self,
        name: &str,
        measurement_unit: &str,
    ) -> Result<Option<Ingredient>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, measurement_unit FROM ingredients WHERE name = ? AND measurement_unit = ?",
        )
        .bind(name)
        .bind(measurement_unit)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(ingredient_from_row))
    }

    /// Create a new catalog ingredient.
    pub async fn create_ingredient(
        &self,
        name: &str,
        measurement_unit: &str,
    ) -> Result<Ingredient, AppError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO ingredients (id, name, name_search, measurement_unit) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(name.to_lowercase())
        .bind(measurement_unit)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            constraint_error(
                e,
                &format!(
                    "Ingredient '{}' ({}) already exists",
                    name, measurement_unit
                ),
                "Invalid ingredient data",
            )
        })?;

        Ok(Ingredient {
            id,
            name: name.to_string(),
            measurement_unit: measurement_unit.to_string(),
        })
    }

    // ==================== RECIPE OPERATIONS ====================

    /// Create a recipe with its tag set and ingredient lines. The whole write
    /// happens in one transaction; a bad tag or ingredient id aborts it.
    pub async fn create_recipe(
        &self,
        author_id: &str,
        request: &CreateRecipeRequest,
        image_path: &str,
    ) -> Result<String, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO recipes (id, author_id, name, image, text, cooking_time, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(author_id)
        .bind(&request.name)
        .bind(image_path)
        .bind(&request.text)
        .bind(request.cooking_time)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        attach_tags(&mut tx, &id, &request.tags).await?;
        attach_ingredients(&mut tx, &id, &request.ingredients).await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Update a recipe. The tag set and ingredient list are replaced wholesale;
    /// the stored image is kept when `image_path` is None.
    pub async fn update_recipe(
        &self,
        id: &str,
        request: &UpdateRecipeRequest,
        image_path: Option<&str>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = if let Some(image) = image_path {
            sqlx::query("UPDATE recipes SET name = ?, text = ?, cooking_time = ?, image = ? WHERE id = ?")
                .bind(&request.name)
                .bind(&request.text)
                .bind(request.cooking_time)
                .bind(image)
                .bind(id)
                .execute(&mut *tx)
                .await?
        } else {
            sqlx::query("UPDATE recipes SET name = ?, text = ?, cooking_time = ? WHERE id = ?")
                .bind(&request.name)
                .bind(&request.text)
                .bind(request.cooking_time)
                .bind(id)
                .execute(&mut *tx)
                .await?
        };

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Recipe {} not found", id)));
        }

        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        attach_tags(&mut tx, id, &request.tags).await?;
        attach_ingredients(&mut tx, id, &request.ingredients).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Delete a recipe. Ledger rows referencing it go with it.
    pub async fn delete_recipe(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Recipe {} not found", id)));
        }
        Ok(())
    }

    /// Whether the author already has a recipe with this exact name.
    pub async fn author_has_recipe(&self, author_id: &str, name: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 AS x FROM recipes WHERE author_id = ? AND name = ?")
            .bind(author_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// Get a recipe row by ID.
    pub async fn get_recipe_record(&self, id: &str) -> Result<Option<RecipeRecord>, AppError> {
        let row = sqlx::query(
            "SELECT id, author_id, name, image, text, cooking_time, created_at FROM recipes WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(recipe_from_row))
    }

    /// List recipe rows matching the filter, newest first, with the total count.
    pub async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<RecipeRecord>, i64), AppError> {
        let mut conditions: Vec<String> = Vec::new();
        let mut binds: Vec<String> = Vec::new();

        if let Some(author_id) = &filter.author_id {
            conditions.push("author_id = ?".to_string());
            binds.push(author_id.clone());
        }
        if !filter.tag_slugs.is_empty() {
            let placeholders = vec!["?"; filter.tag_slugs.len()].join(", ");
            conditions.push(format!(
                "id IN (SELECT rt.recipe_id FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id WHERE t.slug IN ({}))",
                placeholders
            ));
            binds.extend(filter.tag_slugs.iter().cloned());
        }
        if let Some(user_id) = &filter.favorited_by {
            conditions.push("id IN (SELECT recipe_id FROM favorites WHERE user_id = ?)".to_string());
            binds.push(user_id.clone());
        }
        if let Some(user_id) = &filter.in_cart_of {
            conditions
                .push("id IN (SELECT recipe_id FROM shopping_cart WHERE user_id = ?)".to_string());
            binds.push(user_id.clone());
        }

        let where_sql = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) AS cnt FROM recipes{}", where_sql);
        let mut count_query = sqlx::query(&count_sql);
        for value in &binds {
            count_query = count_query.bind(value);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?.get("cnt");

        let list_sql = format!(
            "SELECT id, author_id, name, image, text, cooking_time, created_at FROM recipes{} ORDER BY created_at DESC, id LIMIT ? OFFSET ?",
            where_sql
        );
        let mut list_query = sqlx::query(&list_sql);
        for value in &binds {
            list_query = list_query.bind(value);
        }
        let rows = list_query
            .bind(limit as i64)
            .bind(page_offset(page, limit))
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.iter().map(recipe_from_row).collect(), total))
    }

    /// Tags attached to a recipe.
    pub async fn get_recipe_tags(&self, recipe_id: &str) -> Result<Vec<Tag>, AppError> {
        let rows = sqlx::query(
            r#"SELECT t.id, t.name, t.color, t.slug
               FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id
               WHERE rt.recipe_id = ? ORDER BY t.name"#,
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(tag_from_row).collect())
    }

    /// Ingredient lines of a recipe, in the order the author listed them.
    pub async fn get_recipe_ingredients(
        &self,
        recipe_id: &str,
    ) -> Result<Vec<RecipeIngredientView>, AppError> {
        let rows = sqlx::query(
            r#"SELECT i.id, i.name, i.measurement_unit, ri.amount
               FROM recipe_ingredients ri JOIN ingredients i ON i.id = ri.ingredient_id
               WHERE ri.recipe_id = ? ORDER BY ri.position"#,
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| RecipeIngredientView {
                id: row.get("id"),
                name: row.get("name"),
                measurement_unit: row.get("measurement_unit"),
                amount: row.get("amount"),
            })
            .collect())
    }

    /// Assemble the full recipe view as seen by `requester` (None = anonymous).
    pub async fn build_recipe_view(
        &self,
        record: &RecipeRecord,
        requester: Option<&str>,
    ) -> Result<RecipeView, AppError> {
        let author = self.get_user(&record.author_id).await?.ok_or_else(|| {
            AppError::Internal(format!(
                "Author {} missing for recipe {}",
                record.author_id, record.id
            ))
        })?;
        let tags = self.get_recipe_tags(&record.id).await?;
        let ingredients = self.get_recipe_ingredients(&record.id).await?;

        let (is_favorited, is_in_shopping_cart, follows_author) = match requester {
            Some(user_id) => (
                self.is_favorited(user_id, &record.id).await?,
                self.is_in_cart(user_id, &record.id).await?,
                self.is_subscribed(user_id, &record.author_id).await?,
            ),
            None => (false, false, false),
        };

        Ok(RecipeView {
            id: record.id.clone(),
            tags,
            author: UserView::new(&author, follows_author),
            ingredients,
            is_favorited,
            is_in_shopping_cart,
            name: record.name.clone(),
            image: record.image_url(),
            text: record.text.clone(),
            cooking_time: record.cooking_time,
        })
    }

    /// Short projections of an author's recipes, newest first.
    pub async fn author_recipes(
        &self,
        author_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<RecipeSummary>, AppError> {
        let rows = match limit {
            Some(n) => {
                sqlx::query(
                    "SELECT id, author_id, name, image, text, cooking_time, created_at FROM recipes WHERE author_id = ? ORDER BY created_at DESC, id LIMIT ?"
                )
                .bind(author_id)
                .bind(n as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, author_id, name, image, text, cooking_time, created_at FROM recipes WHERE author_id = ? ORDER BY created_at DESC, id"
                )
                .bind(author_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows
            .iter()
            .map(|row| recipe_from_row(row).summary())
            .collect())
    }

    /// Number of recipes an author has published.
    pub async fn count_author_recipes(&self, author_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM recipes WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("cnt"))
    }

    // ==================== FAVORITES ====================

    /// Add a recipe to a user's favorites.
    pub async fn add_favorite(&self, user_id: &str, recipe_id: &str) -> Result<(), AppError> {
        insert_ledger_row(
            &self.pool,
            "INSERT INTO favorites (user_id, recipe_id, created_at) VALUES (?, ?, ?)",
            user_id,
            recipe_id,
            "Recipe is already in favorites",
        )
        .await
    }

    /// Remove a recipe from a user's favorites.
    pub async fn remove_favorite(&self, user_id: &str, recipe_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND recipe_id = ?")
            .bind(user_id)
            .bind(recipe_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(
                "Recipe is not in favorites".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a user has favorited a recipe.
    pub async fn is_favorited(&self, user_id: &str, recipe_id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 AS x FROM favorites WHERE user_id = ? AND recipe_id = ?")
            .bind(user_id)
            .bind(recipe_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    // ==================== SHOPPING CART ====================

    /// Add a recipe to a user's shopping cart.
    pub async fn add_to_cart(&self, user_id: &str, recipe_id: &str) -> Result<(), AppError> {
        insert_ledger_row(
            &self.pool,
            "INSERT INTO shopping_cart (user_id, recipe_id, created_at) VALUES (?, ?, ?)",
            user_id,
            recipe_id,
            "Recipe is already in the shopping cart",
        )
        .await
    }

    /// Remove a recipe from a user's shopping cart.
    pub async fn remove_from_cart(&self, user_id: &str, recipe_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM shopping_cart WHERE user_id = ? AND recipe_id = ?")
            .bind(user_id)
            .bind(recipe_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(
                "Recipe is not in the shopping cart".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a recipe sits in a user's shopping cart.
    pub async fn is_in_cart(&self, user_id: &str, recipe_id: &str) -> Result<bool, AppError> {
        let row =
            sqlx::query("SELECT 1 AS x FROM shopping_cart WHERE user_id = ? AND recipe_id = ?")
                .bind(user_id)
                .bind(recipe_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    /// Raw (name, unit, amount) rows behind a user's shopping list, one per
    /// ingredient line of every recipe in the cart.
    pub async fn cart_ingredient_rows(
        &self,
        user_id: &str,
    ) -> Result<Vec<(String, String, i64)>, AppError> {
        let rows = sqlx::query(
            r#"SELECT i.name AS name, i.measurement_unit AS unit, ri.amount AS amount
               FROM shopping_cart sc
               JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
               JOIN ingredients i ON i.id = ri.ingredient_id
               WHERE sc.user_id = ?"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get("name"), row.get("unit"), row.get("amount")))
            .collect())
    }

    // ==================== SUBSCRIPTIONS ====================

    /// Subscribe a user to an author.
    pub async fn subscribe(&self, follower_id: &str, author_id: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO subscriptions (follower_id, author_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(follower_id)
        .bind(author_id)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            constraint_error(
                e,
                "Already subscribed to this author",
                "Cannot subscribe to yourself",
            )
        })?;
        Ok(())
    }

    /// Unsubscribe a user from an author.
    pub async fn unsubscribe(&self, follower_id: &str, author_id: &str) -> Result<(), AppError> {
        let result =
            sqlx::query("DELETE FROM subscriptions WHERE follower_id = ? AND author_id = ?")
                .bind(follower_id)
                .bind(author_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(
                "Not subscribed to this author".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `follower_id` is subscribed to `author_id`.
    pub async fn is_subscribed(&self, follower_id: &str, author_id: &str) -> Result<bool, AppError> {
        let row =
            sqlx::query("SELECT 1 AS x FROM subscriptions WHERE follower_id = ? AND author_id = ?")
                .bind(follower_id)
                .bind(author_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    /// Authors a user is subscribed to, alphabetical by username.
    pub async fn list_subscriptions(
        &self,
        follower_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<User>, i64), AppError> {
        let total: i64 =
            sqlx::query("SELECT COUNT(*) AS cnt FROM subscriptions WHERE follower_id = ?")
                .bind(follower_id)
                .fetch_one(&self.pool)
                .await?
                .get("cnt");

        let rows = sqlx::query(
            r#"SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.password_hash, u.created_at
               FROM subscriptions s JOIN users u ON u.id = s.author_id
               WHERE s.follower_id = ?
               ORDER BY u.username COLLATE NOCASE LIMIT ? OFFSET ?"#,
        )
        .bind(follower_id)
        .bind(limit as i64)
        .bind(page_offset(page, limit))
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.iter().map(user_from_row).collect(), total))
    }
}

/// Verify every tag id exists and link the set to the recipe. Duplicate ids
/// in the payload collapse to one link.
async fn attach_tags(
    tx: &mut Transaction<'_, Sqlite>,
    recipe_id: &str,
    tag_ids: &[String],
) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for tag_id in tag_ids {
        if !seen.insert(tag_id.as_str()) {
            continue;
        }
        let exists = sqlx::query("SELECT 1 AS x FROM tags WHERE id = ?")
            .bind(tag_id)
            .fetch_optional(&mut **tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::Validation(format!(
                "Tag {} does not exist",
                tag_id
            )));
        }
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Verify every ingredient id exists and insert the amount lines, keeping
/// the payload order in the position column.
async fn attach_ingredients(
    tx: &mut Transaction<'_, Sqlite>,
    recipe_id: &str,
    ingredients: &[IngredientAmount],
) -> Result<(), AppError> {
    for (position, entry) in ingredients.iter().enumerate() {
        let exists = sqlx::query("SELECT 1 AS x FROM ingredients WHERE id = ?")
            .bind(&entry.id)
            .fetch_optional(&mut **tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::Validation(format!(
                "Ingredient {} does not exist",
                entry.id
            )));
        }
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount, position) VALUES (?, ?, ?, ?)"
        )
        .bind(recipe_id)
        .bind(&entry.id)
        .bind(entry.amount)
        .bind(position as i64)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Insert one (user, recipe) ledger row, mapping a duplicate to Conflict.
async fn insert_ledger_row(
    pool: &SqlitePool,
    sql: &str,
    user_id: &str,
    recipe_id: &str,
    conflict_msg: &str,
) -> Result<(), AppError> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(sql)
        .bind(user_id)
        .bind(recipe_id)
        .bind(&now)
        .execute(pool)
        .await
        .map_err(|e| constraint_error(e, conflict_msg, "Invalid operation"))?;
    Ok(())
}

/// Map schema constraint violations onto the domain error taxonomy.
fn constraint_error(err: sqlx::Error, conflict_msg: &str, invalid_msg: &str) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AppError::Conflict(conflict_msg.to_string());
        }
        if db.is_check_violation() {
            return AppError::InvalidOperation(invalid_msg.to_string());
        }
    }
    err.into()
}

/// Escape LIKE wildcards so user input matches literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn page_offset(page: u32, limit: u32) -> i64 {
    (page.saturating_sub(1) as i64) * limit as i64
}

// Helper functions for row conversion

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    }
}

fn tag_from_row(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        color: row.get("color"),
        slug: row.get("slug"),
    }
}

fn ingredient_from_row(row: &sqlx::sqlite::SqliteRow) -> Ingredient {
    Ingredient {
        id: row.get("id"),
        name: row.get("name"),
        measurement_unit: row.get("measurement_unit"),
    }
}

fn recipe_from_row(row: &sqlx::sqlite::SqliteRow) -> RecipeRecord {
    RecipeRecord {
        id: row.get("id"),
        author_id: row.get("author_id"),
        name: row.get("name"),
        image: row.get("image"),
        text: row.get("text"),
        cooking_time: row.get("cooking_time"),
        created_at: row.get("created_at"),
    }
}
