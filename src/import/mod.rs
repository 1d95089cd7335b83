//! Startup import of reference data from JSON seed files.
//!
//! Reads `tags.json`, `ingredients.json` and `recipes.json` from the
//! configured seed directory. Rows that already exist are skipped, so running
//! the import on every start is safe.

use std::path::Path;

use serde::Deserialize;
use tokio::fs;
use tracing::{info, warn};

use crate::auth::hash_password;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    is_valid_slug, resolve_color, CreateRecipeRequest, CreateUserRequest, IngredientAmount, User,
};
use crate::storage;

#[derive(Debug, Deserialize)]
struct SeedIngredient {
    name: String,
    measurement_unit: String,
}

#[derive(Debug, Deserialize)]
struct SeedTag {
    name: String,
    color: String,
    slug: String,
}

/// `recipes.json`: demo recipes published under a single author account
/// carried in the file itself.
#[derive(Debug, Deserialize)]
struct SeedRecipeFile {
    author: CreateUserRequest,
    recipes: Vec<SeedRecipe>,
}

#[derive(Debug, Deserialize)]
struct SeedRecipe {
    name: String,
    text: String,
    cooking_time: i64,
    /// Either a base64 data URL or a path relative to the seed directory.
    image: String,
    /// Tag slugs from `tags.json`.
    tags: Vec<String>,
    ingredients: Vec<SeedRecipeIngredient>,
}

#[derive(Debug, Deserialize)]
struct SeedRecipeIngredient {
    name: String,
    measurement_unit: String,
    amount: i64,
}

/// Import seed files from `seed_dir`. Missing files are skipped quietly;
/// malformed files abort the import. Recipes come last because they
/// reference the tag and ingredient catalogs.
pub async fn import_seed_data(
    repository: &Repository,
    seed_dir: &Path,
    media_dir: &Path,
) -> Result<(), AppError> {
    import_tags(repository, &seed_dir.join("tags.json")).await?;
    import_ingredients(repository, &seed_dir.join("ingredients.json")).await?;
    import_recipes(repository, seed_dir, media_dir).await?;
    Ok(())
}

async fn import_tags(repository: &Repository, path: &Path) -> Result<(), AppError> {
    let Some(raw) = read_seed_file(path).await? else {
        return Ok(());
    };
    let entries: Vec<SeedTag> = serde_json::from_str(&raw)?;

    let mut created = 0u32;
    let mut skipped = 0u32;
    for entry in entries {
        if repository.find_tag_by_slug(&entry.slug).await?.is_some() {
            skipped += 1;
            continue;
        }
        if !is_valid_slug(&entry.slug) {
            warn!(slug = %entry.slug, "Skipping seed tag with invalid slug");
            continue;
        }
        let Some(color) = resolve_color(&entry.color) else {
            warn!(tag = %entry.name, color = %entry.color, "Skipping seed tag with unknown color");
            continue;
        };
        repository.create_tag(&entry.name, &color, &entry.slug).await?;
        created += 1;
    }

    info!(created, skipped, "Imported tags");
    Ok(())
}

async fn import_ingredients(repository: &Repository, path: &Path) -> Result<(), AppError> {
    let Some(raw) = read_seed_file(path).await? else {
        return Ok(());
    };
    let entries: Vec<SeedIngredient> = serde_json::from_str(&raw)?;

    let mut created = 0u32;
    let mut skipped = 0u32;
    for entry in entries {
        if repository
            .find_ingredient(&entry.name, &entry.measurement_unit)
            .await?
            .is_some()
        {
            skipped += 1;
            continue;
        }
        repository
            .create_ingredient(&entry.name, &entry.measurement_unit)
            .await?;
        created += 1;
    }

    info!(created, skipped, "Imported ingredients");
    Ok(())
}

/// Import demo recipes. A recipe the author already has (by name) is
/// skipped; one naming an unknown tag or ingredient is dropped with a
/// warning rather than aborting the rest of the file.
async fn import_recipes(
    repository: &Repository,
    seed_dir: &Path,
    media_dir: &Path,
) -> Result<(), AppError> {
    let Some(raw) = read_seed_file(&seed_dir.join("recipes.json")).await? else {
        return Ok(());
    };
    let seed: SeedRecipeFile = serde_json::from_str(&raw)?;
    let author = seed_author(repository, &seed.author).await?;

    let mut created = 0u32;
    let mut skipped = 0u32;
    for entry in seed.recipes {
        if repository.author_has_recipe(&author.id, &entry.name).await? {
            skipped += 1;
            continue;
        }
        let Some(request) = resolve_references(repository, &entry).await? else {
            continue;
        };
        let image_path = store_seed_image(media_dir, seed_dir, &entry.image).await?;
        if let Err(err) = repository
            .create_recipe(&author.id, &request, &image_path)
            .await
        {
            storage::remove_image(media_dir, &image_path).await;
            return Err(err);
        }
        created += 1;
    }

    info!(created, skipped, "Imported recipes");
    Ok(())
}

/// Reuse the seed author when a user with that email already exists.
async fn seed_author(
    repository: &Repository,
    author: &CreateUserRequest,
) -> Result<User, AppError> {
    if let Some(user) = repository.get_user_by_email(&author.email).await? {
        return Ok(user);
    }
    let password_hash = hash_password(&author.password)?;
    repository.create_user(author, &password_hash).await
}

/// Map seed tag slugs and (name, unit) ingredient pairs onto stored ids.
async fn resolve_references(
    repository: &Repository,
    entry: &SeedRecipe,
) -> Result<Option<CreateRecipeRequest>, AppError> {
    let mut tags = Vec::with_capacity(entry.tags.len());
    for slug in &entry.tags {
        match repository.find_tag_by_slug(slug).await? {
            Some(tag) => tags.push(tag.id),
            None => {
                warn!(recipe = %entry.name, tag = %slug, "Skipping seed recipe with unknown tag");
                return Ok(None);
            }
        }
    }

    let mut ingredients = Vec::with_capacity(entry.ingredients.len());
    for line in &entry.ingredients {
        match repository
            .find_ingredient(&line.name, &line.measurement_unit)
            .await?
        {
            Some(ingredient) => ingredients.push(IngredientAmount {
                id: ingredient.id,
                amount: line.amount,
            }),
            None => {
                warn!(recipe = %entry.name, ingredient = %line.name, "Skipping seed recipe with unknown ingredient");
                return Ok(None);
            }
        }
    }

    Ok(Some(CreateRecipeRequest {
        name: entry.name.clone(),
        text: entry.text.clone(),
        cooking_time: entry.cooking_time,
        tags,
        ingredients,
        image: entry.image.clone(),
    }))
}

/// Store a seed image, inline or from a file next to the seed data.
async fn store_seed_image(
    media_dir: &Path,
    seed_dir: &Path,
    image: &str,
) -> Result<String, AppError> {
    if image.starts_with("data:") {
        return storage::store_image(media_dir, image).await;
    }
    storage::store_image_file(media_dir, &seed_dir.join(image)).await
}

/// Read a seed file, treating "not there" as "nothing to import".
async fn read_seed_file(path: &Path) -> Result<Option<String>, AppError> {
    match fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "Seed file not found, skipping");
            Ok(None)
        }
        Err(e) => Err(AppError::Internal(format!(
            "Cannot read seed file {}: {}",
            path.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_database, RecipeFilter};

    const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    async fn seeded_repo(dir: &Path) -> Repository {
        let pool = init_database(&dir.join("test.sqlite")).await.unwrap();
        Repository::new(pool)
    }

    #[tokio::test]
    async fn test_import_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repo(dir.path()).await;

        let seed = dir.path().join("seed");
        let media = dir.path().join("media");
        std::fs::create_dir_all(&seed).unwrap();
        std::fs::write(
            seed.join("tags.json"),
            r#"[{"name": "Breakfast", "color": "orange", "slug": "breakfast"}]"#,
        )
        .unwrap();
        std::fs::write(
            seed.join("ingredients.json"),
            r#"[{"name": "flour", "measurement_unit": "g"}, {"name": "salt", "measurement_unit": "g"}]"#,
        )
        .unwrap();

        import_seed_data(&repo, &seed, &media).await.unwrap();
        import_seed_data(&repo, &seed, &media).await.unwrap();

        let tags = repo.list_tags().await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].color, "#ffa500");

        let ingredients = repo.list_ingredients(None).await.unwrap();
        assert_eq!(ingredients.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_seed_files_are_fine() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repo(dir.path()).await;

        import_seed_data(&repo, &dir.path().join("nowhere"), &dir.path().join("media"))
            .await
            .unwrap();
        assert!(repo.list_tags().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_color_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repo(dir.path()).await;

        let seed = dir.path().join("seed");
        std::fs::create_dir_all(&seed).unwrap();
        std::fs::write(
            seed.join("tags.json"),
            r##"[{"name": "Weird", "color": "not-a-color", "slug": "weird"},
                {"name": "Dinner", "color": "#003366", "slug": "dinner"}]"##,
        )
        .unwrap();

        import_seed_data(&repo, &seed, &dir.path().join("media"))
            .await
            .unwrap();

        let tags = repo.list_tags().await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].slug, "dinner");
    }

    #[tokio::test]
    async fn test_recipe_seed_creates_author_and_recipes() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repo(dir.path()).await;

        let seed = dir.path().join("seed");
        let media = dir.path().join("media");
        std::fs::create_dir_all(seed.join("images")).unwrap();
        std::fs::write(
            seed.join("tags.json"),
            r##"[{"name": "Dinner", "color": "#003366", "slug": "dinner"}]"##,
        )
        .unwrap();
        std::fs::write(
            seed.join("ingredients.json"),
            r#"[{"name": "flour", "measurement_unit": "g"}, {"name": "salt", "measurement_unit": "g"}]"#,
        )
        .unwrap();
        std::fs::write(seed.join("images").join("stew.png"), b"\x89PNG fake body").unwrap();
        std::fs::write(
            seed.join("recipes.json"),
            format!(
                r#"{{
                    "author": {{"email": "demo@example.com", "username": "demo",
                                "first_name": "Demo", "last_name": "Cook",
                                "password": "demo-password"}},
                    "recipes": [
                        {{"name": "Stew", "text": "Simmer slowly.", "cooking_time": 90,
                          "image": "images/stew.png", "tags": ["dinner"],
                          "ingredients": [{{"name": "flour", "measurement_unit": "g", "amount": 100}},
                                          {{"name": "salt", "measurement_unit": "g", "amount": 5}}]}},
                        {{"name": "Bread", "text": "Bake.", "cooking_time": 60,
                          "image": "{}", "tags": ["dinner"],
                          "ingredients": [{{"name": "flour", "measurement_unit": "g", "amount": 500}}]}}
                    ]
                }}"#,
                PNG_DATA_URL
            ),
        )
        .unwrap();

        import_seed_data(&repo, &seed, &media).await.unwrap();
        // A second run reuses the author and skips both recipes
        import_seed_data(&repo, &seed, &media).await.unwrap();

        let author = repo
            .get_user_by_email("demo@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(author.username, "demo");

        let (records, total) = repo
            .list_recipes(&RecipeFilter::default(), 1, 10)
            .await
            .unwrap();
        assert_eq!(total, 2);

        let stew = records.iter().find(|r| r.name == "Stew").unwrap();
        assert_eq!(stew.author_id, author.id);
        assert_eq!(stew.cooking_time, 90);

        let lines = repo.get_recipe_ingredients(&stew.id).await.unwrap();
        assert_eq!(lines.len(), 2);

        let stored = std::fs::read(media.join(&stew.image)).unwrap();
        assert!(stored.starts_with(b"\x89PNG"));
    }

    #[tokio::test]
    async fn test_recipe_seed_with_unknown_references_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repo(dir.path()).await;

        let seed = dir.path().join("seed");
        let media = dir.path().join("media");
        std::fs::create_dir_all(&seed).unwrap();
        std::fs::write(
            seed.join("recipes.json"),
            format!(
                r#"{{
                    "author": {{"email": "demo@example.com", "username": "demo",
                                "first_name": "Demo", "last_name": "Cook",
                                "password": "demo-password"}},
                    "recipes": [
                        {{"name": "Ghost", "text": "Vanish.", "cooking_time": 10,
                          "image": "{}", "tags": ["no-such-slug"],
                          "ingredients": [{{"name": "flour", "measurement_unit": "g", "amount": 1}}]}}
                    ]
                }}"#,
                PNG_DATA_URL
            ),
        )
        .unwrap();

        import_seed_data(&repo, &seed, &media).await.unwrap();

        // The author account exists, the broken recipe does not
        assert!(repo
            .get_user_by_email("demo@example.com")
            .await
            .unwrap()
            .is_some());
        let (_, total) = repo
            .list_recipes(&RecipeFilter::default(), 1, 10)
            .await
            .unwrap();
        assert_eq!(total, 0);
        // Nothing was written to the media tree either
        assert!(!media.exists());
    }
}
