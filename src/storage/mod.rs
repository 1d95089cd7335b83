//! Durable storage for uploaded recipe images.
//!
//! Clients send images inline as base64 data URLs; this module decodes them
//! and writes the bytes beneath the media directory, handing back the
//! relative path stored on the recipe row. The files are served back under
//! `/media/`. Seed data may also pull images from plain files.

use std::io::ErrorKind;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use tokio::fs;
use tracing::warn;

use crate::errors::AppError;

/// Subdirectory of the media root holding recipe images.
const RECIPES_SUBDIR: &str = "recipes";

/// Decode a `data:image/...;base64,...` URL into (extension, bytes).
fn decode_data_url(data_url: &str) -> Result<(&'static str, Vec<u8>), AppError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| AppError::Validation("Image must be a base64 data URL".to_string()))?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| AppError::Validation("Image must be base64-encoded".to_string()))?;

    let extension = match mime {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        other => {
            return Err(AppError::Validation(format!(
                "Unsupported image type '{}'",
                other
            )))
        }
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::Validation(format!("Invalid base64 image data: {}", e)))?;
    if bytes.is_empty() {
        return Err(AppError::Validation("Image data is empty".to_string()));
    }

    Ok((extension, bytes))
}

/// Write image bytes under the media root and return the relative path.
async fn write_image(media_dir: &Path, extension: &str, bytes: &[u8]) -> Result<String, AppError> {
    let dir = media_dir.join(RECIPES_SUBDIR);
    fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::Internal(format!("Cannot create media directory: {}", e)))?;

    let file_name = format!("{}.{}", uuid::Uuid::new_v4(), extension);
    let path = dir.join(&file_name);
    fs::write(&path, bytes)
        .await
        .map_err(|e| AppError::Internal(format!("Cannot write image file: {}", e)))?;

    Ok(format!("{}/{}", RECIPES_SUBDIR, file_name))
}

/// Persist an inline image and return its path relative to the media root.
pub async fn store_image(media_dir: &Path, data_url: &str) -> Result<String, AppError> {
    let (extension, bytes) = decode_data_url(data_url)?;
    write_image(media_dir, extension, &bytes).await
}

/// Copy an image file into the media tree and return its relative path.
/// The file extension decides the stored type.
pub async fn store_image_file(media_dir: &Path, source: &Path) -> Result<String, AppError> {
    let extension = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let extension = match extension.as_deref() {
        Some("png") => "png",
        Some("jpeg") | Some("jpg") => "jpg",
        Some("gif") => "gif",
        Some("webp") => "webp",
        _ => {
            return Err(AppError::Validation(format!(
                "Unsupported image file '{}'",
                source.display()
            )))
        }
    };

    let bytes = fs::read(source).await.map_err(|e| {
        AppError::Internal(format!("Cannot read image file {}: {}", source.display(), e))
    })?;
    if bytes.is_empty() {
        return Err(AppError::Validation(format!(
            "Image file {} is empty",
            source.display()
        )));
    }

    write_image(media_dir, extension, &bytes).await
}

/// Remove a stored image. Callers use this to clean up after a failed write,
/// so a file that is already gone is fine and other failures are only logged.
pub async fn remove_image(media_dir: &Path, relative_path: &str) {
    let path = media_dir.join(relative_path);
    if let Err(e) = fs::remove_file(&path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Could not remove stored image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG
    const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_decode_png_data_url() {
        let (extension, bytes) = decode_data_url(PNG_DATA_URL).unwrap();
        assert_eq!(extension, "png");
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn test_rejects_plain_base64_without_prefix() {
        assert!(decode_data_url("aGVsbG8=").is_err());
    }

    #[test]
    fn test_rejects_unsupported_mime() {
        assert!(decode_data_url("data:text/plain;base64,aGVsbG8=").is_err());
    }

    #[test]
    fn test_rejects_invalid_base64() {
        assert!(decode_data_url("data:image/png;base64,!!!not-base64!!!").is_err());
    }

    #[tokio::test]
    async fn test_store_image_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let relative = store_image(dir.path(), PNG_DATA_URL).await.unwrap();
        assert!(relative.starts_with("recipes/"));
        assert!(relative.ends_with(".png"));

        let written = tokio::fs::read(dir.path().join(&relative)).await.unwrap();
        assert!(written.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[tokio::test]
    async fn test_store_image_file_copies_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.JPG");
        tokio::fs::write(&source, b"jpeg bytes").await.unwrap();

        let relative = store_image_file(dir.path(), &source).await.unwrap();
        assert!(relative.ends_with(".jpg"));

        let written = tokio::fs::read(dir.path().join(&relative)).await.unwrap();
        assert_eq!(written, b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_store_image_file_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        tokio::fs::write(&source, b"not an image").await.unwrap();

        assert!(store_image_file(dir.path(), &source).await.is_err());
    }

    #[tokio::test]
    async fn test_remove_image_deletes_file_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let relative = store_image(dir.path(), PNG_DATA_URL).await.unwrap();
        let full = dir.path().join(&relative);
        assert!(full.exists());

        remove_image(dir.path(), &relative).await;
        assert!(!full.exists());

        // Removing it again is quiet
        remove_image(dir.path(), &relative).await;
    }
}
