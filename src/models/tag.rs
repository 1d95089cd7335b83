//! Tag model and request body, plus color/slug validation helpers.

use serde::{Deserialize, Serialize};

/// A recipe tag. Color is stored as a hex value after resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// Request body for creating a new tag.
///
/// `color` accepts `#RGB`/`#RRGGBB` hex or a CSS basic color name.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// CSS basic color keywords, plus orange (CSS 2.1 addition).
const NAMED_COLORS: &[(&str, &str)] = &[
    ("aqua", "#00ffff"),
    ("black", "#000000"),
    ("blue", "#0000ff"),
    ("fuchsia", "#ff00ff"),
    ("gray", "#808080"),
    ("green", "#008000"),
    ("lime", "#00ff00"),
    ("maroon", "#800000"),
    ("navy", "#000080"),
    ("olive", "#808000"),
    ("orange", "#ffa500"),
    ("purple", "#800080"),
    ("red", "#ff0000"),
    ("silver", "#c0c0c0"),
    ("teal", "#008080"),
    ("white", "#ffffff"),
    ("yellow", "#ffff00"),
];

/// Resolve a color input to its hex form: hex passes through, known names
/// map to their hex value, anything else is rejected.
pub fn resolve_color(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if let Some(digits) = trimmed.strip_prefix('#') {
        let valid_len = digits.len() == 3 || digits.len() == 6;
        if valid_len && digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Some(trimmed.to_lowercase());
        }
        return None;
    }

    let lower = trimmed.to_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, hex)| (*hex).to_string())
}

/// Slug charset check: letters, digits, hyphens and underscores.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_colors_pass_through() {
        assert_eq!(resolve_color("#E26C2D").as_deref(), Some("#e26c2d"));
        assert_eq!(resolve_color("#fff").as_deref(), Some("#fff"));
    }

    #[test]
    fn test_named_colors_resolve_to_hex() {
        assert_eq!(resolve_color("red").as_deref(), Some("#ff0000"));
        assert_eq!(resolve_color("Teal").as_deref(), Some("#008080"));
    }

    #[test]
    fn test_invalid_colors_rejected() {
        assert!(resolve_color("#12345").is_none());
        assert!(resolve_color("#gggggg").is_none());
        assert!(resolve_color("notacolor").is_none());
        assert!(resolve_color("").is_none());
    }

    #[test]
    fn test_slug_charset() {
        assert!(is_valid_slug("breakfast"));
        assert!(is_valid_slug("low-carb_2"));
        assert!(!is_valid_slug("has space"));
        assert!(!is_valid_slug("кириллица"));
        assert!(!is_valid_slug(""));
    }
}
