//! Configuration module for the RecipeBox backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Directory for stored recipe images, served under /media
    pub media_dir: PathBuf,
    /// Optional directory with tags.json / ingredients.json seed data,
    /// imported at startup when set
    pub seed_dir: Option<PathBuf>,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Default page size for paginated listings
    pub page_size: u32,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("RECIPEBOX_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let media_dir = env::var("RECIPEBOX_MEDIA_DIR")
            .unwrap_or_else(|_| "./data/media".to_string())
            .into();

        let seed_dir = env::var("RECIPEBOX_SEED_DIR").ok().map(PathBuf::from);

        let bind_addr = env::var("RECIPEBOX_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid RECIPEBOX_BIND_ADDR format");

        let page_size = env::var("RECIPEBOX_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(6);

        let log_level = env::var("RECIPEBOX_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            db_path,
            media_dir,
            seed_dir,
            bind_addr,
            page_size,
            log_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("RECIPEBOX_DB_PATH");
        env::remove_var("RECIPEBOX_MEDIA_DIR");
        env::remove_var("RECIPEBOX_SEED_DIR");
        env::remove_var("RECIPEBOX_BIND_ADDR");
        env::remove_var("RECIPEBOX_PAGE_SIZE");
        env::remove_var("RECIPEBOX_LOG_LEVEL");

        let config = Config::from_env();

        assert_eq!(config.db_path, PathBuf::from("./data/app.sqlite"));
        assert_eq!(config.media_dir, PathBuf::from("./data/media"));
        assert!(config.seed_dir.is_none());
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.page_size, 6);
        assert_eq!(config.log_level, "info");
    }
}
