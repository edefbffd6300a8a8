/// Configuration management for the exercise catalog
///
/// Handles server configuration, the database location, media URLs and
/// the thumbnail aliases used when rendering image URLs.

use crate::thumbnails::ThumbnailAlias;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Uploaded media and thumbnails
    pub media: MediaConfig,
    /// Language used when a request names none
    pub default_language: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
    /// Where the history pages send anonymous visitors
    pub login_url: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file, created on first start.
    /// The special value ":memory:" keeps everything in memory.
    pub path: String,
}

/// Media configuration for images, videos and their thumbnails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// URL prefix under which uploaded files are served (e.g. "/media/")
    pub media_url: String,
    /// Named thumbnail presets, in the order they are reported
    pub thumbnail_aliases: Vec<ThumbnailAlias>,
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("CATALOG_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("CATALOG_PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .unwrap_or(8000),
                login_url: std::env::var("CATALOG_LOGIN_URL")
                    .unwrap_or_else(|_| "/user/login".to_string()),
            },
            database: DatabaseConfig {
                path: std::env::var("CATALOG_DATABASE")
                    .unwrap_or_else(|_| "data/catalog.db".to_string()),
            },
            media: MediaConfig {
                media_url: std::env::var("CATALOG_MEDIA_URL")
                    .unwrap_or_else(|_| "/media/".to_string()),
                thumbnail_aliases: ThumbnailAlias::defaults(),
            },
            default_language: std::env::var("CATALOG_DEFAULT_LANGUAGE")
                .unwrap_or_else(|_| "en".to_string()),
        }
    }
}

impl Config {
    /// Configuration for tests and throwaway instances: in-memory database,
    /// ephemeral port, no environment lookups.
    pub fn in_memory() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                login_url: "/user/login".to_string(),
            },
            database: DatabaseConfig {
                path: ":memory:".to_string(),
            },
            media: MediaConfig {
                media_url: "/media/".to_string(),
                thumbnail_aliases: ThumbnailAlias::defaults(),
            },
            default_language: "en".to_string(),
        }
    }
}
