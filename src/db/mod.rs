/// Database connection management
///
/// Opens the SQLite pool the whole application shares and makes sure the
/// schema and the default rows (license 1, the default language) exist.

pub mod schema;

use crate::config::DatabaseConfig;
use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Owner of the connection pool
#[derive(Debug, Clone)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    /// Connect according to the configuration and initialise the schema
    pub async fn connect(config: &DatabaseConfig, default_language: &str) -> Result<Self> {
        let pool = if config.path == ":memory:" {
            tracing::info!("🗄️ Opening in-memory database");
            // Every connection to :memory: is its own database, so keep exactly one
            // and never let the pool retire it
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true))
                .await?
        } else {
            if let Some(parent) = Path::new(&config.path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        anyhow::anyhow!("Failed to create database directory '{}': {}", parent.display(), e)
                    })?;
                }
            }
            tracing::info!("🗄️ Opening database: {}", config.path);
            let options = SqliteConnectOptions::new()
                .filename(&config.path)
                .create_if_missing(true)
                .foreign_keys(true);
            SqlitePool::connect_with(options).await?
        };

        schema::init_schema(&pool).await?;
        schema::seed_defaults(&pool, default_language).await?;

        tracing::info!("✅ Database ready");
        Ok(Self { pool })
    }

    /// Shared connection pool
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_pool_keeps_its_only_connection() {
        let config = DatabaseConfig { path: ":memory:".to_string() };
        let db = DatabaseManager::connect(&config, "en").await.unwrap();
        let pool = db.pool();

        let options = pool.options();
        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_min_connections(), 1);
        assert!(options.get_idle_timeout().is_none());
        assert!(options.get_max_lifetime().is_none());

        sqlx::query("INSERT INTO exercise_categories (name) VALUES ('Arms')")
            .execute(&pool)
            .await
            .unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exercise_categories")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
