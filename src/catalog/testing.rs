//! In-memory catalogs for unit tests

use crate::catalog::input::{AliasInput, ExerciseBaseInput, ExerciseInput};
use crate::catalog::storage::CatalogStorage;
use crate::catalog::types::{Alias, Exercise, Language};
use crate::config::DatabaseConfig;
use crate::db::DatabaseManager;

/// Long enough to pass description validation
pub const DESCRIPTION: &str = "Stand upright, keep the elbows close to the body and curl slowly.";

/// Empty catalog with only the default language "en"
pub async fn storage() -> CatalogStorage {
    let config = DatabaseConfig {
        path: ":memory:".to_string(),
    };
    let db = DatabaseManager::connect(&config, "en").await.unwrap();
    CatalogStorage::new(db.pool())
}

impl CatalogStorage {
    pub async fn create_language(&self, code: &str, name: &str) -> anyhow::Result<Language> {
        let id = sqlx::query("INSERT INTO languages (short_name, full_name) VALUES (?, ?)")
            .bind(code)
            .bind(name)
            .execute(self.pool())
            .await?
            .last_insert_rowid();
        Ok(Language {
            id,
            short_name: code.to_string(),
            full_name: name.to_string(),
        })
    }

    pub async fn set_language_config(
        &self,
        language_id: i64,
        item: &str,
        show_language_id: i64,
        show: bool,
    ) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO language_config (language_id, item, show_language_id, show) VALUES (?, ?, ?, ?)")
            .bind(language_id)
            .bind(item)
            .bind(show_language_id)
            .bind(show)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn insert_named(&self, table: &str, name: &str) -> i64 {
        sqlx::query(&format!("INSERT INTO {table} (name) VALUES (?)"))
            .bind(name)
            .execute(self.pool())
            .await
            .unwrap()
            .last_insert_rowid()
    }

    pub async fn insert_muscle(&self, name: &str, is_front: bool) -> i64 {
        sqlx::query("INSERT INTO muscles (name, name_en, is_front) VALUES (?, ?, ?)")
            .bind(name)
            .bind(name)
            .bind(is_front)
            .execute(self.pool())
            .await
            .unwrap()
            .last_insert_rowid()
    }
}

/// A catalog with two languages, one category ("Arms"), one muscle and one
/// base without translations
pub struct Fixture {
    pub storage: CatalogStorage,
    pub en: i64,
    pub de: i64,
    pub category: i64,
    pub biceps: i64,
    pub base: i64,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::on(storage().await).await
    }

    /// Build the fixture inside an existing catalog
    pub async fn on(storage: CatalogStorage) -> Self {
        let en = storage.language_by_code("en").await.unwrap().unwrap().id;
        let de = storage.create_language("de", "Deutsch").await.unwrap().id;
        let category = storage.insert_named("exercise_categories", "Arms").await;
        let biceps = storage.insert_muscle("Biceps brachii", true).await;

        let mut fixture = Self {
            storage,
            en,
            de,
            category,
            biceps,
            base: 0,
        };
        fixture.base = fixture.base_with_muscles(&[]).await;
        fixture
    }

    pub async fn base_with_muscles(&self, muscles: &[i64]) -> i64 {
        self.storage
            .create_base(ExerciseBaseInput {
                category: Some(self.category),
                muscles: Some(muscles.to_vec()),
                ..Default::default()
            })
            .await
            .unwrap()
            .instance
            .id
    }

    pub async fn exercise(&self, name: &str, language: i64) -> Exercise {
        self.exercise_for(self.base, name, language).await
    }

    pub async fn exercise_for(&self, base: i64, name: &str, language: i64) -> Exercise {
        self.storage
            .create_exercise(
                ExerciseInput {
                    name: Some(name.to_string()),
                    description: Some(DESCRIPTION.to_string()),
                    language: Some(language),
                    exercise_base: Some(base),
                    ..Default::default()
                },
                Some("admin"),
            )
            .await
            .unwrap()
            .instance
    }

    pub async fn alias(&self, exercise: i64, alias: &str) -> Alias {
        self.storage
            .create_alias(AliasInput {
                exercise: Some(exercise),
                alias: Some(alias.to_string()),
            })
            .await
            .unwrap()
            .instance
    }

    /// Use `base` in a set of `workout`
    pub async fn setting(&self, workout: i64, base: i64) {
        sqlx::query("INSERT INTO workout_settings (workout_id, exercise_base_id, reps) VALUES (?, ?, 10)")
            .bind(workout)
            .bind(base)
            .execute(self.storage.pool())
            .await
            .unwrap();
    }
}
