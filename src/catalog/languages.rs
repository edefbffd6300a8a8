/// Language registry using ArcSwap
///
/// Languages and the per-language visibility configuration are read on
/// every search and on every exercise save, but change almost never. The
/// registry keeps a snapshot in memory and swaps it atomically on reload.

use crate::catalog::{storage::CatalogStorage, types::Language};
use anyhow::Result;
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Item kind whose visibility is configured for exercises
pub const SHOW_ITEM_EXERCISES: &str = "exercises";

/// "When the UI is in `language_id`, show `item`s written in
/// `show_language_id`" (or explicitly hide them when `show` is false)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfigEntry {
    pub language_id: i64,
    pub item: String,
    pub show_language_id: i64,
    pub show: bool,
}

#[derive(Debug, Default)]
struct Snapshot {
    languages: Vec<Language>,
    config: Vec<LanguageConfigEntry>,
}

#[derive(Debug)]
pub struct LanguageRegistry {
    snapshot: ArcSwap<Snapshot>,
    storage: CatalogStorage,
    default_code: String,
}

impl LanguageRegistry {
    /// Create an empty registry; call `reload` before use
    pub fn new(storage: CatalogStorage, default_code: impl Into<String>) -> Self {
        Self {
            snapshot: ArcSwap::new(Arc::new(Snapshot::default())),
            storage,
            default_code: default_code.into(),
        }
    }

    /// Re-read languages and visibility configuration from storage
    pub async fn reload(&self) -> Result<()> {
        let languages = self.storage.all_languages().await?;
        let config = self.storage.language_config().await?;
        tracing::info!(
            "🌐 Loaded {} languages and {} visibility rules",
            languages.len(),
            config.len()
        );
        self.snapshot.store(Arc::new(Snapshot { languages, config }));
        Ok(())
    }

    pub fn languages(&self) -> Vec<Language> {
        self.snapshot.load().languages.clone()
    }

    pub fn language_ids(&self) -> Vec<i64> {
        self.snapshot.load().languages.iter().map(|l| l.id).collect()
    }

    pub fn get(&self, id: i64) -> Option<Language> {
        self.snapshot.load().languages.iter().find(|l| l.id == id).cloned()
    }

    /// Language for a short code; unknown or missing codes fall back to the
    /// default language
    pub fn resolve(&self, code: Option<&str>) -> Option<Language> {
        let snapshot = self.snapshot.load();
        let by_code = |code: &str| snapshot.languages.iter().find(|l| l.short_name == code).cloned();
        code.and_then(|c| by_code(c))
            .or_else(|| by_code(&self.default_code))
            .or_else(|| snapshot.languages.first().cloned())
    }

    /// Languages whose `item`s are visible for the UI language `code`.
    ///
    /// Without any rule for that language only the default language is
    /// visible.
    pub fn load_item_languages(&self, item: &str, code: Option<&str>) -> Vec<Language> {
        let Some(language) = self.resolve(code) else {
            return Vec::new();
        };
        let snapshot = self.snapshot.load();

        let visible: Vec<Language> = snapshot
            .config
            .iter()
            .filter(|entry| entry.language_id == language.id && entry.item == item && entry.show)
            .filter_map(|entry| snapshot.languages.iter().find(|l| l.id == entry.show_language_id))
            .cloned()
            .collect();

        if !visible.is_empty() {
            return visible;
        }
        self.resolve(None).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::storage;
    use pretty_assertions::assert_eq;

    fn codes(languages: &[Language]) -> Vec<&str> {
        languages.iter().map(|l| l.short_name.as_str()).collect()
    }

    #[tokio::test]
    async fn resolves_codes_with_default_fallback() {
        let storage = storage().await;
        storage.create_language("de", "Deutsch").await.unwrap();
        let registry = LanguageRegistry::new(storage, "en");
        registry.reload().await.unwrap();

        assert_eq!(registry.resolve(Some("de")).unwrap().short_name, "de");
        assert_eq!(registry.resolve(Some("xx")).unwrap().short_name, "en");
        assert_eq!(registry.resolve(None).unwrap().short_name, "en");
        assert_eq!(registry.language_ids().len(), 2);
    }

    #[tokio::test]
    async fn item_languages_follow_config() {
        let storage = storage().await;
        let de = storage.create_language("de", "Deutsch").await.unwrap();
        let fr = storage.create_language("fr", "Français").await.unwrap();
        let en = storage.language_by_code("en").await.unwrap().unwrap();
        storage.set_language_config(de.id, SHOW_ITEM_EXERCISES, de.id, true).await.unwrap();
        storage.set_language_config(de.id, SHOW_ITEM_EXERCISES, en.id, true).await.unwrap();
        storage.set_language_config(de.id, SHOW_ITEM_EXERCISES, fr.id, false).await.unwrap();

        let registry = LanguageRegistry::new(storage, "en");
        registry.reload().await.unwrap();

        let mut visible = codes(&registry.load_item_languages(SHOW_ITEM_EXERCISES, Some("de")))
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        visible.sort();
        assert_eq!(visible, vec!["de", "en"]);

        // French has no rules at all
        assert_eq!(
            codes(&registry.load_item_languages(SHOW_ITEM_EXERCISES, Some("fr"))),
            vec!["en"]
        );
    }
}
