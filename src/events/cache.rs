/// Cache store and invalidation keys
///
/// Overview pages cache their rendered body per language, workouts cache
/// their canonical representation. Which keys go stale when exercise data
/// changes is computed by plain functions so it can be checked without a
/// database or a running cache.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Fragments rendered from exercise data, one entry per language
pub const OVERVIEW_FRAGMENTS: [&str; 3] = ["muscle-overview", "exercise-overview", "equipment-overview"];

/// Key of a cached template fragment
pub fn template_fragment_key(fragment: &str, language_id: i64) -> String {
    format!("template.cache.{}.{}", fragment, language_id)
}

/// Key of a workout's cached canonical representation
pub fn workout_canonical_key(workout_id: i64) -> String {
    format!("workout-canonical-representation-{}", workout_id)
}

/// Every key to drop when an exercise (or its base) is saved or deleted:
/// the overview fragments for each language and the canonical form of each
/// workout using the base
pub fn exercise_invalidation_keys(language_ids: &[i64], workout_ids: &[i64]) -> Vec<String> {
    let mut keys = Vec::with_capacity(language_ids.len() * OVERVIEW_FRAGMENTS.len() + workout_ids.len());
    for language_id in language_ids {
        for fragment in OVERVIEW_FRAGMENTS {
            keys.push(template_fragment_key(fragment, *language_id));
        }
    }
    for workout_id in workout_ids {
        let key = workout_canonical_key(*workout_id);
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// Key/value cache used for rendered fragments and workout representations
#[async_trait]
pub trait CacheStore: Send + Sync + std::fmt::Debug {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String);
    /// Returns whether the key was present
    async fn delete(&self, key: &str) -> bool;

    async fn delete_many(&self, keys: &[String]) -> usize {
        let mut removed = 0;
        for key in keys {
            if self.delete(key).await {
                removed += 1;
            }
        }
        removed
    }
}

/// Process-local cache
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: String) {
        self.entries.write().await.insert(key.to_string(), value);
    }

    async fn delete(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keys_cover_every_language_and_workout() {
        let keys = exercise_invalidation_keys(&[1, 2], &[7, 7, 9]);
        assert_eq!(
            keys,
            vec![
                "template.cache.muscle-overview.1",
                "template.cache.exercise-overview.1",
                "template.cache.equipment-overview.1",
                "template.cache.muscle-overview.2",
                "template.cache.exercise-overview.2",
                "template.cache.equipment-overview.2",
                "workout-canonical-representation-7",
                "workout-canonical-representation-9",
            ]
        );
    }

    #[test]
    fn no_languages_no_workouts_no_keys() {
        assert!(exercise_invalidation_keys(&[], &[]).is_empty());
    }

    #[tokio::test]
    async fn memory_cache_delete_many_counts_hits() {
        let cache = MemoryCache::new();
        cache.set("a", "1".into()).await;
        cache.set("b", "2".into()).await;

        let removed = cache.delete_many(&["a".into(), "c".into()]).await;
        assert_eq!(removed, 1);
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await, Some("2".to_string()));
    }
}
