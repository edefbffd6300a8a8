/// Workout settings and canonical representations
///
/// Only the part of the workout manager the catalog interacts with: which
/// exercise bases a workout uses, and the cached canonical form that goes
/// stale when those bases change.

use crate::catalog::query::Record;
use crate::catalog::storage::CatalogStorage;
use crate::catalog::types::{Equipment, Exercise, ExerciseBase, ExerciseCategory, Language, Muscle};
use crate::catalog::validation::{resolve, resolve_or, FieldErrors, WriteError};
use crate::events::cache::{workout_canonical_key, CacheStore};
use crate::events::{CatalogEvent, WriteOutcome};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{sqlite::SqliteRow, Row};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Allowed reps-in-reserve values
pub const RIR_CHOICES: [&str; 9] = ["0", "0.5", "1", "1.5", "2", "2.5", "3", "3.5", "4"];

pub const MAX_REPS: i64 = 600;

/// Canonical spelling of a reps-in-reserve value, `None` if not allowed
pub fn normalize_rir(raw: &Value) -> Option<String> {
    let value = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    RIR_CHOICES
        .iter()
        .find(|choice| choice.parse::<f64>().is_ok_and(|c| c == value))
        .map(|choice| choice.to_string())
}

/// One exercise in a set of a workout day, flattened to its workout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutSetting {
    pub id: i64,
    pub workout: i64,
    pub exercise_base: i64,
    pub order: i64,
    pub reps: i64,
    pub rir: Option<String>,
}

impl Record for WorkoutSetting {
    const TABLE: &'static str = "workout_settings";
    const COLUMNS: &'static str = "id, workout_id, exercise_base_id, sets_order, reps, rir";
    const ORDERING: &'static [(&'static str, &'static str)] =
        &[("id", "id"), ("order", "sets_order"), ("reps", "reps")];
    const DEFAULT_ORDER: &'static str = "sets_order, id";

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            workout: row.try_get("workout_id")?,
            exercise_base: row.try_get("exercise_base_id")?,
            order: row.try_get("sets_order")?,
            reps: row.try_get("reps")?,
            rir: row.try_get("rir")?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingInput {
    pub workout: Option<i64>,
    pub exercise_base: Option<i64>,
    pub order: Option<i64>,
    pub reps: Option<i64>,
    pub rir: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct WorkoutStore {
    storage: CatalogStorage,
    cache: Arc<dyn CacheStore>,
}

impl WorkoutStore {
    pub fn new(storage: CatalogStorage, cache: Arc<dyn CacheStore>) -> Self {
        Self { storage, cache }
    }

    pub async fn create_setting(&self, input: SettingInput) -> Result<WriteOutcome<WorkoutSetting>, WriteError> {
        let mut errors = FieldErrors::new();

        let workout = resolve(&mut errors, "workout", input.workout, None, false);
        let exercise_base = resolve(&mut errors, "exercise_base", input.exercise_base, None, false);
        self.storage
            .check_reference::<ExerciseBase>(&mut errors, "exercise_base", exercise_base)
            .await?;

        let reps = resolve(&mut errors, "reps", input.reps, None, false);
        if reps.is_some_and(|r| !(0..=MAX_REPS).contains(&r)) {
            errors.add("reps", format!("Ensure this value is between 0 and {}.", MAX_REPS));
        }

        let rir = match input.rir {
            None | Some(Value::Null) => None,
            Some(raw) => {
                let normalized = normalize_rir(&raw);
                if normalized.is_none() {
                    let shown = match &raw {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    errors.add("rir", format!("\"{}\" is not a valid choice.", shown));
                }
                normalized
            }
        };
        let order = resolve_or(input.order, None, 1);

        let (Some(workout), Some(exercise_base), Some(reps)) = (workout, exercise_base, reps) else {
            return Err(WriteError::Invalid(errors));
        };
        errors.into_result()?;

        let id = sqlx::query(
            "INSERT INTO workout_settings (workout_id, exercise_base_id, sets_order, reps, rir) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(workout)
        .bind(exercise_base)
        .bind(order)
        .bind(reps)
        .bind(&rir)
        .execute(self.storage.pool())
        .await?
        .last_insert_rowid();

        let setting = WorkoutSetting {
            id,
            workout,
            exercise_base,
            order,
            reps,
            rir,
        };
        Ok(WriteOutcome::new(setting).with_event(CatalogEvent::WorkoutChanged { workout_id: workout }))
    }

    /// Canonical form of a workout, served from the cache when present.
    /// `None` for workouts without settings.
    pub async fn canonical_representation(&self, workout_id: i64) -> Result<Option<Value>> {
        let key = workout_canonical_key(workout_id);
        if let Some(cached) = self.cache.get(&key).await {
            match serde_json::from_str(&cached) {
                Ok(value) => return Ok(Some(value)),
                Err(e) => tracing::warn!("Discarding unreadable cache entry {}: {}", key, e),
            }
        }

        let Some(value) = self.build_canonical(workout_id).await? else {
            return Ok(None);
        };
        self.cache.set(&key, serde_json::to_string(&value)?).await;
        tracing::debug!("Cached canonical representation of workout {}", workout_id);
        Ok(Some(value))
    }

    async fn build_canonical(&self, workout_id: i64) -> Result<Option<Value>> {
        let settings = self
            .storage
            .records_where::<WorkoutSetting>("workout_id", workout_id)
            .await?;
        if settings.is_empty() {
            return Ok(None);
        }

        let mut base_ids: Vec<i64> = settings.iter().map(|s| s.exercise_base).collect();
        base_ids.sort_unstable();
        base_ids.dedup();
        let bases = self.storage.bases_by_id(&base_ids).await?;

        let mut entries = Vec::with_capacity(settings.len());
        for setting in &settings {
            let Some(base) = bases.get(&setting.exercise_base) else {
                continue;
            };
            let summary = self.base_summary(base).await?;
            entries.push(json!({
                "id": setting.id,
                "order": setting.order,
                "reps": setting.reps,
                "rir": setting.rir,
                "exercise_base": summary,
            }));
        }

        Ok(Some(json!({
            "id": workout_id,
            "settings": entries,
        })))
    }

    async fn base_summary(&self, base: &ExerciseBase) -> Result<Value> {
        let category = self.storage.get::<ExerciseCategory>(base.category).await?;
        let muscles = self.storage.records_where_in::<Muscle>("id", &base.muscles).await?;
        let equipment = self.storage.records_where_in::<Equipment>("id", &base.equipment).await?;

        let mut names = BTreeMap::new();
        for exercise in self
            .storage
            .records_where::<Exercise>("exercise_base_id", base.id)
            .await?
        {
            let code = match self.storage.get::<Language>(exercise.language).await? {
                Some(language) => language.short_name,
                None => exercise.language.to_string(),
            };
            names.insert(code, exercise.name);
        }

        Ok(json!({
            "id": base.id,
            "uuid": base.uuid,
            "category": category.map(|c| c.name),
            "muscles": muscles.into_iter().map(|m| m.name).collect::<Vec<_>>(),
            "equipment": equipment.into_iter().map(|e| e.name).collect::<Vec<_>>(),
            "names": names,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::input::ExerciseInput;
    use crate::catalog::testing::Fixture;
    use crate::catalog::LanguageRegistry;
    use crate::events::activity::ActivityLog;
    use crate::events::cache::MemoryCache;
    use crate::events::EventDispatcher;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(json!(0), Some("0"))]
    #[case(json!(1.5), Some("1.5"))]
    #[case(json!("2.5"), Some("2.5"))]
    #[case(json!("4.0"), Some("4"))]
    #[case(json!(5), None)]
    #[case(json!(0.25), None)]
    #[case(json!("lots"), None)]
    fn rir_values_are_restricted(#[case] raw: Value, #[case] expected: Option<&str>) {
        assert_eq!(normalize_rir(&raw).as_deref(), expected);
    }

    #[tokio::test]
    async fn setting_validation_collects_errors() {
        let fx = Fixture::new().await;
        let store = WorkoutStore::new(fx.storage.clone(), Arc::new(MemoryCache::new()));

        let result = store
            .create_setting(SettingInput {
                workout: Some(1),
                exercise_base: Some(fx.base),
                reps: Some(8),
                rir: Some(json!(7)),
                ..Default::default()
            })
            .await;
        let Err(WriteError::Invalid(errors)) = result else {
            panic!("expected validation error");
        };
        assert_eq!(errors.messages("rir"), ["\"7\" is not a valid choice.".to_string()]);

        let setting = store
            .create_setting(SettingInput {
                workout: Some(1),
                exercise_base: Some(fx.base),
                reps: Some(8),
                rir: Some(json!("1.5")),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(setting.instance.rir.as_deref(), Some("1.5"));
        assert_eq!(setting.events, vec![CatalogEvent::WorkoutChanged { workout_id: 1 }]);
    }

    #[tokio::test]
    async fn canonical_form_is_cached_until_exercise_changes() {
        let fx = Fixture::new().await;
        let exercise = fx.exercise("Curl", fx.en).await;
        fx.setting(5, fx.base).await;

        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        let store = WorkoutStore::new(fx.storage.clone(), cache.clone());
        let languages = Arc::new(LanguageRegistry::new(fx.storage.clone(), "en"));
        languages.reload().await.unwrap();
        let events = EventDispatcher::new(
            cache.clone(),
            ActivityLog::new(fx.storage.pool().clone()),
            languages,
        );

        let first = store.canonical_representation(5).await.unwrap().unwrap();
        assert_eq!(first["settings"][0]["exercise_base"]["names"]["en"], "Curl");
        assert!(cache.get(&workout_canonical_key(5)).await.is_some());

        let outcome = fx
            .storage
            .update_exercise(
                exercise.id,
                ExerciseInput {
                    name: Some("Biceps curl".into()),
                    ..Default::default()
                },
                true,
                None,
            )
            .await
            .unwrap();
        events.dispatch(outcome.events).await.unwrap();
        assert!(cache.get(&workout_canonical_key(5)).await.is_none());

        let second = store.canonical_representation(5).await.unwrap().unwrap();
        assert_eq!(second["settings"][0]["exercise_base"]["names"]["en"], "Biceps curl");
    }

    #[tokio::test]
    async fn unknown_workout_has_no_representation() {
        let fx = Fixture::new().await;
        let store = WorkoutStore::new(fx.storage.clone(), Arc::new(MemoryCache::new()));
        assert_eq!(store.canonical_representation(42).await.unwrap(), None);
    }
}
