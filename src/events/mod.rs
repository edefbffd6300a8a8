/// Post-commit events
///
/// Storage writes return the new state together with the events they
/// caused; handlers add the activity entry (they know the actor) and hand
/// everything to the dispatcher once the write went through.

pub mod activity;
pub mod cache;

use crate::catalog::languages::LanguageRegistry;
use activity::{ActivityLog, NewAction, Verb};
use anyhow::Result;
use cache::{exercise_invalidation_keys, workout_canonical_key, CacheStore};
use serde::Serialize;
use std::sync::Arc;

/// Something other parts of the system need to react to
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    /// Exercise data of a base changed, so overview fragments and the
    /// canonical forms of the listed workouts are stale
    ExerciseDataChanged { base_id: i64, workout_ids: Vec<i64> },
    /// The sets of a workout changed
    WorkoutChanged { workout_id: i64 },
    /// Entry for the activity stream
    Activity(NewAction),
}

/// Result of a write: the stored instance and what it triggers
#[derive(Debug, Clone)]
pub struct WriteOutcome<T> {
    pub instance: T,
    pub events: Vec<CatalogEvent>,
}

impl<T> WriteOutcome<T> {
    pub fn new(instance: T) -> Self {
        Self {
            instance,
            events: Vec::new(),
        }
    }

    pub fn with_event(mut self, event: CatalogEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> WriteOutcome<U> {
        WriteOutcome {
            instance: f(self.instance),
            events: self.events,
        }
    }
}

impl<T: Serialize> WriteOutcome<T> {
    /// Attach an activity entry carrying the serialized instance
    pub fn record_activity(
        self,
        actor: &str,
        verb: Verb,
        target_type: &'static str,
        target_id: i64,
    ) -> Result<Self> {
        let payload = serde_json::to_value(&self.instance)?;
        Ok(self.with_event(CatalogEvent::Activity(NewAction {
            actor: actor.to_string(),
            verb,
            target_type,
            target_id,
            payload,
        })))
    }
}

/// Runs the reactions to catalog events, inline
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    cache: Arc<dyn CacheStore>,
    activity: ActivityLog,
    languages: Arc<LanguageRegistry>,
}

impl EventDispatcher {
    pub fn new(cache: Arc<dyn CacheStore>, activity: ActivityLog, languages: Arc<LanguageRegistry>) -> Self {
        Self {
            cache,
            activity,
            languages,
        }
    }

    pub async fn dispatch(&self, events: Vec<CatalogEvent>) -> Result<()> {
        for event in events {
            match event {
                CatalogEvent::ExerciseDataChanged { base_id, workout_ids } => {
                    let keys = exercise_invalidation_keys(&self.languages.language_ids(), &workout_ids);
                    let removed = self.cache.delete_many(&keys).await;
                    tracing::debug!(
                        "🧹 Exercise base {} changed: {} cache keys checked, {} removed",
                        base_id,
                        keys.len(),
                        removed
                    );
                }
                CatalogEvent::WorkoutChanged { workout_id } => {
                    self.cache.delete(&workout_canonical_key(workout_id)).await;
                }
                CatalogEvent::Activity(action) => {
                    self.activity.append(&action).await?;
                }
            }
        }
        Ok(())
    }
}
