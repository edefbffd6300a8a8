/// Edit history of exercise translations
///
/// Every create, change and delete of a translation stores a full snapshot.
/// Revisions pair each snapshot with the previous one of the same exercise
/// and list what changed between them.

pub mod diff;
pub mod records;

pub use diff::{diff, FieldChange};
pub use records::{HistoricalExercise, HistoryStore, HistoryType};

use anyhow::Result;
use serde::Serialize;

/// A snapshot together with its changes against the previous snapshot
#[derive(Debug, Clone, Serialize)]
pub struct Revision {
    pub record: HistoricalExercise,
    pub changes: Vec<FieldChange>,
}

/// Revisions of every snapshot that has a predecessor, newest first
pub async fn revisions(store: &HistoryStore) -> Result<Vec<Revision>> {
    let mut out = Vec::new();
    for record in store.list_all().await? {
        let Some(previous) = store.prev_record(&record).await? else {
            continue;
        };
        out.push(Revision {
            changes: diff(&previous, &record),
            record,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::input::ExerciseInput;
    use crate::catalog::testing::Fixture;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn first_snapshot_has_no_revision() {
        let fx = Fixture::new().await;
        let exercise = fx.exercise("Chin up", fx.en).await;
        let store = HistoryStore::new(fx.storage.pool().clone());

        assert!(revisions(&store).await.unwrap().is_empty());

        fx.storage
            .update_exercise(
                exercise.id,
                ExerciseInput {
                    name: Some("Chin-up".into()),
                    ..Default::default()
                },
                true,
                Some("editor"),
            )
            .await
            .unwrap();

        let revisions = revisions(&store).await.unwrap();
        assert_eq!(revisions.len(), 1);
        assert_eq!(revisions[0].record.history_type, HistoryType::Changed);
        assert_eq!(revisions[0].record.history_user.as_deref(), Some("editor"));
        assert_eq!(
            revisions[0].changes,
            vec![FieldChange {
                field: "name",
                old: "Chin up".into(),
                new: "Chin-up".into(),
            }]
        );
    }

    #[tokio::test]
    async fn deletion_is_a_revision_without_changes() {
        let fx = Fixture::new().await;
        let exercise = fx.exercise("Chin up", fx.en).await;
        fx.storage.delete_exercise(exercise.id, None).await.unwrap();

        let store = HistoryStore::new(fx.storage.pool().clone());
        let revisions = revisions(&store).await.unwrap();
        assert_eq!(revisions.len(), 1);
        assert_eq!(revisions[0].record.history_type, HistoryType::Deleted);
        assert!(revisions[0].changes.is_empty());
    }
}
