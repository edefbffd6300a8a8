/// Field-level differences between two snapshots

use crate::history::records::HistoricalExercise;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: &'static str,
    pub old: String,
    pub new: String,
}

fn author(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Changes from `old` to `new`, in field order
pub fn diff(old: &HistoricalExercise, new: &HistoricalExercise) -> Vec<FieldChange> {
    let fields: [(&'static str, String, String); 7] = [
        ("uuid", old.uuid.to_string(), new.uuid.to_string()),
        ("name", old.name.clone(), new.name.clone()),
        ("description", old.description.clone(), new.description.clone()),
        ("language", old.language.to_string(), new.language.to_string()),
        ("exercise_base", old.exercise_base.to_string(), new.exercise_base.to_string()),
        ("license", old.license.to_string(), new.license.to_string()),
        ("license_author", author(&old.license_author), author(&new.license_author)),
    ];

    fields
        .into_iter()
        .filter(|(_, old, new)| old != new)
        .map(|(field, old, new)| FieldChange { field, old, new })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::records::HistoryType;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn snapshot(history_id: i64, name: &str, license_author: Option<&str>) -> HistoricalExercise {
        HistoricalExercise {
            history_id,
            id: 1,
            uuid: Uuid::nil(),
            name: name.to_string(),
            description: "Same description".to_string(),
            language: 2,
            exercise_base: 3,
            license: 1,
            license_author: license_author.map(String::from),
            history_date: Utc::now(),
            history_type: HistoryType::Changed,
            history_user: None,
        }
    }

    #[test]
    fn lists_only_changed_fields() {
        let old = snapshot(1, "Dip", None);
        let new = snapshot(2, "Bench dip", Some("J. Doe"));
        assert_eq!(
            diff(&old, &new),
            vec![
                FieldChange {
                    field: "name",
                    old: "Dip".into(),
                    new: "Bench dip".into(),
                },
                FieldChange {
                    field: "license_author",
                    old: String::new(),
                    new: "J. Doe".into(),
                },
            ]
        );
    }

    #[test]
    fn identical_snapshots_have_no_changes() {
        let old = snapshot(1, "Dip", None);
        assert!(diff(&old, &snapshot(2, "Dip", None)).is_empty());
    }
}
