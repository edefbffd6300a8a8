/// Request payloads for catalog writes
///
/// Every field is optional so the same payload serves create, full update
/// and partial update; storage decides which absences are errors. Nullable
/// columns use `Option<Option<T>>` so that an explicit `null` can be told
/// apart from a missing key.

use crate::catalog::types::ImageStatus;
use serde::{Deserialize, Deserializer};

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExerciseBaseInput {
    pub category: Option<i64>,
    pub muscles: Option<Vec<i64>>,
    pub muscles_secondary: Option<Vec<i64>>,
    pub equipment: Option<Vec<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub variations: Option<Option<i64>>,
    pub license: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub license_author: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExerciseInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub language: Option<i64>,
    pub exercise_base: Option<i64>,
    pub license: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub license_author: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageInput {
    pub exercise_base: Option<i64>,
    /// Path of the already stored upload, relative to the media root
    pub image: Option<String>,
    pub is_main: Option<bool>,
    pub status: Option<ImageStatus>,
    pub license: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub license_author: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentInput {
    pub exercise: Option<i64>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AliasInput {
    pub exercise: Option<i64>,
    pub alias: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn explicit_null_differs_from_missing() {
        let missing: ExerciseBaseInput = serde_json::from_str(r#"{"category": 2}"#).unwrap();
        assert_eq!(missing.variations, None);

        let cleared: ExerciseBaseInput = serde_json::from_str(r#"{"variations": null}"#).unwrap();
        assert_eq!(cleared.variations, Some(None));

        let set: ExerciseBaseInput = serde_json::from_str(r#"{"variations": 4}"#).unwrap();
        assert_eq!(set.variations, Some(Some(4)));
    }

    #[test]
    fn image_status_accepts_codes() {
        let input: ImageInput = serde_json::from_str(r#"{"status": "2", "is_main": true}"#).unwrap();
        assert_eq!(input.status, Some(ImageStatus::Accepted));
        assert_eq!(input.is_main, Some(true));
    }
}
