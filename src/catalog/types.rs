/// Catalog entity definitions
///
/// Rows of the catalog tables plus the derived views the API and the
/// overview pages build on top of them. Field names follow the JSON the
/// REST API exposes, so `exercise_base` holds the base id and so on.

use crate::catalog::query::Record;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row};
use std::sync::OnceLock;
use uuid::Uuid;

fn uuid_column(row: &SqliteRow, column: &str) -> sqlx::Result<Uuid> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: i64,
    pub short_name: String,
    pub full_name: String,
}

impl Record for Language {
    const TABLE: &'static str = "languages";
    const COLUMNS: &'static str = "id, short_name, full_name";
    const ORDERING: &'static [(&'static str, &'static str)] =
        &[("id", "id"), ("short_name", "short_name"), ("full_name", "full_name")];
    const DEFAULT_ORDER: &'static str = "full_name";

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            short_name: row.try_get("short_name")?,
            full_name: row.try_get("full_name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub id: i64,
    pub full_name: String,
    pub short_name: String,
    pub url: String,
}

impl Record for License {
    const TABLE: &'static str = "licenses";
    const COLUMNS: &'static str = "id, full_name, short_name, url";
    const ORDERING: &'static [(&'static str, &'static str)] =
        &[("id", "id"), ("full_name", "full_name"), ("short_name", "short_name")];
    const DEFAULT_ORDER: &'static str = "full_name";

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            full_name: row.try_get("full_name")?,
            short_name: row.try_get("short_name")?,
            url: row.try_get("url")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseCategory {
    pub id: i64,
    pub name: String,
}

impl Record for ExerciseCategory {
    const TABLE: &'static str = "exercise_categories";
    const COLUMNS: &'static str = "id, name";
    const ORDERING: &'static [(&'static str, &'static str)] = &[("id", "id"), ("name", "name")];
    const DEFAULT_ORDER: &'static str = "name";

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: i64,
    pub name: String,
}

impl Record for Equipment {
    const TABLE: &'static str = "equipment";
    const COLUMNS: &'static str = "id, name";
    const ORDERING: &'static [(&'static str, &'static str)] = &[("id", "id"), ("name", "name")];
    const DEFAULT_ORDER: &'static str = "name";

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Muscle {
    pub id: i64,
    pub name: String,
    pub name_en: String,
    pub is_front: bool,
}

impl Record for Muscle {
    const TABLE: &'static str = "muscles";
    const COLUMNS: &'static str = "id, name, name_en, is_front";
    const ORDERING: &'static [(&'static str, &'static str)] =
        &[("id", "id"), ("name", "name"), ("name_en", "name_en"), ("is_front", "is_front")];
    const DEFAULT_ORDER: &'static str = "name";

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            name_en: row.try_get("name_en")?,
            is_front: row.try_get("is_front")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variation {
    pub id: i64,
}

impl Record for Variation {
    const TABLE: &'static str = "variations";
    const COLUMNS: &'static str = "id";
    const ORDERING: &'static [(&'static str, &'static str)] = &[("id", "id")];
    const DEFAULT_ORDER: &'static str = "id";

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self { id: row.try_get("id")? })
    }
}

/// Language-neutral root of an exercise
///
/// The many-to-many lists are not part of the row; storage fills them in
/// after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseBase {
    pub id: i64,
    pub uuid: Uuid,
    pub category: i64,
    pub muscles: Vec<i64>,
    pub muscles_secondary: Vec<i64>,
    pub equipment: Vec<i64>,
    pub variations: Option<i64>,
    pub license: i64,
    pub license_author: Option<String>,
    pub creation_date: NaiveDate,
    pub update_date: DateTime<Utc>,
}

impl Record for ExerciseBase {
    const TABLE: &'static str = "exercise_bases";
    const COLUMNS: &'static str = "id, uuid, category_id, variation_id, license_id, license_author, \
                                   creation_date, update_date";
    const ORDERING: &'static [(&'static str, &'static str)] = &[
        ("id", "id"),
        ("uuid", "uuid"),
        ("category", "category_id"),
        ("variations", "variation_id"),
        ("license", "license_id"),
        ("license_author", "license_author"),
        ("creation_date", "creation_date"),
        ("update_date", "update_date"),
    ];
    const DEFAULT_ORDER: &'static str = "id";

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            uuid: uuid_column(row, "uuid")?,
            category: row.try_get("category_id")?,
            muscles: Vec::new(),
            muscles_secondary: Vec::new(),
            equipment: Vec::new(),
            variations: row.try_get("variation_id")?,
            license: row.try_get("license_id")?,
            license_author: row.try_get("license_author")?,
            creation_date: row.try_get("creation_date")?,
            update_date: row.try_get("update_date")?,
        })
    }
}

/// A language-specific translation of an exercise base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub description: String,
    pub language: i64,
    pub exercise_base: i64,
    pub license: i64,
    pub license_author: Option<String>,
    pub creation_date: NaiveDate,
    pub update_date: DateTime<Utc>,
}

impl Record for Exercise {
    const TABLE: &'static str = "exercises";
    const COLUMNS: &'static str = "id, uuid, name, description, language_id, exercise_base_id, \
                                   license_id, license_author, creation_date, update_date";
    const ORDERING: &'static [(&'static str, &'static str)] = &[
        ("id", "id"),
        ("uuid", "uuid"),
        ("name", "name"),
        ("description", "description"),
        ("language", "language_id"),
        ("exercise_base", "exercise_base_id"),
        ("license", "license_id"),
        ("license_author", "license_author"),
        ("creation_date", "creation_date"),
        ("update_date", "update_date"),
    ];
    const DEFAULT_ORDER: &'static str = "name, id";

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            uuid: uuid_column(row, "uuid")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            language: row.try_get("language_id")?,
            exercise_base: row.try_get("exercise_base_id")?,
            license: row.try_get("license_id")?,
            license_author: row.try_get("license_author")?,
            creation_date: row.try_get("creation_date")?,
            update_date: row.try_get("update_date")?,
        })
    }
}

impl Exercise {
    /// Description with all markup removed
    pub fn description_clean(&self) -> String {
        strip_markup(&self.description)
    }

    /// URL-friendly version of the name used in page links
    pub fn slug(&self) -> String {
        let mut slug = String::new();
        for c in self.name.chars() {
            if c.is_alphanumeric() {
                slug.extend(c.to_lowercase());
            } else if !slug.ends_with('-') && !slug.is_empty() {
                slug.push('-');
            }
        }
        slug.trim_end_matches('-').to_string()
    }
}

/// Remove HTML tags and collapse the common entities
pub fn strip_markup(text: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex"));
    tags.replace_all(text, "")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Review state of an uploaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageStatus {
    #[serde(rename = "1")]
    Pending,
    #[serde(rename = "2")]
    Accepted,
    #[serde(rename = "3")]
    Declined,
}

impl ImageStatus {
    pub fn as_code(&self) -> &'static str {
        match self {
            ImageStatus::Pending => "1",
            ImageStatus::Accepted => "2",
            ImageStatus::Declined => "3",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(ImageStatus::Pending),
            "2" => Some(ImageStatus::Accepted),
            "3" => Some(ImageStatus::Declined),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseImage {
    pub id: i64,
    pub uuid: Uuid,
    pub exercise_base: i64,
    pub image: String,
    pub is_main: bool,
    pub status: ImageStatus,
    pub license: i64,
    pub license_author: Option<String>,
}

impl Record for ExerciseImage {
    const TABLE: &'static str = "exercise_images";
    const COLUMNS: &'static str =
        "id, uuid, exercise_base_id, image, is_main, status, license_id, license_author";
    const ORDERING: &'static [(&'static str, &'static str)] = &[
        ("id", "id"),
        ("uuid", "uuid"),
        ("exercise_base", "exercise_base_id"),
        ("image", "image"),
        ("is_main", "is_main"),
        ("status", "status"),
        ("license", "license_id"),
        ("license_author", "license_author"),
    ];
    const DEFAULT_ORDER: &'static str = "id";

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            uuid: uuid_column(row, "uuid")?,
            exercise_base: row.try_get("exercise_base_id")?,
            image: row.try_get("image")?,
            is_main: row.try_get("is_main")?,
            status: ImageStatus::from_code(&status).ok_or_else(|| {
                sqlx::Error::Decode(format!("unknown image status '{}'", status).into())
            })?,
            license: row.try_get("license_id")?,
            license_author: row.try_get("license_author")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseVideo {
    pub id: i64,
    pub uuid: Uuid,
    pub exercise_base: i64,
    pub video: String,
    pub is_main: bool,
    pub size: i64,
    pub duration: f64,
    pub width: i64,
    pub height: i64,
    pub codec: String,
    pub codec_long: String,
    pub license: i64,
    pub license_author: Option<String>,
}

impl Record for ExerciseVideo {
    const TABLE: &'static str = "exercise_videos";
    const COLUMNS: &'static str = "id, uuid, exercise_base_id, video, is_main, size, duration, \
                                   width, height, codec, codec_long, license_id, license_author";
    const ORDERING: &'static [(&'static str, &'static str)] = &[
        ("id", "id"),
        ("uuid", "uuid"),
        ("exercise_base", "exercise_base_id"),
        ("is_main", "is_main"),
        ("size", "size"),
        ("duration", "duration"),
        ("license", "license_id"),
        ("license_author", "license_author"),
    ];
    const DEFAULT_ORDER: &'static str = "id";

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            uuid: uuid_column(row, "uuid")?,
            exercise_base: row.try_get("exercise_base_id")?,
            video: row.try_get("video")?,
            is_main: row.try_get("is_main")?,
            size: row.try_get("size")?,
            duration: row.try_get("duration")?,
            width: row.try_get("width")?,
            height: row.try_get("height")?,
            codec: row.try_get("codec")?,
            codec_long: row.try_get("codec_long")?,
            license: row.try_get("license_id")?,
            license_author: row.try_get("license_author")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseComment {
    pub id: i64,
    pub exercise: i64,
    pub comment: String,
}

impl Record for ExerciseComment {
    const TABLE: &'static str = "exercise_comments";
    const COLUMNS: &'static str = "id, exercise_id, comment";
    const ORDERING: &'static [(&'static str, &'static str)] =
        &[("id", "id"), ("exercise", "exercise_id"), ("comment", "comment")];
    const DEFAULT_ORDER: &'static str = "id";

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            exercise: row.try_get("exercise_id")?,
            comment: row.try_get("comment")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub id: i64,
    pub exercise: i64,
    pub alias: String,
}

impl Record for Alias {
    const TABLE: &'static str = "exercise_aliases";
    const COLUMNS: &'static str = "id, exercise_id, alias";
    const ORDERING: &'static [(&'static str, &'static str)] =
        &[("id", "id"), ("exercise", "exercise_id"), ("alias", "alias")];
    const DEFAULT_ORDER: &'static str = "id";

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            exercise: row.try_get("exercise_id")?,
            alias: row.try_get("alias")?,
        })
    }
}

/// Flat representation used by the read-only `exercise` endpoint: the
/// translation plus the fields it proxies from its base
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseSummary {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub exercise_base: i64,
    pub description: String,
    pub creation_date: NaiveDate,
    pub category: i64,
    pub muscles: Vec<i64>,
    pub muscles_secondary: Vec<i64>,
    pub equipment: Vec<i64>,
    pub language: i64,
    pub license: i64,
    pub license_author: Option<String>,
    pub variations: Option<i64>,
}

impl ExerciseSummary {
    pub fn new(exercise: Exercise, base: &ExerciseBase) -> Self {
        Self {
            id: exercise.id,
            uuid: exercise.uuid,
            name: exercise.name,
            exercise_base: exercise.exercise_base,
            description: exercise.description,
            creation_date: exercise.creation_date,
            category: base.category,
            muscles: base.muscles.clone(),
            muscles_secondary: base.muscles_secondary.clone(),
            equipment: base.equipment.clone(),
            language: exercise.language,
            license: exercise.license,
            license_author: exercise.license_author,
            variations: base.variations,
        }
    }
}

/// A translation together with everything it derives from its base.
/// Nothing here is stored separately.
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseInfo {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub exercise_base_id: i64,
    pub description: String,
    pub description_clean: String,
    pub creation_date: NaiveDate,
    pub category: ExerciseCategory,
    pub muscles: Vec<Muscle>,
    pub muscles_secondary: Vec<Muscle>,
    pub equipment: Vec<Equipment>,
    pub language: Language,
    pub license: License,
    pub license_author: Option<String>,
    pub images: Vec<ExerciseImage>,
    pub videos: Vec<ExerciseVideo>,
    pub comments: Vec<ExerciseComment>,
    pub aliases: Vec<Alias>,
    /// Translations in the same language of every base in the variation group
    pub variations: Vec<i64>,
}

impl ExerciseInfo {
    /// Main image among the accepted ones. Several images may carry the
    /// flag; the oldest (lowest id) wins.
    pub fn main_image(&self) -> Option<&ExerciseImage> {
        main_image(&self.images)
    }

    pub fn muscles_front(&self, secondary: bool) -> Vec<&Muscle> {
        self.muscle_list(secondary).iter().filter(|m| m.is_front).collect()
    }

    pub fn muscles_back(&self, secondary: bool) -> Vec<&Muscle> {
        self.muscle_list(secondary).iter().filter(|m| !m.is_front).collect()
    }

    fn muscle_list(&self, secondary: bool) -> &[Muscle] {
        if secondary {
            &self.muscles_secondary
        } else {
            &self.muscles
        }
    }
}

/// Pick the main image of a base out of its images
pub fn main_image(images: &[ExerciseImage]) -> Option<&ExerciseImage> {
    images
        .iter()
        .filter(|image| image.is_main && image.status == ImageStatus::Accepted)
        .min_by_key(|image| image.id)
}

/// An exercise base with its translations and media, nested
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseBaseInfo {
    pub id: i64,
    pub uuid: Uuid,
    pub creation_date: NaiveDate,
    pub update_date: DateTime<Utc>,
    pub category: ExerciseCategory,
    pub muscles: Vec<Muscle>,
    pub muscles_secondary: Vec<Muscle>,
    pub equipment: Vec<Equipment>,
    pub license: License,
    pub license_author: Option<String>,
    pub images: Vec<ExerciseImage>,
    pub videos: Vec<ExerciseVideo>,
    pub exercises: Vec<Exercise>,
    pub variations: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn image(id: i64, is_main: bool, status: ImageStatus) -> ExerciseImage {
        ExerciseImage {
            id,
            uuid: Uuid::new_v4(),
            exercise_base: 1,
            image: format!("exercise-images/1/{}.png", id),
            is_main,
            status,
            license: 1,
            license_author: None,
        }
    }

    #[test]
    fn main_image_ignores_unaccepted_and_prefers_lowest_id() {
        let images = vec![
            image(5, true, ImageStatus::Accepted),
            image(2, true, ImageStatus::Pending),
            image(3, false, ImageStatus::Accepted),
            image(4, true, ImageStatus::Accepted),
        ];
        assert_eq!(main_image(&images).map(|i| i.id), Some(4));
        assert_eq!(main_image(&images[1..3]), None);
    }

    #[test]
    fn strips_markup_from_description() {
        assert_eq!(
            strip_markup("<p>Keep your <strong>back</strong> straight&nbsp;&amp; breathe</p>"),
            "Keep your back straight & breathe"
        );
    }

    #[test]
    fn image_status_uses_numeric_codes() {
        assert_eq!(serde_json::to_string(&ImageStatus::Accepted).unwrap(), "\"2\"");
        assert_eq!(ImageStatus::from_code("3"), Some(ImageStatus::Declined));
        assert_eq!(ImageStatus::from_code("9"), None);
    }
}
