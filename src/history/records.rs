/// Historical exercise records

use crate::catalog::types::Exercise;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqlitePool, sqlite::SqliteRow, Row, SqliteConnection};
use uuid::Uuid;

const COLUMNS: &str = "history_id, id, uuid, name, description, language_id, exercise_base_id, \
                       license_id, license_author, history_date, history_type, history_user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HistoryType {
    #[serde(rename = "+")]
    Created,
    #[serde(rename = "~")]
    Changed,
    #[serde(rename = "-")]
    Deleted,
}

impl HistoryType {
    pub fn as_code(&self) -> &'static str {
        match self {
            HistoryType::Created => "+",
            HistoryType::Changed => "~",
            HistoryType::Deleted => "-",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "+" => Some(HistoryType::Created),
            "~" => Some(HistoryType::Changed),
            "-" => Some(HistoryType::Deleted),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HistoryType::Created => "Created",
            HistoryType::Changed => "Changed",
            HistoryType::Deleted => "Deleted",
        }
    }
}

/// Snapshot of a translation at one point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalExercise {
    pub history_id: i64,
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub description: String,
    pub language: i64,
    pub exercise_base: i64,
    pub license: i64,
    pub license_author: Option<String>,
    pub history_date: DateTime<Utc>,
    pub history_type: HistoryType,
    pub history_user: Option<String>,
}

impl HistoricalExercise {
    fn from_row(row: &SqliteRow) -> Result<Self> {
        let uuid: String = row.try_get("uuid")?;
        let history_type: String = row.try_get("history_type")?;
        Ok(Self {
            history_id: row.try_get("history_id")?,
            id: row.try_get("id")?,
            uuid: Uuid::parse_str(&uuid)?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            language: row.try_get("language_id")?,
            exercise_base: row.try_get("exercise_base_id")?,
            license: row.try_get("license_id")?,
            license_author: row.try_get("license_author")?,
            history_date: row.try_get("history_date")?,
            history_type: HistoryType::from_code(&history_type)
                .ok_or_else(|| anyhow::anyhow!("Unknown history type '{}'", history_type))?,
            history_user: row.try_get("history_user")?,
        })
    }
}

/// Store a snapshot of `exercise`, inside the caller's transaction
pub async fn record_exercise(
    conn: &mut SqliteConnection,
    exercise: &Exercise,
    history_type: HistoryType,
    user: Option<&str>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO exercise_history
            (id, uuid, name, description, language_id, exercise_base_id, license_id, license_author,
             history_date, history_type, history_user)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(exercise.id)
    .bind(exercise.uuid.to_string())
    .bind(&exercise.name)
    .bind(&exercise.description)
    .bind(exercise.language)
    .bind(exercise.exercise_base)
    .bind(exercise.license)
    .bind(&exercise.license_author)
    .bind(Utc::now())
    .bind(history_type.as_code())
    .bind(user)
    .execute(conn)
    .await?;
    Ok(result.last_insert_rowid())
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Every snapshot, newest first
    pub async fn list_all(&self) -> Result<Vec<HistoricalExercise>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM exercise_history ORDER BY history_date DESC, history_id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(HistoricalExercise::from_row).collect()
    }

    /// The snapshot of the same exercise taken right before `record`
    pub async fn prev_record(&self, record: &HistoricalExercise) -> Result<Option<HistoricalExercise>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM exercise_history WHERE id = ? AND history_id < ? \
             ORDER BY history_id DESC LIMIT 1"
        ))
        .bind(record.id)
        .bind(record.history_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(HistoricalExercise::from_row).transpose()
    }
}
