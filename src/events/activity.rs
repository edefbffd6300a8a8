/// Activity stream
///
/// Append-only log of who created or updated what. The serialized object
/// is stored next to the entry so the history page can show it even after
/// the object changed again.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{sqlite::SqlitePool, Row};

/// What happened to the object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Created,
    Updated,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Created => "created",
            Verb::Updated => "updated",
        }
    }
}

/// Entry to append
#[derive(Debug, Clone, PartialEq)]
pub struct NewAction {
    pub actor: String,
    pub verb: Verb,
    pub target_type: &'static str,
    pub target_id: i64,
    pub payload: Value,
}

/// Stored entry
#[derive(Debug, Clone, Serialize)]
pub struct Action {
    pub id: i64,
    pub actor: String,
    pub verb: String,
    pub target_type: String,
    pub target_id: i64,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ActivityLog {
    pool: SqlitePool,
}

impl ActivityLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, action: &NewAction) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO activity_actions (actor, verb, target_type, target_id, payload, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&action.actor)
        .bind(action.verb.as_str())
        .bind(action.target_type)
        .bind(action.target_id)
        .bind(serde_json::to_string(&action.payload)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            "📝 {} {} {} #{}",
            action.actor,
            action.verb.as_str(),
            action.target_type,
            action.target_id
        );
        Ok(result.last_insert_rowid())
    }

    /// The whole stream, newest first
    pub async fn list_all(&self) -> Result<Vec<Action>> {
        let rows = sqlx::query(
            "SELECT id, actor, verb, target_type, target_id, payload, timestamp \
             FROM activity_actions ORDER BY timestamp DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut actions = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: String = row.try_get("payload")?;
            actions.push(Action {
                id: row.try_get("id")?,
                actor: row.try_get("actor")?,
                verb: row.try_get("verb")?,
                target_type: row.try_get("target_type")?,
                target_id: row.try_get("target_id")?,
                payload: serde_json::from_str(&payload)?,
                timestamp: row.try_get("timestamp")?,
            });
        }
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::storage;
    use serde_json::json;

    #[tokio::test]
    async fn stream_lists_newest_first() {
        let log = ActivityLog::new(storage().await.pool().clone());
        for (verb, target_id) in [(Verb::Created, 1), (Verb::Updated, 1), (Verb::Created, 2)] {
            log.append(&NewAction {
                actor: "admin".to_string(),
                verb,
                target_type: "exercisebase",
                target_id,
                payload: json!({ "id": target_id }),
            })
            .await
            .unwrap();
        }

        let actions = log.list_all().await.unwrap();
        let seen: Vec<(&str, i64)> = actions.iter().map(|a| (a.verb.as_str(), a.target_id)).collect();
        assert_eq!(seen, vec![("created", 2), ("updated", 1), ("created", 1)]);
        assert_eq!(actions[0].payload, json!({ "id": 2 }));
    }
}
