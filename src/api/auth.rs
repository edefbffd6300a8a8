/// Token authentication and exercise edit permissions
///
/// Requests authenticate with `Authorization: Token <key>`. Reading is open
/// to everyone, writing needs a user, deleting needs the delete permission.

use crate::api::{error::ApiError, AppState};
use anyhow::Result;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::Serialize;
use sqlx::{sqlite::SqlitePool, Row};

pub const CHANGE_EXERCISE: &str = "exercises.change_exercise";
pub const DELETE_EXERCISE: &str = "exercises.delete_exercise";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub permissions: Vec<String>,
}

impl User {
    pub fn has_perm(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

#[derive(Debug, Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn by_token(&self, token: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, email, permissions FROM users WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let permissions: String = row.try_get("permissions")?;
        Ok(Some(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            permissions: permissions.split_whitespace().map(String::from).collect(),
        }))
    }

    /// Create a user, or replace token and permissions of an existing one
    pub async fn upsert(&self, username: &str, email: &str, token: &str, permissions: &[String]) -> Result<i64> {
        sqlx::query(
            r#"
            INSERT INTO users (username, email, token, permissions) VALUES (?, ?, ?, ?)
            ON CONFLICT(username) DO UPDATE SET
                email = excluded.email, token = excluded.token, permissions = excluded.permissions
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(token)
        .bind(permissions.join(" "))
        .execute(&self.pool)
        .await?;

        let id: i64 = sqlx::query("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?
            .try_get("id")?;
        tracing::info!("👤 Stored user {} with {} permissions", username, permissions.len());
        Ok(id)
    }
}

/// The caller of a request, if it authenticated
#[derive(Debug, Clone)]
pub struct Actor(pub Option<User>);

impl Actor {
    /// Any authenticated user may create and update
    pub fn require_editor(&self) -> Result<&User, ApiError> {
        self.0.as_ref().ok_or(ApiError::NotAuthenticated)
    }

    pub fn require_permission(&self, permission: &str) -> Result<&User, ApiError> {
        let user = self.require_editor()?;
        if user.has_perm(permission) {
            Ok(user)
        } else {
            Err(ApiError::Forbidden(
                "You do not have permission to perform this action.".to_string(),
            ))
        }
    }

    pub fn require_deleter(&self) -> Result<&User, ApiError> {
        self.require_permission(DELETE_EXERCISE)
    }

    pub fn username(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.username.as_str())
    }
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Actor(None));
        };
        let Some(token) = header.to_str().ok().and_then(|h| h.strip_prefix("Token ")) else {
            return Err(ApiError::Forbidden("Invalid token header.".to_string()));
        };
        match state.users.by_token(token.trim()).await? {
            Some(user) => Ok(Actor(Some(user))),
            None => Err(ApiError::Forbidden("Invalid token.".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::storage;

    #[tokio::test]
    async fn tokens_resolve_to_users_with_permissions() {
        let catalog = storage().await;
        let users = UserStore::new(catalog.pool().clone());
        users
            .upsert("editor", "editor@example.com", "abc123", &[CHANGE_EXERCISE.to_string()])
            .await
            .unwrap();

        let user = users.by_token("abc123").await.unwrap().unwrap();
        assert_eq!(user.username, "editor");
        assert!(user.has_perm(CHANGE_EXERCISE));
        assert!(!user.has_perm(DELETE_EXERCISE));
        assert!(users.by_token("nope").await.unwrap().is_none());

        let actor = Actor(Some(user));
        assert!(actor.require_editor().is_ok());
        assert!(matches!(actor.require_deleter(), Err(ApiError::Forbidden(_))));
        assert!(matches!(Actor(None).require_editor(), Err(ApiError::NotAuthenticated)));
    }
}
