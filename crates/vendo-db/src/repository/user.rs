//! # User Repository

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use vendo_core::validation::{validate_email, validate_name};
use vendo_core::User;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

/// Repository for user lookups.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, username, email, created_at FROM users WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(User::from))
    }

    /// Inserts a user.
    ///
    /// ## Errors
    /// `UniqueViolation` if the username is taken.
    pub async fn insert(&self, username: &str, email: &str) -> DbResult<User> {
        validate_name("username", username).map_err(|e| DbError::invalid_data("users.username", e))?;
        validate_email(email).map_err(|e| DbError::invalid_data("users.email", e))?;

        debug!(username = %username, "Inserting user");

        let now = Utc::now();
        let result = sqlx::query("INSERT INTO users (username, email, created_at) VALUES (?1, ?2, ?3)")
            .bind(username.trim())
            .bind(email.trim())
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => DbError::duplicate(field, username),
                other => other,
            })?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::test_support::fixture;
    use crate::DbError;

    #[tokio::test]
    async fn test_lookup() {
        let fx = fixture().await;
        let users = fx.db.users();

        let by_id = users.get_by_id(fx.user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "ana");
        assert!(users.get_by_id(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let fx = fixture().await;
        let err = fx.db.users().insert("ana", "other@example.com").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "ana"));
    }
}
