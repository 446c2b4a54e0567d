//! # Branch Repository

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{DbError, DbResult};
use vendo_core::validation::validate_name;
use vendo_core::Branch;

#[derive(Debug, sqlx::FromRow)]
struct BranchRow {
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<BranchRow> for Branch {
    fn from(row: BranchRow) -> Self {
        Branch {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

/// Repository for branch lookups.
#[derive(Debug, Clone)]
pub struct BranchRepository {
    pool: SqlitePool,
}

impl BranchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BranchRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Branch>> {
        let row: Option<BranchRow> =
            sqlx::query_as("SELECT id, name, created_at FROM branches WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Branch::from))
    }

    pub async fn insert(&self, name: &str) -> DbResult<Branch> {
        validate_name("name", name).map_err(|e| DbError::invalid_data("branches.name", e))?;

        let now = Utc::now();
        let result = sqlx::query("INSERT INTO branches (name, created_at) VALUES (?1, ?2)")
            .bind(name.trim())
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(Branch {
            id: result.last_insert_rowid(),
            name: name.trim().to_string(),
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::test_support::fixture;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let fx = fixture().await;
        let branches = fx.db.branches();
        let airport = branches.insert("  Airport ").await.unwrap();
        assert_eq!(airport.name, "Airport");
        assert_ne!(airport.id, fx.branch.id);

        let found = branches.get_by_id(fx.branch.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Downtown");
        assert!(branches.get_by_id(0).await.unwrap().is_none());
    }
}
