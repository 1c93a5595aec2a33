use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A person who drives on the account. `is_self` marks the account owner's
/// own entry and feeds the entry-form default chain.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Driver {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub is_self: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateDriver {
    pub name: String,
    pub is_self: Option<bool>,
}

const DRIVER_COLUMNS: &str = "id, user_id, name, is_self, created_at, updated_at";

impl Driver {
    pub async fn create<'e, E>(
        executor: E,
        data: &CreateDriver,
        driver_id: Uuid,
        user_id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let is_self = data.is_self.unwrap_or(false);
        sqlx::query_as::<_, Driver>(&format!(
            "INSERT INTO drivers (id, user_id, name, is_self)
             VALUES ($1, $2, $3, $4)
             RETURNING {DRIVER_COLUMNS}"
        ))
        .bind(driver_id)
        .bind(user_id)
        .bind(&data.name)
        .bind(is_self)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id_for_user(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Driver>(&format!(
            "SELECT {DRIVER_COLUMNS} FROM drivers WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Driver>(&format!(
            "SELECT {DRIVER_COLUMNS} FROM drivers WHERE user_id = $1 ORDER BY rowid ASC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM drivers WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(executor)
            .await
    }

    /// Oldest driver on the account, by insertion order.
    pub async fn first_for_user(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Driver>(&format!(
            "SELECT {DRIVER_COLUMNS} FROM drivers WHERE user_id = $1 ORDER BY rowid ASC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// First driver flagged `is_self`, by insertion order.
    pub async fn find_self_for_user(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Driver>(&format!(
            "SELECT {DRIVER_COLUMNS} FROM drivers
             WHERE user_id = $1 AND is_self = 1
             ORDER BY rowid ASC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid, user_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM drivers WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
