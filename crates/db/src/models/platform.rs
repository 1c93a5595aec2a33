use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// An income platform (Uber, DoorDash, ...) the user drives for.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Platform {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreatePlatform {
    pub name: String,
}

const PLATFORM_COLUMNS: &str = "id, user_id, name, created_at, updated_at";

impl Platform {
    pub async fn create<'e, E>(
        executor: E,
        data: &CreatePlatform,
        platform_id: Uuid,
        user_id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Platform>(&format!(
            "INSERT INTO platforms (id, user_id, name) VALUES ($1, $2, $3)
             RETURNING {PLATFORM_COLUMNS}"
        ))
        .bind(platform_id)
        .bind(user_id)
        .bind(&data.name)
        .fetch_one(executor)
        .await
    }

    pub async fn find_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Platform>(&format!(
            "SELECT {PLATFORM_COLUMNS} FROM platforms WHERE user_id = $1 ORDER BY rowid ASC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM platforms WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(executor)
            .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid, user_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM platforms WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
