use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Vehicle {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateVehicle {
    pub name: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub is_primary: Option<bool>,
}

const VEHICLE_COLUMNS: &str = "id, user_id, name, make, model, is_primary, created_at, updated_at";

impl Vehicle {
    pub async fn create<'e, E>(
        executor: E,
        data: &CreateVehicle,
        vehicle_id: Uuid,
        user_id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let is_primary = data.is_primary.unwrap_or(false);
        sqlx::query_as::<_, Vehicle>(&format!(
            "INSERT INTO vehicles (id, user_id, name, make, model, is_primary)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {VEHICLE_COLUMNS}"
        ))
        .bind(vehicle_id)
        .bind(user_id)
        .bind(&data.name)
        .bind(&data.make)
        .bind(&data.model)
        .bind(is_primary)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id_for_user(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Vehicle>(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Vehicle>(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE user_id = $1 ORDER BY rowid ASC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vehicles WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(executor)
            .await
    }

    pub async fn first_for_user(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Vehicle>(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE user_id = $1 ORDER BY rowid ASC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// First vehicle flagged `is_primary`, by insertion order.
    pub async fn find_primary_for_user(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Vehicle>(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles
             WHERE user_id = $1 AND is_primary = 1
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
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
