use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
    Default,
)]
#[sqlx(type_name = "distance_unit", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DistanceUnit {
    Kilometers,
    #[default]
    Miles,
}

/// Per-user display settings plus the two default pointers. The pointers are
/// weak references used only for entry-form pre-fill; rows they name may be
/// deleted out from under them.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct UserPreferences {
    pub user_id: Uuid,
    pub locale: String,
    pub currency: String,
    pub distance_unit: DistanceUnit,
    pub reduce_motion: bool,
    pub high_contrast: bool,
    pub default_driver_id: Option<Uuid>,
    pub default_vehicle_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateUserPreferences {
    pub locale: Option<String>,
    pub currency: Option<String>,
    pub distance_unit: Option<DistanceUnit>,
    pub reduce_motion: Option<bool>,
    pub high_contrast: Option<bool>,
    pub default_driver_id: Option<Uuid>,
    pub default_vehicle_id: Option<Uuid>,
}

const PREF_COLUMNS: &str = "user_id, locale, currency, distance_unit, reduce_motion, \
     high_contrast, default_driver_id, default_vehicle_id, created_at, updated_at";

impl UserPreferences {
    pub async fn find_by_user_id<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, UserPreferences>(&format!(
            "SELECT {PREF_COLUMNS} FROM user_preferences WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Lazily create the row with defaults on first access.
    pub async fn find_or_create(pool: &SqlitePool, user_id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query("INSERT INTO user_preferences (user_id) VALUES ($1) ON CONFLICT(user_id) DO NOTHING")
            .bind(user_id)
            .execute(pool)
            .await?;

        sqlx::query_as::<_, UserPreferences>(&format!(
            "SELECT {PREF_COLUMNS} FROM user_preferences WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Insert-or-update with the merged settings. Unset fields keep their
    /// current (or default) values.
    pub async fn upsert<'e, E>(
        executor: E,
        user_id: Uuid,
        data: &UpdateUserPreferences,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, UserPreferences>(&format!(
            "INSERT INTO user_preferences
                 (user_id, locale, currency, distance_unit, reduce_motion, high_contrast,
                  default_driver_id, default_vehicle_id)
             VALUES ($1, COALESCE($2, 'en-US'), COALESCE($3, 'USD'), COALESCE($4, 'miles'),
                     COALESCE($5, 0), COALESCE($6, 0), $7, $8)
             ON CONFLICT(user_id) DO UPDATE SET
                 locale = COALESCE($2, locale),
                 currency = COALESCE($3, currency),
                 distance_unit = COALESCE($4, distance_unit),
                 reduce_motion = COALESCE($5, reduce_motion),
                 high_contrast = COALESCE($6, high_contrast),
                 default_driver_id = COALESCE($7, default_driver_id),
                 default_vehicle_id = COALESCE($8, default_vehicle_id),
                 updated_at = datetime('now', 'subsec')
             RETURNING {PREF_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&data.locale)
        .bind(&data.currency)
        .bind(data.distance_unit)
        .bind(data.reduce_motion)
        .bind(data.high_contrast)
        .bind(data.default_driver_id)
        .bind(data.default_vehicle_id)
        .fetch_one(executor)
        .await
    }

    pub async fn set_default_driver(
        pool: &SqlitePool,
        user_id: Uuid,
        driver_id: Option<Uuid>,
    ) -> Result<(), sqlx::Error> {
        Self::find_or_create(pool, user_id).await?;
        sqlx::query(
            "UPDATE user_preferences
             SET default_driver_id = $2, updated_at = datetime('now', 'subsec')
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(driver_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn set_default_vehicle(
        pool: &SqlitePool,
        user_id: Uuid,
        vehicle_id: Option<Uuid>,
    ) -> Result<(), sqlx::Error> {
        Self::find_or_create(pool, user_id).await?;
        sqlx::query(
            "UPDATE user_preferences
             SET default_vehicle_id = $2, updated_at = datetime('now', 'subsec')
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(vehicle_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Clear a default pointer that names the given driver, if it does.
    pub async fn clear_default_driver<'e, E>(
        executor: E,
        user_id: Uuid,
        driver_id: Uuid,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE user_preferences
             SET default_driver_id = NULL, updated_at = datetime('now', 'subsec')
             WHERE user_id = $1 AND default_driver_id = $2",
        )
        .bind(user_id)
        .bind(driver_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn clear_default_vehicle<'e, E>(
        executor: E,
        user_id: Uuid,
        vehicle_id: Uuid,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE user_preferences
             SET default_vehicle_id = NULL, updated_at = datetime('now', 'subsec')
             WHERE user_id = $1 AND default_vehicle_id = $2",
        )
        .bind(user_id)
        .bind(vehicle_id)
        .execute(executor)
        .await?;
        Ok(())
    }
}
