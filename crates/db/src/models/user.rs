use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Subscription tier. Limits for each tier live in `services::plan`; plan
/// changes arrive through the billing provider's webhook.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
    Default,
)]
#[sqlx(type_name = "plan_tier", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Simple,
    Pro,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub plan: PlanTier,
    pub monthly_export_count: i64,
    pub export_count_reset_at: Option<DateTime<Utc>>,
    pub onboarded_at: Option<DateTime<Utc>>,
    pub last_digest_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateUser {
    pub email: String,
    pub display_name: Option<String>,
    pub plan: Option<PlanTier>,
}

const USER_COLUMNS: &str = "id, email, display_name, plan, monthly_export_count, \
     export_count_reset_at, onboarded_at, last_digest_sent_at, created_at, updated_at";

impl User {
    pub fn onboarded(&self) -> bool {
        self.onboarded_at.is_some()
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateUser,
        user_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let plan = data.plan.unwrap_or_default();
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, display_name, plan)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&data.email)
        .bind(&data.display_name)
        .bind(plan)
        .fetch_one(pool)
        .await
    }

    pub async fn set_plan(pool: &SqlitePool, id: Uuid, plan: PlanTier) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET plan = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(id)
        .bind(plan)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn mark_onboarded<'e, E>(
        executor: E,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE users SET onboarded_at = $2, updated_at = datetime('now', 'subsec')
             WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Overwrite the export window. Callers decide whether this is a fresh
    /// window (count 1, next-month reset) or an increment of the current one.
    pub async fn set_export_window<'e, E>(
        executor: E,
        id: Uuid,
        count: i64,
        reset_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE users
             SET monthly_export_count = $2,
                 export_count_reset_at = $3,
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1",
        )
        .bind(id)
        .bind(count)
        .bind(reset_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn set_last_digest_sent(
        pool: &SqlitePool,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET last_digest_sent_at = $2, updated_at = datetime('now', 'subsec')
             WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(())
    }
}
