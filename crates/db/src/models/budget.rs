use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A monthly spending envelope. Every row counts against the plan's budget
/// limit; `is_active` only controls display and reporting.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub amount_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateBudget {
    pub name: String,
    pub amount_cents: i64,
}

const BUDGET_COLUMNS: &str = "id, user_id, name, amount_cents, is_active, created_at, updated_at";

impl Budget {
    pub async fn create<'e, E>(
        executor: E,
        data: &CreateBudget,
        budget_id: Uuid,
        user_id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Budget>(&format!(
            "INSERT INTO budgets (id, user_id, name, amount_cents) VALUES ($1, $2, $3, $4)
             RETURNING {BUDGET_COLUMNS}"
        ))
        .bind(budget_id)
        .bind(user_id)
        .bind(&data.name)
        .bind(data.amount_cents)
        .fetch_one(executor)
        .await
    }

    pub async fn find_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Budget>(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budgets WHERE user_id = $1 ORDER BY rowid ASC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM budgets WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(executor)
            .await
    }

    pub async fn set_active(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
        is_active: bool,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE budgets SET is_active = $3, updated_at = datetime('now', 'subsec')
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(is_active)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid, user_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM budgets WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
