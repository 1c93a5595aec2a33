use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ExpenseType {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateExpenseType {
    pub name: String,
}

const EXPENSE_TYPE_COLUMNS: &str = "id, user_id, name, created_at, updated_at";

impl ExpenseType {
    pub async fn create<'e, E>(
        executor: E,
        data: &CreateExpenseType,
        expense_type_id: Uuid,
        user_id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, ExpenseType>(&format!(
            "INSERT INTO expense_types (id, user_id, name) VALUES ($1, $2, $3)
             RETURNING {EXPENSE_TYPE_COLUMNS}"
        ))
        .bind(expense_type_id)
        .bind(user_id)
        .bind(&data.name)
        .fetch_one(executor)
        .await
    }

    pub async fn find_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ExpenseType>(&format!(
            "SELECT {EXPENSE_TYPE_COLUMNS} FROM expense_types WHERE user_id = $1 ORDER BY rowid ASC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM expense_types WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(executor)
            .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid, user_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM expense_types WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
