use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expense_type_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub payment_method_id: Option<Uuid>,
    pub amount_cents: i64,
    pub occurred_on: NaiveDate,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateExpense {
    pub expense_type_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub payment_method_id: Option<Uuid>,
    pub amount_cents: i64,
    pub occurred_on: NaiveDate,
    pub note: Option<String>,
}

const EXPENSE_COLUMNS: &str = "id, user_id, expense_type_id, driver_id, vehicle_id, \
     payment_method_id, amount_cents, occurred_on, note, created_at, updated_at";

impl Expense {
    pub async fn create<'e, E>(
        executor: E,
        data: &CreateExpense,
        expense_id: Uuid,
        user_id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Expense>(&format!(
            "INSERT INTO expenses
                 (id, user_id, expense_type_id, driver_id, vehicle_id, payment_method_id,
                  amount_cents, occurred_on, note)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {EXPENSE_COLUMNS}"
        ))
        .bind(expense_id)
        .bind(user_id)
        .bind(data.expense_type_id)
        .bind(data.driver_id)
        .bind(data.vehicle_id)
        .bind(data.payment_method_id)
        .bind(data.amount_cents)
        .bind(data.occurred_on)
        .bind(&data.note)
        .fetch_one(executor)
        .await
    }

    pub async fn find_for_user(
        pool: &SqlitePool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Expense>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses
             WHERE user_id = $1
             ORDER BY occurred_on DESC, rowid DESC
             LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn find_in_range(
        pool: &SqlitePool,
        user_id: Uuid,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Expense>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses
             WHERE user_id = $1 AND occurred_on >= $2 AND occurred_on <= $3
             ORDER BY occurred_on ASC, rowid ASC"
        ))
        .bind(user_id)
        .bind(since)
        .bind(until)
        .fetch_all(pool)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid, user_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
