//! CSV exports of activity records, metered against the plan's monthly quota.

use chrono::{DateTime, NaiveDate, Utc};
use db::models::{expense::Expense, revenue::Revenue, user::User};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use utils::time::start_of_next_month;
use uuid::Uuid;

use super::plan::{self, LimitedResource, at_limit};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    LimitExceeded(String),
    #[error("csv error: {0}")]
    Csv(String),
}

pub struct ExportService;

impl ExportService {
    /// Consume one export from the monthly quota. The re-check and the
    /// counter write happen in a single transaction, so two concurrent
    /// exports cannot both pass the check before either one records itself.
    /// Returns the count now consumed in the active window.
    pub async fn record_export(
        pool: &SqlitePool,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<i64, ExportError> {
        let mut tx = pool.begin().await?;

        let user = User::find_by_id(&mut *tx, user_id)
            .await?
            .ok_or(ExportError::Unauthorized)?;
        let limit = LimitedResource::Export.limit_for(plan::limits(user.plan));

        // A lapsed window counts as zero; the write below starts a new one.
        let active_window = user.export_count_reset_at.filter(|reset| *reset > now);
        let effective = match active_window {
            Some(_) => user.monthly_export_count,
            None => 0,
        };

        if at_limit(effective, limit) {
            return Err(ExportError::LimitExceeded(plan::limit_message(
                user.plan,
                LimitedResource::Export,
                limit,
            )));
        }

        let consumed = effective + 1;
        match active_window {
            Some(reset_at) => {
                User::set_export_window(&mut *tx, user_id, consumed, reset_at).await?;
            }
            None => {
                User::set_export_window(&mut *tx, user_id, consumed, start_of_next_month(now))
                    .await?;
            }
        }

        tx.commit().await?;
        info!(user_id = %user_id, consumed = consumed, "export recorded");
        Ok(consumed)
    }

    /// Render all activity in `[since, until]` as a CSV document.
    pub async fn activity_csv(
        pool: &SqlitePool,
        user_id: Uuid,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<String, ExportError> {
        let revenues = Revenue::find_in_range(pool, user_id, since, until).await?;
        let expenses = Expense::find_in_range(pool, user_id, since, until).await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(["kind", "date", "amount_cents", "note"])
            .map_err(|e| ExportError::Csv(e.to_string()))?;

        for revenue in &revenues {
            writer
                .write_record([
                    "revenue",
                    &revenue.occurred_on.to_string(),
                    &revenue.amount_cents.to_string(),
                    revenue.note.as_deref().unwrap_or(""),
                ])
                .map_err(|e| ExportError::Csv(e.to_string()))?;
        }
        for expense in &expenses {
            writer
                .write_record([
                    "expense",
                    &expense.occurred_on.to_string(),
                    &expense.amount_cents.to_string(),
                    expense.note.as_deref().unwrap_or(""),
                ])
                .map_err(|e| ExportError::Csv(e.to_string()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ExportError::Csv(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ExportError::Csv(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use db::{
        DBService,
        models::{
            revenue::CreateRevenue,
            user::{CreateUser, PlanTier},
        },
    };

    use super::*;

    async fn seed_user(db: &DBService, plan: PlanTier) -> Uuid {
        let user_id = Uuid::new_v4();
        User::create(
            &db.pool,
            &CreateUser {
                email: format!("{user_id}@example.com"),
                display_name: None,
                plan: Some(plan),
            },
            user_id,
        )
        .await
        .unwrap();
        user_id
    }

    #[tokio::test]
    async fn quota_consumed_up_to_limit_then_rejected() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db, PlanTier::Free).await;
        let now = Utc::now();

        // Free allows 3 exports per month.
        for expected in 1..=3 {
            let consumed = ExportService::record_export(&db.pool, user_id, now)
                .await
                .unwrap();
            assert_eq!(consumed, expected);
        }

        let err = ExportService::record_export(&db.pool, user_id, now)
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::LimitExceeded(_)));

        let user = User::find_by_id(&db.pool, user_id).await.unwrap().unwrap();
        assert_eq!(user.monthly_export_count, 3);
    }

    #[tokio::test]
    async fn lapsed_window_restarts_at_one() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db, PlanTier::Free).await;
        let now = Utc::now();

        User::set_export_window(&db.pool, user_id, 3, now - Duration::days(5))
            .await
            .unwrap();

        let consumed = ExportService::record_export(&db.pool, user_id, now)
            .await
            .unwrap();
        assert_eq!(consumed, 1);

        let user = User::find_by_id(&db.pool, user_id).await.unwrap().unwrap();
        assert_eq!(user.monthly_export_count, 1);
        assert_eq!(
            user.export_count_reset_at,
            Some(start_of_next_month(now))
        );
    }

    #[tokio::test]
    async fn unlimited_plan_is_never_metered_out() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db, PlanTier::Pro).await;
        let now = Utc::now();

        for _ in 0..30 {
            ExportService::record_export(&db.pool, user_id, now)
                .await
                .unwrap();
        }
        let user = User::find_by_id(&db.pool, user_id).await.unwrap().unwrap();
        assert_eq!(user.monthly_export_count, 30);
    }

    #[tokio::test]
    async fn csv_lists_activity_in_range() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db, PlanTier::Simple).await;
        let today = Utc::now().date_naive();

        Revenue::create(
            &db.pool,
            &CreateRevenue {
                platform_id: None,
                driver_id: None,
                vehicle_id: None,
                payment_method_id: None,
                amount_cents: 12_345,
                occurred_on: today,
                note: Some("friday night".into()),
            },
            Uuid::new_v4(),
            user_id,
        )
        .await
        .unwrap();

        let csv = ExportService::activity_csv(
            &db.pool,
            user_id,
            today - chrono::Days::new(7),
            today,
        )
        .await
        .unwrap();

        assert!(csv.starts_with("kind,date,amount_cents,note"));
        assert!(csv.contains("12345"));
        assert!(csv.contains("friday night"));
    }
}
