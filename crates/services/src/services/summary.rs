//! Aggregated revenue/expense totals for reports and the monthly digest.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unauthorized")]
    Unauthorized,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PlatformTotal {
    pub platform_id: Uuid,
    pub name: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ActivitySummary {
    pub since: NaiveDate,
    pub until: NaiveDate,
    pub revenue_cents: i64,
    pub expense_cents: i64,
    pub net_cents: i64,
    pub revenue_by_platform: Vec<PlatformTotal>,
}

pub struct SummaryService;

impl SummaryService {
    /// Totals over `[since, until]`, both bounds inclusive.
    pub async fn activity_summary(
        pool: &SqlitePool,
        user_id: Uuid,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<ActivitySummary, SummaryError> {
        let revenue_cents = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM revenues
             WHERE user_id = $1 AND occurred_on >= $2 AND occurred_on <= $3",
        )
        .bind(user_id)
        .bind(since)
        .bind(until)
        .fetch_one(pool)
        .await?;

        let expense_cents = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM expenses
             WHERE user_id = $1 AND occurred_on >= $2 AND occurred_on <= $3",
        )
        .bind(user_id)
        .bind(since)
        .bind(until)
        .fetch_one(pool)
        .await?;

        let revenue_by_platform = sqlx::query_as::<_, (Uuid, String, i64)>(
            "SELECT p.id, p.name, SUM(r.amount_cents) AS total
             FROM revenues r
             JOIN platforms p ON p.id = r.platform_id
             WHERE r.user_id = $1 AND r.occurred_on >= $2 AND r.occurred_on <= $3
             GROUP BY p.id, p.name
             ORDER BY total DESC",
        )
        .bind(user_id)
        .bind(since)
        .bind(until)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|(platform_id, name, amount_cents)| PlatformTotal {
            platform_id,
            name,
            amount_cents,
        })
        .collect();

        Ok(ActivitySummary {
            since,
            until,
            revenue_cents,
            expense_cents,
            net_cents: revenue_cents - expense_cents,
            revenue_by_platform,
        })
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{
            expense::{CreateExpense, Expense},
            platform::{CreatePlatform, Platform},
            revenue::{CreateRevenue, Revenue},
            user::{CreateUser, PlanTier, User},
        },
    };

    use super::*;

    #[tokio::test]
    async fn totals_and_platform_ranking() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = Uuid::new_v4();
        User::create(
            &db.pool,
            &CreateUser {
                email: "driver@example.com".into(),
                display_name: None,
                plan: Some(PlanTier::Simple),
            },
            user_id,
        )
        .await
        .unwrap();

        let uber = Uuid::new_v4();
        Platform::create(&db.pool, &CreatePlatform { name: "Uber".into() }, uber, user_id)
            .await
            .unwrap();
        let lyft = Uuid::new_v4();
        Platform::create(&db.pool, &CreatePlatform { name: "Lyft".into() }, lyft, user_id)
            .await
            .unwrap();

        let day = NaiveDate::from_ymd_opt(2026, 7, 15).unwrap();
        for (platform, amount) in [(uber, 10_000), (uber, 5_000), (lyft, 7_000)] {
            Revenue::create(
                &db.pool,
                &CreateRevenue {
                    platform_id: Some(platform),
                    driver_id: None,
                    vehicle_id: None,
                    payment_method_id: None,
                    amount_cents: amount,
                    occurred_on: day,
                    note: None,
                },
                Uuid::new_v4(),
                user_id,
            )
            .await
            .unwrap();
        }
        Expense::create(
            &db.pool,
            &CreateExpense {
                expense_type_id: None,
                driver_id: None,
                vehicle_id: None,
                payment_method_id: None,
                amount_cents: 4_000,
                occurred_on: day,
                note: None,
            },
            Uuid::new_v4(),
            user_id,
        )
        .await
        .unwrap();

        let since = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let until = NaiveDate::from_ymd_opt(2026, 7, 31).unwrap();
        let summary = SummaryService::activity_summary(&db.pool, user_id, since, until)
            .await
            .unwrap();

        assert_eq!(summary.revenue_cents, 22_000);
        assert_eq!(summary.expense_cents, 4_000);
        assert_eq!(summary.net_cents, 18_000);
        assert_eq!(summary.revenue_by_platform.len(), 2);
        assert_eq!(summary.revenue_by_platform[0].name, "Uber");
        assert_eq!(summary.revenue_by_platform[0].amount_cents, 15_000);
    }
}
