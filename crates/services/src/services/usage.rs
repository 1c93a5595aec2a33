//! Read-only "limit reached" checks and the account usage summary.

use chrono::{DateTime, Utc};
use db::models::{
    budget::Budget, driver::Driver, expense_type::ExpenseType, goal::Goal,
    payment_method::PaymentMethod, platform::Platform, user::User, vehicle::Vehicle,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::plan::{self, LimitedResource, at_limit};

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unauthorized")]
    Unauthorized,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
pub struct ResourceUsage {
    pub used: i64,
    pub limit: i64,
}

impl ResourceUsage {
    pub fn at_limit(&self) -> bool {
        at_limit(self.used, self.limit)
    }
}

/// Per-kind used/limit pairs for the account page.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PlanUsageSummary {
    pub plan: db::models::user::PlanTier,
    pub drivers: ResourceUsage,
    pub vehicles: ResourceUsage,
    pub platforms: ResourceUsage,
    pub expense_types: ResourceUsage,
    pub payment_methods: ResourceUsage,
    pub budgets: ResourceUsage,
    pub goals: ResourceUsage,
    pub exports: ResourceUsage,
    pub advanced_reports: bool,
    pub partner_offers: bool,
}

pub struct UsageService;

impl UsageService {
    async fn load_user(pool: &SqlitePool, user_id: Uuid) -> Result<User, UsageError> {
        User::find_by_id(pool, user_id)
            .await?
            .ok_or(UsageError::Unauthorized)
    }

    /// Count the export window as the user would experience it: a lapsed (or
    /// never-started) window reads as zero no matter what the stored counter
    /// says.
    pub fn effective_export_count(user: &User, now: DateTime<Utc>) -> i64 {
        match user.export_count_reset_at {
            Some(reset_at) if reset_at > now => user.monthly_export_count,
            _ => 0,
        }
    }

    pub async fn limit_reached(
        pool: &SqlitePool,
        user_id: Uuid,
        resource: LimitedResource,
    ) -> Result<bool, UsageError> {
        let user = Self::load_user(pool, user_id).await?;
        let limit = resource.limit_for(plan::limits(user.plan));

        let used = match resource {
            LimitedResource::Driver => Driver::count_for_user(pool, user_id).await?,
            LimitedResource::Vehicle => Vehicle::count_for_user(pool, user_id).await?,
            LimitedResource::Platform => Platform::count_for_user(pool, user_id).await?,
            LimitedResource::ExpenseType => ExpenseType::count_for_user(pool, user_id).await?,
            LimitedResource::PaymentMethod => {
                PaymentMethod::count_for_user(pool, user_id).await?
            }
            LimitedResource::Budget => Budget::count_for_user(pool, user_id).await?,
            LimitedResource::Goal => Goal::count_for_user(pool, user_id).await?,
            LimitedResource::Export => Self::effective_export_count(&user, Utc::now()),
        };

        Ok(at_limit(used, limit))
    }

    pub async fn driver_limit_reached(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<bool, UsageError> {
        Self::limit_reached(pool, user_id, LimitedResource::Driver).await
    }

    pub async fn vehicle_limit_reached(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<bool, UsageError> {
        Self::limit_reached(pool, user_id, LimitedResource::Vehicle).await
    }

    pub async fn export_limit_reached(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<bool, UsageError> {
        Self::limit_reached(pool, user_id, LimitedResource::Export).await
    }

    pub async fn usage_summary(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<PlanUsageSummary, UsageError> {
        let user = Self::load_user(pool, user_id).await?;
        let limits = plan::limits(user.plan);

        let summary = PlanUsageSummary {
            plan: user.plan,
            drivers: ResourceUsage {
                used: Driver::count_for_user(pool, user_id).await?,
                limit: limits.max_drivers,
            },
            vehicles: ResourceUsage {
                used: Vehicle::count_for_user(pool, user_id).await?,
                limit: limits.max_vehicles,
            },
            platforms: ResourceUsage {
                used: Platform::count_for_user(pool, user_id).await?,
                limit: limits.max_platforms,
            },
            expense_types: ResourceUsage {
                used: ExpenseType::count_for_user(pool, user_id).await?,
                limit: limits.max_expense_types,
            },
            payment_methods: ResourceUsage {
                used: PaymentMethod::count_for_user(pool, user_id).await?,
                limit: limits.max_payment_methods,
            },
            budgets: ResourceUsage {
                used: Budget::count_for_user(pool, user_id).await?,
                limit: limits.max_budgets,
            },
            goals: ResourceUsage {
                used: Goal::count_for_user(pool, user_id).await?,
                limit: limits.max_goals,
            },
            exports: ResourceUsage {
                used: Self::effective_export_count(&user, Utc::now()),
                limit: limits.monthly_exports,
            },
            advanced_reports: limits.advanced_reports,
            partner_offers: limits.partner_offers,
        };

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use db::{
        DBService,
        models::{
            driver::CreateDriver,
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
    async fn unknown_user_is_unauthorized() {
        let db = DBService::new_in_memory().await.unwrap();
        let err = UsageService::driver_limit_reached(&db.pool, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, UsageError::Unauthorized));
    }

    #[tokio::test]
    async fn simple_plan_driver_limit_boundary() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db, PlanTier::Simple).await;

        for i in 0..2 {
            Driver::create(
                &db.pool,
                &CreateDriver {
                    name: format!("Driver {i}"),
                    is_self: None,
                },
                Uuid::new_v4(),
                user_id,
            )
            .await
            .unwrap();
        }
        assert!(
            !UsageService::driver_limit_reached(&db.pool, user_id)
                .await
                .unwrap()
        );

        Driver::create(
            &db.pool,
            &CreateDriver {
                name: "Driver 3".into(),
                is_self: None,
            },
            Uuid::new_v4(),
            user_id,
        )
        .await
        .unwrap();
        assert!(
            UsageService::driver_limit_reached(&db.pool, user_id)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn pro_plan_never_reaches_driver_limit() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db, PlanTier::Pro).await;

        for i in 0..25 {
            Driver::create(
                &db.pool,
                &CreateDriver {
                    name: format!("Driver {i}"),
                    is_self: None,
                },
                Uuid::new_v4(),
                user_id,
            )
            .await
            .unwrap();
        }
        assert!(
            !UsageService::driver_limit_reached(&db.pool, user_id)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn lapsed_export_window_reads_as_zero() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db, PlanTier::Free).await;
        let now = Utc::now();

        // Window expired an hour ago with the counter pinned at the cap.
        User::set_export_window(&db.pool, user_id, 99, now - Duration::hours(1))
            .await
            .unwrap();

        let user = User::find_by_id(&db.pool, user_id).await.unwrap().unwrap();
        assert_eq!(UsageService::effective_export_count(&user, now), 0);
        assert!(
            !UsageService::export_limit_reached(&db.pool, user_id)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn active_export_window_counts_stored_value() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db, PlanTier::Free).await;
        let now = Utc::now();

        User::set_export_window(&db.pool, user_id, 3, now + Duration::days(10))
            .await
            .unwrap();

        // Free allows 3 exports per month, so a stored count of 3 is at limit.
        assert!(
            UsageService::export_limit_reached(&db.pool, user_id)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn summary_reports_used_and_limits() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db, PlanTier::Simple).await;
        Driver::create(
            &db.pool,
            &CreateDriver {
                name: "Me".into(),
                is_self: Some(true),
            },
            Uuid::new_v4(),
            user_id,
        )
        .await
        .unwrap();

        let summary = UsageService::usage_summary(&db.pool, user_id).await.unwrap();
        assert_eq!(summary.plan, PlanTier::Simple);
        assert_eq!(summary.drivers.used, 1);
        assert_eq!(summary.drivers.limit, 3);
        assert!(!summary.drivers.at_limit());
        assert!(summary.advanced_reports);
        assert!(!summary.partner_offers);
    }
}
