//! Per-user catalog mutations. Every limit-bearing create runs its count
//! check and insert inside one transaction so concurrent requests cannot
//! sneak past the plan cap between the check and the write.

use db::models::{
    budget::{Budget, CreateBudget},
    driver::{CreateDriver, Driver},
    expense::{CreateExpense, Expense},
    expense_type::{CreateExpenseType, ExpenseType},
    goal::{CreateGoal, Goal},
    payment_method::{CreatePaymentMethod, PaymentMethod},
    platform::{CreatePlatform, Platform},
    revenue::{CreateRevenue, Revenue},
    user::User,
    user_preferences::UserPreferences,
    vehicle::{CreateVehicle, Vehicle},
};
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::{
    defaults::{CacheTag, DefaultsCache},
    plan::{self, LimitedResource, at_limit},
};

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    LimitExceeded(String),
    #[error("not found")]
    NotFound,
}

/// Loads the user inside the transaction and rejects the create when the
/// existing row count has consumed the plan's allowance.
async fn check_capacity(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: Uuid,
    resource: LimitedResource,
    current: i64,
) -> Result<(), ResourceError> {
    let user = User::find_by_id(&mut **tx, user_id)
        .await?
        .ok_or(ResourceError::Unauthorized)?;
    let limit = resource.limit_for(plan::limits(user.plan));
    if at_limit(current, limit) {
        return Err(ResourceError::LimitExceeded(plan::limit_message(
            user.plan, resource, limit,
        )));
    }
    Ok(())
}

pub struct ResourceService;

impl ResourceService {
    pub async fn create_driver(
        pool: &SqlitePool,
        cache: &DefaultsCache,
        user_id: Uuid,
        data: CreateDriver,
    ) -> Result<Driver, ResourceError> {
        let mut tx = pool.begin().await?;
        let current = Driver::count_for_user(&mut *tx, user_id).await?;
        check_capacity(&mut tx, user_id, LimitedResource::Driver, current).await?;
        let driver = Driver::create(&mut *tx, &data, Uuid::new_v4(), user_id).await?;
        tx.commit().await?;

        info!(user_id = %user_id, driver_id = %driver.id, "driver created");
        cache.invalidate(user_id, &[CacheTag::Drivers]).await;
        Ok(driver)
    }

    pub async fn delete_driver(
        pool: &SqlitePool,
        cache: &DefaultsCache,
        user_id: Uuid,
        driver_id: Uuid,
    ) -> Result<(), ResourceError> {
        let mut tx = pool.begin().await?;
        let deleted = Driver::delete(&mut *tx, driver_id, user_id).await?;
        if deleted == 0 {
            return Err(ResourceError::NotFound);
        }
        UserPreferences::clear_default_driver(&mut *tx, user_id, driver_id).await?;
        tx.commit().await?;

        cache
            .invalidate(user_id, &[CacheTag::Drivers, CacheTag::Preferences])
            .await;
        Ok(())
    }

    pub async fn create_vehicle(
        pool: &SqlitePool,
        cache: &DefaultsCache,
        user_id: Uuid,
        data: CreateVehicle,
    ) -> Result<Vehicle, ResourceError> {
        let mut tx = pool.begin().await?;
        let current = Vehicle::count_for_user(&mut *tx, user_id).await?;
        check_capacity(&mut tx, user_id, LimitedResource::Vehicle, current).await?;
        let vehicle = Vehicle::create(&mut *tx, &data, Uuid::new_v4(), user_id).await?;
        tx.commit().await?;

        info!(user_id = %user_id, vehicle_id = %vehicle.id, "vehicle created");
        cache.invalidate(user_id, &[CacheTag::Vehicles]).await;
        Ok(vehicle)
    }

    pub async fn delete_vehicle(
        pool: &SqlitePool,
        cache: &DefaultsCache,
        user_id: Uuid,
        vehicle_id: Uuid,
    ) -> Result<(), ResourceError> {
        let mut tx = pool.begin().await?;
        let deleted = Vehicle::delete(&mut *tx, vehicle_id, user_id).await?;
        if deleted == 0 {
            return Err(ResourceError::NotFound);
        }
        UserPreferences::clear_default_vehicle(&mut *tx, user_id, vehicle_id).await?;
        tx.commit().await?;

        cache
            .invalidate(user_id, &[CacheTag::Vehicles, CacheTag::Preferences])
            .await;
        Ok(())
    }

    pub async fn create_platform(
        pool: &SqlitePool,
        cache: &DefaultsCache,
        user_id: Uuid,
        data: CreatePlatform,
    ) -> Result<Platform, ResourceError> {
        let mut tx = pool.begin().await?;
        let current = Platform::count_for_user(&mut *tx, user_id).await?;
        check_capacity(&mut tx, user_id, LimitedResource::Platform, current).await?;
        let platform = Platform::create(&mut *tx, &data, Uuid::new_v4(), user_id).await?;
        tx.commit().await?;

        cache.invalidate(user_id, &[CacheTag::Platforms]).await;
        Ok(platform)
    }

    pub async fn delete_platform(
        pool: &SqlitePool,
        cache: &DefaultsCache,
        user_id: Uuid,
        platform_id: Uuid,
    ) -> Result<(), ResourceError> {
        let deleted = Platform::delete(pool, platform_id, user_id).await?;
        if deleted == 0 {
            return Err(ResourceError::NotFound);
        }
        cache.invalidate(user_id, &[CacheTag::Platforms]).await;
        Ok(())
    }

    pub async fn create_expense_type(
        pool: &SqlitePool,
        cache: &DefaultsCache,
        user_id: Uuid,
        data: CreateExpenseType,
    ) -> Result<ExpenseType, ResourceError> {
        let mut tx = pool.begin().await?;
        let current = ExpenseType::count_for_user(&mut *tx, user_id).await?;
        check_capacity(&mut tx, user_id, LimitedResource::ExpenseType, current).await?;
        let expense_type = ExpenseType::create(&mut *tx, &data, Uuid::new_v4(), user_id).await?;
        tx.commit().await?;

        cache.invalidate(user_id, &[CacheTag::ExpenseTypes]).await;
        Ok(expense_type)
    }

    pub async fn delete_expense_type(
        pool: &SqlitePool,
        cache: &DefaultsCache,
        user_id: Uuid,
        expense_type_id: Uuid,
    ) -> Result<(), ResourceError> {
        let deleted = ExpenseType::delete(pool, expense_type_id, user_id).await?;
        if deleted == 0 {
            return Err(ResourceError::NotFound);
        }
        cache.invalidate(user_id, &[CacheTag::ExpenseTypes]).await;
        Ok(())
    }

    pub async fn create_payment_method(
        pool: &SqlitePool,
        cache: &DefaultsCache,
        user_id: Uuid,
        data: CreatePaymentMethod,
    ) -> Result<PaymentMethod, ResourceError> {
        let mut tx = pool.begin().await?;
        let current = PaymentMethod::count_for_user(&mut *tx, user_id).await?;
        check_capacity(&mut tx, user_id, LimitedResource::PaymentMethod, current).await?;
        let payment_method =
            PaymentMethod::create(&mut *tx, &data, Uuid::new_v4(), user_id).await?;
        tx.commit().await?;

        cache.invalidate(user_id, &[CacheTag::PaymentMethods]).await;
        Ok(payment_method)
    }

    pub async fn delete_payment_method(
        pool: &SqlitePool,
        cache: &DefaultsCache,
        user_id: Uuid,
        payment_method_id: Uuid,
    ) -> Result<(), ResourceError> {
        let deleted = PaymentMethod::delete(pool, payment_method_id, user_id).await?;
        if deleted == 0 {
            return Err(ResourceError::NotFound);
        }
        cache.invalidate(user_id, &[CacheTag::PaymentMethods]).await;
        Ok(())
    }

    pub async fn create_budget(
        pool: &SqlitePool,
        user_id: Uuid,
        data: CreateBudget,
    ) -> Result<Budget, ResourceError> {
        let mut tx = pool.begin().await?;
        let current = Budget::count_for_user(&mut *tx, user_id).await?;
        check_capacity(&mut tx, user_id, LimitedResource::Budget, current).await?;
        let budget = Budget::create(&mut *tx, &data, Uuid::new_v4(), user_id).await?;
        tx.commit().await?;
        Ok(budget)
    }

    pub async fn create_goal(
        pool: &SqlitePool,
        user_id: Uuid,
        data: CreateGoal,
    ) -> Result<Goal, ResourceError> {
        let mut tx = pool.begin().await?;
        let current = Goal::count_for_user(&mut *tx, user_id).await?;
        check_capacity(&mut tx, user_id, LimitedResource::Goal, current).await?;
        let goal = Goal::create(&mut *tx, &data, Uuid::new_v4(), user_id).await?;
        tx.commit().await?;
        Ok(goal)
    }

    /// Activity records have no cardinality limit; the write still funnels
    /// through here so the defaults cache sees it.
    pub async fn create_revenue(
        pool: &SqlitePool,
        cache: &DefaultsCache,
        user_id: Uuid,
        data: CreateRevenue,
    ) -> Result<Revenue, ResourceError> {
        let user = User::find_by_id(pool, user_id)
            .await?
            .ok_or(ResourceError::Unauthorized)?;
        let revenue = Revenue::create(pool, &data, Uuid::new_v4(), user.id).await?;
        cache.invalidate(user_id, &[CacheTag::Activity]).await;
        Ok(revenue)
    }

    pub async fn create_expense(
        pool: &SqlitePool,
        cache: &DefaultsCache,
        user_id: Uuid,
        data: CreateExpense,
    ) -> Result<Expense, ResourceError> {
        let user = User::find_by_id(pool, user_id)
            .await?
            .ok_or(ResourceError::Unauthorized)?;
        let expense = Expense::create(pool, &data, Uuid::new_v4(), user.id).await?;
        cache.invalidate(user_id, &[CacheTag::Activity]).await;
        Ok(expense)
    }

    pub async fn delete_revenue(
        pool: &SqlitePool,
        cache: &DefaultsCache,
        user_id: Uuid,
        revenue_id: Uuid,
    ) -> Result<(), ResourceError> {
        let deleted = Revenue::delete(pool, revenue_id, user_id).await?;
        if deleted == 0 {
            return Err(ResourceError::NotFound);
        }
        cache.invalidate(user_id, &[CacheTag::Activity]).await;
        Ok(())
    }

    pub async fn delete_expense(
        pool: &SqlitePool,
        cache: &DefaultsCache,
        user_id: Uuid,
        expense_id: Uuid,
    ) -> Result<(), ResourceError> {
        let deleted = Expense::delete(pool, expense_id, user_id).await?;
        if deleted == 0 {
            return Err(ResourceError::NotFound);
        }
        cache.invalidate(user_id, &[CacheTag::Activity]).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::user::{CreateUser, PlanTier},
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

    fn driver(name: &str) -> CreateDriver {
        CreateDriver {
            name: name.into(),
            is_self: None,
        }
    }

    #[tokio::test]
    async fn create_up_to_limit_then_reject() {
        let db = DBService::new_in_memory().await.unwrap();
        let cache = DefaultsCache::new();
        let user_id = seed_user(&db, PlanTier::Simple).await;

        for i in 0..3 {
            ResourceService::create_driver(&db.pool, &cache, user_id, driver(&format!("D{i}")))
                .await
                .unwrap();
        }

        let err = ResourceService::create_driver(&db.pool, &cache, user_id, driver("D3"))
            .await
            .unwrap_err();
        match err {
            ResourceError::LimitExceeded(msg) => {
                assert!(msg.contains('3'));
                assert!(msg.contains("drivers"));
            }
            other => panic!("expected LimitExceeded, got {other:?}"),
        }

        // The rejected create left nothing behind.
        assert_eq!(Driver::count_for_user(&db.pool, user_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn unlimited_tier_accepts_many() {
        let db = DBService::new_in_memory().await.unwrap();
        let cache = DefaultsCache::new();
        let user_id = seed_user(&db, PlanTier::Pro).await;

        for i in 0..40 {
            ResourceService::create_driver(&db.pool, &cache, user_id, driver(&format!("D{i}")))
                .await
                .unwrap();
        }
        assert_eq!(Driver::count_for_user(&db.pool, user_id).await.unwrap(), 40);
    }

    #[tokio::test]
    async fn delete_clears_dangling_default_pointer() {
        let db = DBService::new_in_memory().await.unwrap();
        let cache = DefaultsCache::new();
        let user_id = seed_user(&db, PlanTier::Simple).await;

        let created = ResourceService::create_driver(&db.pool, &cache, user_id, driver("Me"))
            .await
            .unwrap();
        UserPreferences::set_default_driver(&db.pool, user_id, Some(created.id))
            .await
            .unwrap();

        ResourceService::delete_driver(&db.pool, &cache, user_id, created.id)
            .await
            .unwrap();

        let prefs = UserPreferences::find_by_user_id(&db.pool, user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(prefs.default_driver_id, None);
    }

    #[tokio::test]
    async fn delete_foreign_row_reads_as_not_found() {
        let db = DBService::new_in_memory().await.unwrap();
        let cache = DefaultsCache::new();
        let owner = seed_user(&db, PlanTier::Simple).await;
        let stranger = seed_user(&db, PlanTier::Simple).await;

        let created = ResourceService::create_driver(&db.pool, &cache, owner, driver("Mine"))
            .await
            .unwrap();

        let err = ResourceService::delete_driver(&db.pool, &cache, stranger, created.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::NotFound));
    }
}
