//! One-shot guided setup: bulk-creates the user's initial catalog inside a
//! single transaction, derives the default pointers, and hands off to
//! checkout when a plan selection was parked beforehand.

use chrono::Utc;
use db::models::{
    checkout_stash::CheckoutStash,
    driver::{CreateDriver, Driver},
    expense_type::{CreateExpenseType, ExpenseType},
    payment_method::{CreatePaymentMethod, PaymentMethod},
    platform::{CreatePlatform, Platform},
    user::User,
    user_preferences::{UpdateUserPreferences, UserPreferences},
    vehicle::{CreateVehicle, Vehicle},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    billing::{BillingClient, BillingError},
    defaults::{CacheTag, DefaultsCache},
    plan::{self, LimitedResource, is_unlimited},
};

const POST_ONBOARDING_REDIRECT: &str = "/dashboard";

/// Would inserting `batch` more rows on top of `existing` overshoot `limit`?
/// Filling the allowance exactly is allowed.
fn batch_exceeds(existing: i64, batch: usize, limit: i64) -> bool {
    !is_unlimited(limit) && existing + batch as i64 > limit
}

#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unauthorized")]
    Unauthorized,
    #[error("onboarding has already been completed")]
    AlreadyOnboarded,
    #[error("{0}")]
    LimitExceeded(String),
    #[error("billing error: {0}")]
    Billing(#[from] BillingError),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct OnboardingRequest {
    pub platforms: Vec<CreatePlatform>,
    pub drivers: Vec<CreateDriver>,
    pub vehicles: Vec<CreateVehicle>,
    pub expense_types: Vec<CreateExpenseType>,
    pub payment_methods: Vec<CreatePaymentMethod>,
    pub preferences: Option<UpdateUserPreferences>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct OnboardingOutcome {
    pub redirect: String,
    pub checkout_started: bool,
}

pub struct OnboardingService;

impl OnboardingService {
    pub async fn complete(
        pool: &SqlitePool,
        cache: &DefaultsCache,
        billing: &BillingClient,
        user_id: Uuid,
        request: OnboardingRequest,
    ) -> Result<OnboardingOutcome, OnboardingError> {
        let mut tx = pool.begin().await?;

        // Both preconditions are re-read inside the transaction so a
        // concurrent completion cannot slip between check and write.
        let user = User::find_by_id(&mut *tx, user_id)
            .await?
            .ok_or(OnboardingError::Unauthorized)?;
        if user.onboarded() {
            return Err(OnboardingError::AlreadyOnboarded);
        }

        let limits = plan::limits(user.plan);

        let existing_drivers = Driver::count_for_user(&mut *tx, user_id).await?;
        if batch_exceeds(existing_drivers, request.drivers.len(), limits.max_drivers) {
            return Err(OnboardingError::LimitExceeded(plan::limit_message(
                user.plan,
                LimitedResource::Driver,
                limits.max_drivers,
            )));
        }

        let existing_vehicles = Vehicle::count_for_user(&mut *tx, user_id).await?;
        if batch_exceeds(existing_vehicles, request.vehicles.len(), limits.max_vehicles) {
            return Err(OnboardingError::LimitExceeded(plan::limit_message(
                user.plan,
                LimitedResource::Vehicle,
                limits.max_vehicles,
            )));
        }

        for data in &request.platforms {
            Platform::create(&mut *tx, data, Uuid::new_v4(), user_id).await?;
        }

        let mut default_driver_id = None;
        for data in &request.drivers {
            let driver = Driver::create(&mut *tx, data, Uuid::new_v4(), user_id).await?;
            if default_driver_id.is_none() && data.is_self.unwrap_or(false) {
                default_driver_id = Some(driver.id);
            }
        }

        let mut default_vehicle_id = None;
        for data in &request.vehicles {
            let vehicle = Vehicle::create(&mut *tx, data, Uuid::new_v4(), user_id).await?;
            if default_vehicle_id.is_none() && data.is_primary.unwrap_or(false) {
                default_vehicle_id = Some(vehicle.id);
            }
        }

        for data in &request.expense_types {
            ExpenseType::create(&mut *tx, data, Uuid::new_v4(), user_id).await?;
        }
        for data in &request.payment_methods {
            PaymentMethod::create(&mut *tx, data, Uuid::new_v4(), user_id).await?;
        }

        let mut preferences = request.preferences.unwrap_or_default();
        preferences.default_driver_id = default_driver_id;
        preferences.default_vehicle_id = default_vehicle_id;
        UserPreferences::upsert(&mut *tx, user_id, &preferences).await?;

        User::mark_onboarded(&mut *tx, user_id, Utc::now()).await?;

        tx.commit().await?;

        cache
            .invalidate(
                user_id,
                &[
                    CacheTag::Drivers,
                    CacheTag::Vehicles,
                    CacheTag::Platforms,
                    CacheTag::ExpenseTypes,
                    CacheTag::PaymentMethods,
                    CacheTag::Preferences,
                ],
            )
            .await;

        info!(
            user_id = %user_id,
            drivers = request.drivers.len(),
            vehicles = request.vehicles.len(),
            "onboarding completed"
        );

        // A parked plan selection turns the landing redirect into a checkout
        // hand-off. The stash is consumed either way.
        match CheckoutStash::take(pool, user_id, Utc::now()).await? {
            Some(stash) => {
                let session = billing
                    .create_checkout_session(&user.email, stash.plan, stash.billing_interval)
                    .await?;
                Ok(OnboardingOutcome {
                    redirect: session.url,
                    checkout_started: true,
                })
            }
            None => Ok(OnboardingOutcome {
                redirect: POST_ONBOARDING_REDIRECT.to_string(),
                checkout_started: false,
            }),
        }
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

    fn billing_stub() -> BillingClient {
        BillingClient::new("http://127.0.0.1:9".into(), "test-key".into()).unwrap()
    }

    fn request(drivers: Vec<CreateDriver>, vehicles: Vec<CreateVehicle>) -> OnboardingRequest {
        OnboardingRequest {
            platforms: vec![CreatePlatform {
                name: "Uber".into(),
            }],
            drivers,
            vehicles,
            expense_types: vec![CreateExpenseType { name: "Fuel".into() }],
            payment_methods: vec![CreatePaymentMethod { name: "Cash".into() }],
            preferences: None,
        }
    }

    fn driver(name: &str, is_self: bool) -> CreateDriver {
        CreateDriver {
            name: name.into(),
            is_self: Some(is_self),
        }
    }

    fn vehicle(name: &str, is_primary: bool) -> CreateVehicle {
        CreateVehicle {
            name: name.into(),
            make: None,
            model: None,
            is_primary: Some(is_primary),
        }
    }

    #[tokio::test]
    async fn completes_and_derives_defaults_from_flags() {
        let db = DBService::new_in_memory().await.unwrap();
        let cache = DefaultsCache::new();
        let user_id = seed_user(&db, PlanTier::Simple).await;

        let outcome = OnboardingService::complete(
            &db.pool,
            &cache,
            &billing_stub(),
            user_id,
            request(
                vec![driver("Partner", false), driver("Me", true)],
                vec![vehicle("Corolla", true)],
            ),
        )
        .await
        .unwrap();

        assert_eq!(outcome.redirect, "/dashboard");
        assert!(!outcome.checkout_started);

        let user = User::find_by_id(&db.pool, user_id).await.unwrap().unwrap();
        assert!(user.onboarded());

        let prefs = UserPreferences::find_by_user_id(&db.pool, user_id)
            .await
            .unwrap()
            .unwrap();
        let me = Driver::find_self_for_user(&db.pool, user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(prefs.default_driver_id, Some(me.id));
        assert!(prefs.default_vehicle_id.is_some());
    }

    #[tokio::test]
    async fn no_flagged_entries_means_no_defaults() {
        let db = DBService::new_in_memory().await.unwrap();
        let cache = DefaultsCache::new();
        let user_id = seed_user(&db, PlanTier::Simple).await;

        OnboardingService::complete(
            &db.pool,
            &cache,
            &billing_stub(),
            user_id,
            request(vec![driver("Solo", false)], vec![vehicle("Van", false)]),
        )
        .await
        .unwrap();

        let prefs = UserPreferences::find_by_user_id(&db.pool, user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(prefs.default_driver_id, None);
        assert_eq!(prefs.default_vehicle_id, None);
    }

    #[tokio::test]
    async fn second_completion_is_rejected() {
        let db = DBService::new_in_memory().await.unwrap();
        let cache = DefaultsCache::new();
        let user_id = seed_user(&db, PlanTier::Simple).await;

        OnboardingService::complete(
            &db.pool,
            &cache,
            &billing_stub(),
            user_id,
            request(vec![driver("Me", true)], vec![]),
        )
        .await
        .unwrap();

        let err = OnboardingService::complete(
            &db.pool,
            &cache,
            &billing_stub(),
            user_id,
            request(vec![driver("Again", true)], vec![]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, OnboardingError::AlreadyOnboarded));
    }

    #[tokio::test]
    async fn oversized_batch_rolls_back_everything() {
        let db = DBService::new_in_memory().await.unwrap();
        let cache = DefaultsCache::new();
        let user_id = seed_user(&db, PlanTier::Free).await;

        // Free allows a single vehicle; two in the batch must abort the whole
        // transaction including the platform and driver inserts.
        let err = OnboardingService::complete(
            &db.pool,
            &cache,
            &billing_stub(),
            user_id,
            request(
                vec![driver("Me", true)],
                vec![vehicle("Corolla", true), vehicle("Civic", false)],
            ),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, OnboardingError::LimitExceeded(_)));

        assert_eq!(Driver::count_for_user(&db.pool, user_id).await.unwrap(), 0);
        assert_eq!(Vehicle::count_for_user(&db.pool, user_id).await.unwrap(), 0);
        assert_eq!(Platform::count_for_user(&db.pool, user_id).await.unwrap(), 0);
        assert_eq!(
            ExpenseType::count_for_user(&db.pool, user_id).await.unwrap(),
            0
        );

        let user = User::find_by_id(&db.pool, user_id).await.unwrap().unwrap();
        assert!(!user.onboarded());
    }

    #[tokio::test]
    async fn parked_checkout_is_consumed_even_when_billing_fails() {
        use chrono::Duration;
        use db::models::checkout_stash::BillingInterval;

        let db = DBService::new_in_memory().await.unwrap();
        let cache = DefaultsCache::new();
        let user_id = seed_user(&db, PlanTier::Free).await;

        CheckoutStash::put(
            &db.pool,
            user_id,
            PlanTier::Pro,
            BillingInterval::Monthly,
            Utc::now() + Duration::minutes(30),
        )
        .await
        .unwrap();

        // The stub billing endpoint is unreachable, so the hand-off fails,
        // but only after the transaction committed and the stash was taken.
        let err = OnboardingService::complete(
            &db.pool,
            &cache,
            &billing_stub(),
            user_id,
            request(vec![driver("Me", true)], vec![]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, OnboardingError::Billing(_)));

        let user = User::find_by_id(&db.pool, user_id).await.unwrap().unwrap();
        assert!(user.onboarded());
        assert!(
            CheckoutStash::take(&db.pool, user_id, Utc::now())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn batch_exactly_at_limit_is_accepted() {
        let db = DBService::new_in_memory().await.unwrap();
        let cache = DefaultsCache::new();
        let user_id = seed_user(&db, PlanTier::Simple).await;

        OnboardingService::complete(
            &db.pool,
            &cache,
            &billing_stub(),
            user_id,
            request(
                vec![
                    driver("A", true),
                    driver("B", false),
                    driver("C", false),
                ],
                vec![],
            ),
        )
        .await
        .unwrap();

        assert_eq!(Driver::count_for_user(&db.pool, user_id).await.unwrap(), 3);
    }
}
