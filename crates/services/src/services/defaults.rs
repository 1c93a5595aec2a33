//! Plan-aware entry-form configuration: which selectors to show and which
//! values to pre-fill, derived from preferences, flags, and recent activity.

use chrono::{NaiveDate, Utc};
use db::models::{
    driver::Driver,
    user::{PlanTier, User},
    user_preferences::UserPreferences,
    vehicle::Vehicle,
};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use ts_rs::TS;
use utils::time::trailing_window_start;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DefaultsError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unauthorized")]
    Unauthorized,
}

/// What the daily-entry form should render for this user right now.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct EntryFormConfig {
    pub show_driver_select: bool,
    pub show_vehicle_select: bool,
    pub show_payment_method_select: bool,
    pub default_driver_id: Option<Uuid>,
    pub default_vehicle_id: Option<Uuid>,
    pub default_payment_method_id: Option<Uuid>,
    pub top_platform_ids: Vec<Uuid>,
}

/// Categories of writes that can stale a cached entry-form config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTag {
    Drivers,
    Vehicles,
    Platforms,
    ExpenseTypes,
    PaymentMethods,
    Activity,
    Preferences,
}

/// Per-user cache for the resolved config. The resolution fans out into a
/// handful of aggregate queries, so reads are cached for a short window and
/// dropped eagerly on any tagged write so a resource created mid-flow shows
/// up on the very next read.
#[derive(Clone)]
pub struct DefaultsCache {
    entries: Cache<Uuid, EntryFormConfig>,
}

impl DefaultsCache {
    const TTL: Duration = Duration::from_secs(20 * 60);
    const MAX_USERS: u64 = 10_000;

    /// Every tag the entry-form config reads through.
    const DEPENDS_ON: &'static [CacheTag] = &[
        CacheTag::Drivers,
        CacheTag::Vehicles,
        CacheTag::Platforms,
        CacheTag::ExpenseTypes,
        CacheTag::PaymentMethods,
        CacheTag::Activity,
        CacheTag::Preferences,
    ];

    pub fn new() -> Self {
        Self {
            entries: Cache::builder()
                .time_to_live(Self::TTL)
                .max_capacity(Self::MAX_USERS)
                .build(),
        }
    }

    pub async fn get(&self, user_id: Uuid) -> Option<EntryFormConfig> {
        self.entries.get(&user_id).await
    }

    pub async fn insert(&self, user_id: Uuid, config: EntryFormConfig) {
        self.entries.insert(user_id, config).await;
    }

    /// Drop the user's cached config when any of the given write categories
    /// intersects what the config depends on.
    pub async fn invalidate(&self, user_id: Uuid, tags: &[CacheTag]) {
        if tags.iter().any(|t| Self::DEPENDS_ON.contains(t)) {
            debug!(user_id = %user_id, ?tags, "invalidating entry-form defaults");
            self.entries.invalidate(&user_id).await;
        }
    }
}

impl Default for DefaultsCache {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EntryFormService;

impl EntryFormService {
    pub async fn entry_form_config(
        pool: &SqlitePool,
        cache: &DefaultsCache,
        user_id: Uuid,
    ) -> Result<EntryFormConfig, DefaultsError> {
        if let Some(hit) = cache.get(user_id).await {
            return Ok(hit);
        }

        let config = Self::resolve(pool, user_id).await?;
        cache.insert(user_id, config.clone()).await;
        Ok(config)
    }

    /// Uncached resolution. Exposed for tests and for the cache fill above.
    pub async fn resolve(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<EntryFormConfig, DefaultsError> {
        let user = User::find_by_id(pool, user_id)
            .await?
            .ok_or(DefaultsError::Unauthorized)?;

        let since = trailing_window_start(Utc::now().date_naive());
        let top_platform_ids = Self::top_platforms(pool, user_id, since, 3).await?;

        if user.plan == PlanTier::Free {
            // Capacity-1 tier: the selectors never render, the only rows win.
            let driver = Driver::first_for_user(pool, user_id).await?;
            let vehicle = Vehicle::first_for_user(pool, user_id).await?;
            return Ok(EntryFormConfig {
                show_driver_select: false,
                show_vehicle_select: false,
                show_payment_method_select: false,
                default_driver_id: driver.map(|d| d.id),
                default_vehicle_id: vehicle.map(|v| v.id),
                default_payment_method_id: None,
                top_platform_ids,
            });
        }

        let prefs = UserPreferences::find_by_user_id(pool, user_id).await?;
        let default_driver_id = Self::resolve_driver(pool, user_id, prefs.as_ref(), since).await?;
        let default_vehicle_id =
            Self::resolve_vehicle(pool, user_id, prefs.as_ref(), since).await?;
        let default_payment_method_id =
            Self::most_used_payment_method(pool, user_id, since).await?;

        Ok(EntryFormConfig {
            show_driver_select: true,
            show_vehicle_select: true,
            show_payment_method_select: true,
            default_driver_id,
            default_vehicle_id,
            default_payment_method_id,
            top_platform_ids,
        })
    }

    /// Priority chain, first match wins: explicit preference, cardinality-one
    /// shortcut, self flag, trailing-window frequency.
    async fn resolve_driver(
        pool: &SqlitePool,
        user_id: Uuid,
        prefs: Option<&UserPreferences>,
        since: NaiveDate,
    ) -> Result<Option<Uuid>, DefaultsError> {
        if let Some(preferred) = prefs.and_then(|p| p.default_driver_id) {
            // The pointer is a weak reference; honor it only while the row
            // still exists on this account.
            if Driver::find_by_id_for_user(pool, preferred, user_id)
                .await?
                .is_some()
            {
                return Ok(Some(preferred));
            }
        }

        if Driver::count_for_user(pool, user_id).await? == 1 {
            return Ok(Driver::first_for_user(pool, user_id).await?.map(|d| d.id));
        }

        if let Some(own) = Driver::find_self_for_user(pool, user_id).await? {
            return Ok(Some(own.id));
        }

        Self::most_used_driver(pool, user_id, since).await
    }

    async fn resolve_vehicle(
        pool: &SqlitePool,
        user_id: Uuid,
        prefs: Option<&UserPreferences>,
        since: NaiveDate,
    ) -> Result<Option<Uuid>, DefaultsError> {
        if let Some(preferred) = prefs.and_then(|p| p.default_vehicle_id) {
            if Vehicle::find_by_id_for_user(pool, preferred, user_id)
                .await?
                .is_some()
            {
                return Ok(Some(preferred));
            }
        }

        if Vehicle::count_for_user(pool, user_id).await? == 1 {
            return Ok(Vehicle::first_for_user(pool, user_id).await?.map(|v| v.id));
        }

        if let Some(primary) = Vehicle::find_primary_for_user(pool, user_id).await? {
            return Ok(Some(primary.id));
        }

        Self::most_used_vehicle(pool, user_id, since).await
    }

    async fn most_used_driver(
        pool: &SqlitePool,
        user_id: Uuid,
        since: NaiveDate,
    ) -> Result<Option<Uuid>, DefaultsError> {
        let row = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT driver_id, COUNT(*) AS uses FROM (
                 SELECT driver_id FROM revenues
                  WHERE user_id = $1 AND occurred_on >= $2 AND driver_id IS NOT NULL
                 UNION ALL
                 SELECT driver_id FROM expenses
                  WHERE user_id = $1 AND occurred_on >= $2 AND driver_id IS NOT NULL
             )
             GROUP BY driver_id
             ORDER BY uses DESC
             LIMIT 1",
        )
        .bind(user_id)
        .bind(since)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|(id, _)| id))
    }

    async fn most_used_vehicle(
        pool: &SqlitePool,
        user_id: Uuid,
        since: NaiveDate,
    ) -> Result<Option<Uuid>, DefaultsError> {
        let row = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT vehicle_id, COUNT(*) AS uses FROM (
                 SELECT vehicle_id FROM revenues
                  WHERE user_id = $1 AND occurred_on >= $2 AND vehicle_id IS NOT NULL
                 UNION ALL
                 SELECT vehicle_id FROM expenses
                  WHERE user_id = $1 AND occurred_on >= $2 AND vehicle_id IS NOT NULL
             )
             GROUP BY vehicle_id
             ORDER BY uses DESC
             LIMIT 1",
        )
        .bind(user_id)
        .bind(since)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|(id, _)| id))
    }

    async fn most_used_payment_method(
        pool: &SqlitePool,
        user_id: Uuid,
        since: NaiveDate,
    ) -> Result<Option<Uuid>, DefaultsError> {
        let row = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT payment_method_id, COUNT(*) AS uses FROM (
                 SELECT payment_method_id FROM revenues
                  WHERE user_id = $1 AND occurred_on >= $2 AND payment_method_id IS NOT NULL
                 UNION ALL
                 SELECT payment_method_id FROM expenses
                  WHERE user_id = $1 AND occurred_on >= $2 AND payment_method_id IS NOT NULL
             )
             GROUP BY payment_method_id
             ORDER BY uses DESC
             LIMIT 1",
        )
        .bind(user_id)
        .bind(since)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|(id, _)| id))
    }

    async fn top_platforms(
        pool: &SqlitePool,
        user_id: Uuid,
        since: NaiveDate,
        limit: i64,
    ) -> Result<Vec<Uuid>, DefaultsError> {
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT platform_id, COUNT(*) AS uses FROM revenues
             WHERE user_id = $1 AND occurred_on >= $2 AND platform_id IS NOT NULL
             GROUP BY platform_id
             ORDER BY uses DESC
             LIMIT $3",
        )
        .bind(user_id)
        .bind(since)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(id, _)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Days;
    use db::{
        DBService,
        models::{
            driver::CreateDriver,
            platform::{CreatePlatform, Platform},
            revenue::{CreateRevenue, Revenue},
            user::{CreateUser, PlanTier},
            user_preferences::{UpdateUserPreferences, UserPreferences},
            vehicle::CreateVehicle,
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

    async fn seed_driver(db: &DBService, user_id: Uuid, name: &str, is_self: bool) -> Uuid {
        let id = Uuid::new_v4();
        Driver::create(
            &db.pool,
            &CreateDriver {
                name: name.into(),
                is_self: Some(is_self),
            },
            id,
            user_id,
        )
        .await
        .unwrap();
        id
    }

    async fn seed_revenue_for_driver(db: &DBService, user_id: Uuid, driver_id: Uuid, on: NaiveDate) {
        Revenue::create(
            &db.pool,
            &CreateRevenue {
                platform_id: None,
                driver_id: Some(driver_id),
                vehicle_id: None,
                payment_method_id: None,
                amount_cents: 1500,
                occurred_on: on,
                note: None,
            },
            Uuid::new_v4(),
            user_id,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn explicit_preference_beats_flag_and_cardinality() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db, PlanTier::Simple).await;

        let flagged = seed_driver(&db, user_id, "Me", true).await;
        let preferred = seed_driver(&db, user_id, "Partner", false).await;

        UserPreferences::upsert(
            &db.pool,
            user_id,
            &UpdateUserPreferences {
                default_driver_id: Some(preferred),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let config = EntryFormService::resolve(&db.pool, user_id).await.unwrap();
        assert_eq!(config.default_driver_id, Some(preferred));
        assert_ne!(config.default_driver_id, Some(flagged));
    }

    #[tokio::test]
    async fn single_driver_shortcut_beats_frequency() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db, PlanTier::Simple).await;

        let only = seed_driver(&db, user_id, "Only", false).await;
        let config = EntryFormService::resolve(&db.pool, user_id).await.unwrap();
        assert_eq!(config.default_driver_id, Some(only));
    }

    #[tokio::test]
    async fn self_flag_beats_frequency() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db, PlanTier::Simple).await;

        let busy = seed_driver(&db, user_id, "Busy", false).await;
        let me = seed_driver(&db, user_id, "Me", true).await;

        let today = Utc::now().date_naive();
        for _ in 0..4 {
            seed_revenue_for_driver(&db, user_id, busy, today).await;
        }

        let config = EntryFormService::resolve(&db.pool, user_id).await.unwrap();
        assert_eq!(config.default_driver_id, Some(me));
    }

    #[tokio::test]
    async fn frequency_fallback_picks_the_busier_driver() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db, PlanTier::Simple).await;

        let a = seed_driver(&db, user_id, "A", false).await;
        let b = seed_driver(&db, user_id, "B", false).await;

        let today = Utc::now().date_naive();
        for _ in 0..5 {
            seed_revenue_for_driver(&db, user_id, a, today).await;
        }
        for _ in 0..2 {
            seed_revenue_for_driver(&db, user_id, b, today).await;
        }

        let config = EntryFormService::resolve(&db.pool, user_id).await.unwrap();
        assert_eq!(config.default_driver_id, Some(a));
    }

    #[tokio::test]
    async fn trailing_window_boundary_is_inclusive_at_30_days() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db, PlanTier::Simple).await;

        let inside = seed_driver(&db, user_id, "Inside", false).await;
        let outside = seed_driver(&db, user_id, "Outside", false).await;

        let today = Utc::now().date_naive();
        // One record exactly on the boundary counts; two records one day past
        // it do not.
        seed_revenue_for_driver(&db, user_id, inside, today - Days::new(30)).await;
        seed_revenue_for_driver(&db, user_id, outside, today - Days::new(31)).await;
        seed_revenue_for_driver(&db, user_id, outside, today - Days::new(31)).await;

        let config = EntryFormService::resolve(&db.pool, user_id).await.unwrap();
        assert_eq!(config.default_driver_id, Some(inside));
    }

    #[tokio::test]
    async fn free_tier_hides_selectors_and_uses_only_rows() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db, PlanTier::Free).await;

        let driver = seed_driver(&db, user_id, "Me", true).await;
        let vehicle_id = Uuid::new_v4();
        Vehicle::create(
            &db.pool,
            &CreateVehicle {
                name: "Corolla".into(),
                make: None,
                model: None,
                is_primary: Some(true),
            },
            vehicle_id,
            user_id,
        )
        .await
        .unwrap();

        let config = EntryFormService::resolve(&db.pool, user_id).await.unwrap();
        assert!(!config.show_driver_select);
        assert!(!config.show_vehicle_select);
        assert!(!config.show_payment_method_select);
        assert_eq!(config.default_driver_id, Some(driver));
        assert_eq!(config.default_vehicle_id, Some(vehicle_id));
        assert_eq!(config.default_payment_method_id, None);
    }

    #[tokio::test]
    async fn dangling_preference_pointer_falls_through() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db, PlanTier::Simple).await;

        let kept = seed_driver(&db, user_id, "Kept", true).await;
        seed_driver(&db, user_id, "Other", false).await;
        UserPreferences::upsert(
            &db.pool,
            user_id,
            &UpdateUserPreferences {
                default_driver_id: Some(Uuid::new_v4()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let config = EntryFormService::resolve(&db.pool, user_id).await.unwrap();
        assert_eq!(config.default_driver_id, Some(kept));
    }

    #[tokio::test]
    async fn top_platforms_ranked_by_recent_use() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db, PlanTier::Pro).await;

        let mut platform_ids = Vec::new();
        for name in ["Uber", "DoorDash", "Lyft", "Grubhub"] {
            let id = Uuid::new_v4();
            Platform::create(
                &db.pool,
                &CreatePlatform { name: name.into() },
                id,
                user_id,
            )
            .await
            .unwrap();
            platform_ids.push(id);
        }

        let today = Utc::now().date_naive();
        let uses = [5usize, 3, 2, 1];
        for (platform_id, count) in platform_ids.iter().zip(uses) {
            for _ in 0..count {
                Revenue::create(
                    &db.pool,
                    &CreateRevenue {
                        platform_id: Some(*platform_id),
                        driver_id: None,
                        vehicle_id: None,
                        payment_method_id: None,
                        amount_cents: 900,
                        occurred_on: today,
                        note: None,
                    },
                    Uuid::new_v4(),
                    user_id,
                )
                .await
                .unwrap();
            }
        }

        let config = EntryFormService::resolve(&db.pool, user_id).await.unwrap();
        assert_eq!(config.top_platform_ids.len(), 3);
        assert_eq!(config.top_platform_ids[0], platform_ids[0]);
        assert_eq!(config.top_platform_ids[1], platform_ids[1]);
        assert_eq!(config.top_platform_ids[2], platform_ids[2]);
    }

    #[tokio::test]
    async fn cache_serves_hit_until_invalidated() {
        let db = DBService::new_in_memory().await.unwrap();
        let cache = DefaultsCache::new();
        let user_id = seed_user(&db, PlanTier::Simple).await;

        let first = seed_driver(&db, user_id, "First", false).await;
        let config = EntryFormService::entry_form_config(&db.pool, &cache, user_id)
            .await
            .unwrap();
        assert_eq!(config.default_driver_id, Some(first));

        // A second driver flips the cardinality-one shortcut, but the cached
        // config still answers until the write invalidates it.
        seed_driver(&db, user_id, "Second", true).await;
        let cached = EntryFormService::entry_form_config(&db.pool, &cache, user_id)
            .await
            .unwrap();
        assert_eq!(cached.default_driver_id, Some(first));

        cache.invalidate(user_id, &[CacheTag::Drivers]).await;
        let fresh = EntryFormService::entry_form_config(&db.pool, &cache, user_id)
            .await
            .unwrap();
        assert_ne!(fresh.default_driver_id, Some(first));
    }
}
