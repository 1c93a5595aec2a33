use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::user::PlanTier;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
)]
#[sqlx(type_name = "billing_interval", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BillingInterval {
    Monthly,
    Yearly,
}

/// A plan selection parked before onboarding so the checkout can be started
/// right after it completes. One row per user, read once, then gone.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct CheckoutStash {
    pub user_id: Uuid,
    pub plan: PlanTier,
    pub billing_interval: BillingInterval,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

const STASH_COLUMNS: &str = "user_id, plan, billing_interval, expires_at, created_at";

impl CheckoutStash {
    /// Park (or replace) the user's pending selection.
    pub async fn put(
        pool: &SqlitePool,
        user_id: Uuid,
        plan: PlanTier,
        billing_interval: BillingInterval,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, CheckoutStash>(&format!(
            "INSERT INTO checkout_stashes (user_id, plan, billing_interval, expires_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT(user_id) DO UPDATE SET
                 plan = excluded.plan,
                 billing_interval = excluded.billing_interval,
                 expires_at = excluded.expires_at
             RETURNING {STASH_COLUMNS}"
        ))
        .bind(user_id)
        .bind(plan)
        .bind(billing_interval)
        .bind(expires_at)
        .fetch_one(pool)
        .await
    }

    /// Read-once: returns the stash (if any) and deletes it in the same call.
    /// Expired rows are deleted and reported as absent.
    pub async fn take(
        pool: &SqlitePool,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let stash = sqlx::query_as::<_, CheckoutStash>(&format!(
            "DELETE FROM checkout_stashes WHERE user_id = $1 RETURNING {STASH_COLUMNS}"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(stash.filter(|s| s.expires_at > now))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::{
        DBService,
        models::user::{CreateUser, User},
    };

    async fn seed_user(db: &DBService) -> Uuid {
        let user_id = Uuid::new_v4();
        User::create(
            &db.pool,
            &CreateUser {
                email: format!("{user_id}@example.com"),
                display_name: None,
                plan: None,
            },
            user_id,
        )
        .await
        .unwrap();
        user_id
    }

    #[tokio::test]
    async fn take_is_read_once() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db).await;
        let now = Utc::now();

        CheckoutStash::put(
            &db.pool,
            user_id,
            PlanTier::Simple,
            BillingInterval::Yearly,
            now + Duration::minutes(30),
        )
        .await
        .unwrap();

        let first = CheckoutStash::take(&db.pool, user_id, now).await.unwrap();
        assert_eq!(first.map(|s| s.plan), Some(PlanTier::Simple));

        let second = CheckoutStash::take(&db.pool, user_id, now).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn expired_stash_reads_as_absent() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db).await;
        let now = Utc::now();

        CheckoutStash::put(
            &db.pool,
            user_id,
            PlanTier::Pro,
            BillingInterval::Monthly,
            now - Duration::minutes(1),
        )
        .await
        .unwrap();

        assert!(
            CheckoutStash::take(&db.pool, user_id, now)
                .await
                .unwrap()
                .is_none()
        );
    }
}

