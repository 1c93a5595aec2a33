//! Pending-checkout stash: parks a plan selection made before onboarding so
//! the checkout can start as soon as setup completes.

use axum::{Router, extract::State, response::Json as ResponseJson, routing::put};
use chrono::{Duration, Utc};
use db::models::{
    checkout_stash::{BillingInterval, CheckoutStash},
    user::PlanTier,
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

const STASH_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PendingCheckout {
    pub plan: PlanTier,
    pub billing_interval: BillingInterval,
}

/// PUT /api/checkout/pending
pub async fn put_pending_checkout(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    axum::Json(payload): axum::Json<PendingCheckout>,
) -> Result<ResponseJson<ApiResponse<CheckoutStash>>, ApiError> {
    let expires_at = Utc::now() + Duration::minutes(STASH_TTL_MINUTES);
    let stash = CheckoutStash::put(
        &deployment.db().pool,
        user.0,
        payload.plan,
        payload.billing_interval,
        expires_at,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(stash)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/checkout/pending", put(put_pending_checkout))
}
