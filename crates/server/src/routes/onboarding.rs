use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::user::User;
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::onboarding::{OnboardingOutcome, OnboardingRequest, OnboardingService};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct OnboardingStatus {
    pub onboarded: bool,
}

/// POST /api/onboarding
/// Bulk-create the initial catalog and mark the account set up.
pub async fn complete_onboarding(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    axum::Json(payload): axum::Json<OnboardingRequest>,
) -> Result<ResponseJson<ApiResponse<OnboardingOutcome>>, ApiError> {
    let outcome = OnboardingService::complete(
        &deployment.db().pool,
        deployment.defaults_cache(),
        deployment.billing(),
        user.0,
        payload,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(outcome)))
}

/// GET /api/onboarding/status
pub async fn get_onboarding_status(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<OnboardingStatus>>, ApiError> {
    let account = User::find_by_id(&deployment.db().pool, user.0)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(ResponseJson(ApiResponse::success(OnboardingStatus {
        onboarded: account.onboarded(),
    })))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/onboarding",
        Router::new()
            .route("/", post(complete_onboarding))
            .route("/status", get(get_onboarding_status)),
    )
}
