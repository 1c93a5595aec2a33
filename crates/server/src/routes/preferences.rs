use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::user_preferences::{UpdateUserPreferences, UserPreferences};
use deployment::Deployment;
use services::services::defaults::CacheTag;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

/// GET /api/preferences
/// Created lazily with defaults on first read.
pub async fn get_preferences(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<UserPreferences>>, ApiError> {
    let prefs = UserPreferences::find_or_create(&deployment.db().pool, user.0).await?;
    Ok(ResponseJson(ApiResponse::success(prefs)))
}

/// PUT /api/preferences
pub async fn update_preferences(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    axum::Json(payload): axum::Json<UpdateUserPreferences>,
) -> Result<ResponseJson<ApiResponse<UserPreferences>>, ApiError> {
    let prefs = UserPreferences::upsert(&deployment.db().pool, user.0, &payload).await?;
    deployment
        .defaults_cache()
        .invalidate(user.0, &[CacheTag::Preferences])
        .await;
    Ok(ResponseJson(ApiResponse::success(prefs)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route(
        "/preferences",
        get(get_preferences).put(update_preferences),
    )
}
