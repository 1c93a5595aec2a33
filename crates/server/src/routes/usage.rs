//! Plan usage: per-resource counts against the active tier's limits.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::{
    plan::LimitedResource,
    usage::{PlanUsageSummary, UsageService},
};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct LimitStatus {
    pub resource: LimitedResource,
    pub limit_reached: bool,
}

/// GET /api/usage
pub async fn get_usage_summary(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<PlanUsageSummary>>, ApiError> {
    let summary = UsageService::usage_summary(&deployment.db().pool, user.0).await?;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

/// GET /api/usage/{resource}
/// One-shot "can I create another?" check for a single resource kind.
pub async fn get_limit_status(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(resource): Path<String>,
) -> Result<ResponseJson<ApiResponse<LimitStatus>>, ApiError> {
    let resource: LimitedResource = resource.parse().map_err(|_| ApiError::NotFound)?;
    let limit_reached = UsageService::limit_reached(&deployment.db().pool, user.0, resource).await?;
    Ok(ResponseJson(ApiResponse::success(LimitStatus {
        resource,
        limit_reached,
    })))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/usage",
        Router::new()
            .route("/", get(get_usage_summary))
            .route("/{resource}", get(get_limit_status)),
    )
}
