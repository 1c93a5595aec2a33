use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::driver::{CreateDriver, Driver};
use deployment::Deployment;
use services::services::resources::ResourceService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

/// POST /api/drivers
pub async fn create_driver(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    axum::Json(payload): axum::Json<CreateDriver>,
) -> Result<ResponseJson<ApiResponse<Driver>>, ApiError> {
    let driver = ResourceService::create_driver(
        &deployment.db().pool,
        deployment.defaults_cache(),
        user.0,
        payload,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(driver)))
}

/// GET /api/drivers
pub async fn list_drivers(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Vec<Driver>>>, ApiError> {
    let drivers = Driver::find_for_user(&deployment.db().pool, user.0).await?;
    Ok(ResponseJson(ApiResponse::success(drivers)))
}

/// GET /api/drivers/{driver_id}
pub async fn get_driver(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(driver_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Driver>>, ApiError> {
    let driver = Driver::find_by_id_for_user(&deployment.db().pool, driver_id, user.0)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(ResponseJson(ApiResponse::success(driver)))
}

/// DELETE /api/drivers/{driver_id}
pub async fn delete_driver(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(driver_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ResourceService::delete_driver(
        &deployment.db().pool,
        deployment.defaults_cache(),
        user.0,
        driver_id,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/drivers",
        Router::new()
            .route("/", get(list_drivers).post(create_driver))
            .route("/{driver_id}", get(get_driver).delete(delete_driver)),
    )
}
