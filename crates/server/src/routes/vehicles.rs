use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::vehicle::{CreateVehicle, Vehicle};
use deployment::Deployment;
use services::services::resources::ResourceService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

/// POST /api/vehicles
pub async fn create_vehicle(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    axum::Json(payload): axum::Json<CreateVehicle>,
) -> Result<ResponseJson<ApiResponse<Vehicle>>, ApiError> {
    let vehicle = ResourceService::create_vehicle(
        &deployment.db().pool,
        deployment.defaults_cache(),
        user.0,
        payload,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(vehicle)))
}

/// GET /api/vehicles
pub async fn list_vehicles(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Vec<Vehicle>>>, ApiError> {
    let vehicles = Vehicle::find_for_user(&deployment.db().pool, user.0).await?;
    Ok(ResponseJson(ApiResponse::success(vehicles)))
}

/// GET /api/vehicles/{vehicle_id}
pub async fn get_vehicle(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(vehicle_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vehicle>>, ApiError> {
    let vehicle = Vehicle::find_by_id_for_user(&deployment.db().pool, vehicle_id, user.0)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(ResponseJson(ApiResponse::success(vehicle)))
}

/// DELETE /api/vehicles/{vehicle_id}
pub async fn delete_vehicle(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(vehicle_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ResourceService::delete_vehicle(
        &deployment.db().pool,
        deployment.defaults_cache(),
        user.0,
        vehicle_id,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/vehicles",
        Router::new()
            .route("/", get(list_vehicles).post(create_vehicle))
            .route("/{vehicle_id}", get(get_vehicle).delete(delete_vehicle)),
    )
}
