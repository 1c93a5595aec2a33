//! Routes for the three flat catalogs: platforms, expense types, and
//! payment methods.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    expense_type::{CreateExpenseType, ExpenseType},
    payment_method::{CreatePaymentMethod, PaymentMethod},
    platform::{CreatePlatform, Platform},
};
use deployment::Deployment;
use services::services::resources::ResourceService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

pub async fn create_platform(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    axum::Json(payload): axum::Json<CreatePlatform>,
) -> Result<ResponseJson<ApiResponse<Platform>>, ApiError> {
    let platform = ResourceService::create_platform(
        &deployment.db().pool,
        deployment.defaults_cache(),
        user.0,
        payload,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(platform)))
}

pub async fn list_platforms(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Vec<Platform>>>, ApiError> {
    let platforms = Platform::find_for_user(&deployment.db().pool, user.0).await?;
    Ok(ResponseJson(ApiResponse::success(platforms)))
}

pub async fn delete_platform(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(platform_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ResourceService::delete_platform(
        &deployment.db().pool,
        deployment.defaults_cache(),
        user.0,
        platform_id,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn create_expense_type(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    axum::Json(payload): axum::Json<CreateExpenseType>,
) -> Result<ResponseJson<ApiResponse<ExpenseType>>, ApiError> {
    let expense_type = ResourceService::create_expense_type(
        &deployment.db().pool,
        deployment.defaults_cache(),
        user.0,
        payload,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(expense_type)))
}

pub async fn list_expense_types(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Vec<ExpenseType>>>, ApiError> {
    let expense_types = ExpenseType::find_for_user(&deployment.db().pool, user.0).await?;
    Ok(ResponseJson(ApiResponse::success(expense_types)))
}

pub async fn delete_expense_type(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(expense_type_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ResourceService::delete_expense_type(
        &deployment.db().pool,
        deployment.defaults_cache(),
        user.0,
        expense_type_id,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn create_payment_method(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    axum::Json(payload): axum::Json<CreatePaymentMethod>,
) -> Result<ResponseJson<ApiResponse<PaymentMethod>>, ApiError> {
    let payment_method = ResourceService::create_payment_method(
        &deployment.db().pool,
        deployment.defaults_cache(),
        user.0,
        payload,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(payment_method)))
}

pub async fn list_payment_methods(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Vec<PaymentMethod>>>, ApiError> {
    let payment_methods = PaymentMethod::find_for_user(&deployment.db().pool, user.0).await?;
    Ok(ResponseJson(ApiResponse::success(payment_methods)))
}

pub async fn delete_payment_method(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(payment_method_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ResourceService::delete_payment_method(
        &deployment.db().pool,
        deployment.defaults_cache(),
        user.0,
        payment_method_id,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .nest(
            "/platforms",
            Router::new()
                .route("/", get(list_platforms).post(create_platform))
                .route("/{platform_id}", axum::routing::delete(delete_platform)),
        )
        .nest(
            "/expense-types",
            Router::new()
                .route("/", get(list_expense_types).post(create_expense_type))
                .route(
                    "/{expense_type_id}",
                    axum::routing::delete(delete_expense_type),
                ),
        )
        .nest(
            "/payment-methods",
            Router::new()
                .route("/", get(list_payment_methods).post(create_payment_method))
                .route(
                    "/{payment_method_id}",
                    axum::routing::delete(delete_payment_method),
                ),
        )
}
