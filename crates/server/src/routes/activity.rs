//! Revenue and expense records, the raw input to reports and the
//! entry-form statistics.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    expense::{CreateExpense, Expense},
    revenue::{CreateRevenue, Revenue},
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::resources::ResourceService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

pub async fn create_revenue(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    axum::Json(payload): axum::Json<CreateRevenue>,
) -> Result<ResponseJson<ApiResponse<Revenue>>, ApiError> {
    let revenue = ResourceService::create_revenue(
        &deployment.db().pool,
        deployment.defaults_cache(),
        user.0,
        payload,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(revenue)))
}

pub async fn list_revenues(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<ResponseJson<ApiResponse<Vec<Revenue>>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let revenues = Revenue::find_for_user(&deployment.db().pool, user.0, limit).await?;
    Ok(ResponseJson(ApiResponse::success(revenues)))
}

pub async fn delete_revenue(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(revenue_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ResourceService::delete_revenue(
        &deployment.db().pool,
        deployment.defaults_cache(),
        user.0,
        revenue_id,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn create_expense(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    axum::Json(payload): axum::Json<CreateExpense>,
) -> Result<ResponseJson<ApiResponse<Expense>>, ApiError> {
    let expense = ResourceService::create_expense(
        &deployment.db().pool,
        deployment.defaults_cache(),
        user.0,
        payload,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(expense)))
}

pub async fn list_expenses(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<ResponseJson<ApiResponse<Vec<Expense>>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let expenses = Expense::find_for_user(&deployment.db().pool, user.0, limit).await?;
    Ok(ResponseJson(ApiResponse::success(expenses)))
}

pub async fn delete_expense(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(expense_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ResourceService::delete_expense(
        &deployment.db().pool,
        deployment.defaults_cache(),
        user.0,
        expense_id,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .nest(
            "/revenues",
            Router::new()
                .route("/", get(list_revenues).post(create_revenue))
                .route("/{revenue_id}", axum::routing::delete(delete_revenue)),
        )
        .nest(
            "/expenses",
            Router::new()
                .route("/", get(list_expenses).post(create_expense))
                .route("/{expense_id}", axum::routing::delete(delete_expense)),
        )
}
