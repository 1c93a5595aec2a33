//! Budgets and goals. Both count against plan limits on creation.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    budget::{Budget, CreateBudget},
    goal::{CreateGoal, Goal},
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::resources::ResourceService;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateActive {
    pub is_active: bool,
}

pub async fn create_budget(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    axum::Json(payload): axum::Json<CreateBudget>,
) -> Result<ResponseJson<ApiResponse<Budget>>, ApiError> {
    let budget = ResourceService::create_budget(&deployment.db().pool, user.0, payload).await?;
    Ok(ResponseJson(ApiResponse::success(budget)))
}

pub async fn list_budgets(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Vec<Budget>>>, ApiError> {
    let budgets = Budget::find_for_user(&deployment.db().pool, user.0).await?;
    Ok(ResponseJson(ApiResponse::success(budgets)))
}

pub async fn set_budget_active(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(budget_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateActive>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let updated =
        Budget::set_active(&deployment.db().pool, budget_id, user.0, payload.is_active).await?;
    if updated == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn delete_budget(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(budget_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let deleted = Budget::delete(&deployment.db().pool, budget_id, user.0).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn create_goal(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    axum::Json(payload): axum::Json<CreateGoal>,
) -> Result<ResponseJson<ApiResponse<Goal>>, ApiError> {
    let goal = ResourceService::create_goal(&deployment.db().pool, user.0, payload).await?;
    Ok(ResponseJson(ApiResponse::success(goal)))
}

pub async fn list_goals(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Vec<Goal>>>, ApiError> {
    let goals = Goal::find_for_user(&deployment.db().pool, user.0).await?;
    Ok(ResponseJson(ApiResponse::success(goals)))
}

pub async fn set_goal_active(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(goal_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateActive>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let updated =
        Goal::set_active(&deployment.db().pool, goal_id, user.0, payload.is_active).await?;
    if updated == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn delete_goal(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(goal_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let deleted = Goal::delete(&deployment.db().pool, goal_id, user.0).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .nest(
            "/budgets",
            Router::new()
                .route("/", get(list_budgets).post(create_budget))
                .route(
                    "/{budget_id}",
                    axum::routing::put(set_budget_active).delete(delete_budget),
                ),
        )
        .nest(
            "/goals",
            Router::new()
                .route("/", get(list_goals).post(create_goal))
                .route(
                    "/{goal_id}",
                    axum::routing::put(set_goal_active).delete(delete_goal),
                ),
        )
}
