//! Entry-form configuration: plan-aware field visibility and statistical
//! defaults, served from the per-user cache.

use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use deployment::Deployment;
use services::services::defaults::{EntryFormConfig, EntryFormService};
use utils::response::ApiResponse;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

/// GET /api/entry-form
pub async fn get_entry_form_config(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<EntryFormConfig>>, ApiError> {
    let config = EntryFormService::entry_form_config(
        &deployment.db().pool,
        deployment.defaults_cache(),
        user.0,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(config)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/entry-form", get(get_entry_form_config))
}
