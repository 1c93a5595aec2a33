use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use chrono::{Days, NaiveDate, Utc};
use deployment::Deployment;
use serde::Deserialize;
use services::services::summary::{ActivitySummary, SummaryService};
use utils::response::ApiResponse;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

/// GET /api/reports/summary
/// Defaults to the trailing 30 days when no range is given.
pub async fn get_activity_summary(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Query(params): Query<SummaryParams>,
) -> Result<ResponseJson<ApiResponse<ActivitySummary>>, ApiError> {
    let today = Utc::now().date_naive();
    let until = params.until.unwrap_or(today);
    let since = params.since.unwrap_or_else(|| until - Days::new(30));

    let summary =
        SummaryService::activity_summary(&deployment.db().pool, user.0, since, until).await?;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/reports/summary", get(get_activity_summary))
}
