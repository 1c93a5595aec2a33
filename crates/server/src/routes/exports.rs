//! CSV export of activity records, metered against the monthly quota.

use axum::{
    Router,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::post,
};
use chrono::{NaiveDate, Utc};
use deployment::Deployment;
use serde::Deserialize;
use services::services::exports::ExportService;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

/// POST /api/exports
/// Consumes one export from the monthly quota and returns the CSV document.
pub async fn create_export(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Query(params): Query<ExportParams>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let until = params.until.unwrap_or_else(|| now.date_naive());
    let since = params
        .since
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(until));

    // Quota first: a metered-out user never pays the cost of building the
    // document.
    ExportService::record_export(&deployment.db().pool, user.0, now).await?;

    let csv = ExportService::activity_csv(&deployment.db().pool, user.0, since, until).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"activity.csv\"",
            ),
        ],
        csv,
    ))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/exports", post(create_export))
}
