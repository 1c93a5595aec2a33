use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    defaults::DefaultsError, exports::ExportError, onboarding::OnboardingError,
    resources::ResourceError, summary::SummaryError, usage::UsageError,
};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

/// API-level failure. Internal details never reach the client; user-facing
/// variants carry pre-composed messages that are shown verbatim.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Not found")]
    NotFound,
    #[error("{0}")]
    LimitExceeded(String),
    #[error("Onboarding has already been completed")]
    AlreadyOnboarded,
    #[error("Checkout could not be started: {0}")]
    Billing(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<UsageError> for ApiError {
    fn from(err: UsageError) -> Self {
        match err {
            UsageError::Unauthorized => Self::Unauthorized,
            UsageError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<ResourceError> for ApiError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::Unauthorized => Self::Unauthorized,
            ResourceError::NotFound => Self::NotFound,
            ResourceError::LimitExceeded(msg) => Self::LimitExceeded(msg),
            ResourceError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<DefaultsError> for ApiError {
    fn from(err: DefaultsError) -> Self {
        match err {
            DefaultsError::Unauthorized => Self::Unauthorized,
            DefaultsError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<OnboardingError> for ApiError {
    fn from(err: OnboardingError) -> Self {
        match err {
            OnboardingError::Unauthorized => Self::Unauthorized,
            OnboardingError::AlreadyOnboarded => Self::AlreadyOnboarded,
            OnboardingError::LimitExceeded(msg) => Self::LimitExceeded(msg),
            OnboardingError::Billing(e) => Self::Billing(e.to_string()),
            OnboardingError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Unauthorized => Self::Unauthorized,
            ExportError::LimitExceeded(msg) => Self::LimitExceeded(msg),
            ExportError::Database(e) => Self::Internal(e.to_string()),
            ExportError::Csv(e) => Self::Internal(e),
        }
    }
}

impl From<SummaryError> for ApiError {
    fn from(err: SummaryError) -> Self {
        match err {
            SummaryError::Unauthorized => Self::Unauthorized,
            SummaryError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Self::LimitExceeded(_) => (StatusCode::FORBIDDEN, self.to_string()),
            Self::AlreadyOnboarded => (StatusCode::CONFLICT, self.to_string()),
            Self::Billing(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            Self::Internal(detail) => {
                error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong".to_string(),
                )
            }
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}
