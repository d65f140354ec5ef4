use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use moodcam_core::analysis::domain::error::AnalysisError;
use moodcam_core::analysis::domain::wire::ErrorBody;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No image data provided")]
    MissingImage,

    #[error("Invalid JSON body")]
    InvalidJson(#[source] serde_json::Error),

    #[error("predictedMood and actualMood are required")]
    MissingMoods,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Failed to analyze image")]
    Analysis(#[from] AnalysisError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingImage | ApiError::InvalidJson(_) | ApiError::MissingMoods => {
                StatusCode::BAD_REQUEST
            }
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Analysis(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Analysis(e) => ErrorBody::new(self.to_string()).with_details(e.to_string()),
            ApiError::Internal(details) => {
                ErrorBody::new("Internal server error").with_details(details.clone())
            }
            _ => ErrorBody::new(self.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::Analysis(e) => log::error!("Analysis failed: {e}"),
            ApiError::Internal(e) => log::error!("Internal error: {e}"),
            ApiError::InvalidJson(e) => log::debug!("Rejected body: {e}"),
            _ => {}
        }
        (status, Json(self.body())).into_response()
    }
}
