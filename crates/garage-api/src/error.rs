use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use garage_db::StoreError;
use garage_types::api::ErrorResponse;
use garage_types::models::MAX_IMAGES;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    /// Missing and foreign cars are reported identically.
    #[error("Car not found or unauthorized")]
    NotFound,

    #[error("You can upload up to {max} images only.", max = MAX_IMAGES)]
    LimitExceeded,

    #[error("{0}")]
    Validation(String),

    #[error("Storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::NotFound,
            StoreError::LimitExceeded { .. } => Self::LimitExceeded,
            StoreError::Backend(e) => Self::Storage(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::LimitExceeded | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Internal detail stays in the log.
        let message = match &self {
            ApiError::Storage(e) => {
                error!("Storage failure: {:#}", e);
                "Server error".to_string()
            }
            other => {
                warn!("Request rejected ({}): {}", status.as_u16(), other);
                other.to_string()
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            status: status.as_u16(),
        });
        (status, body).into_response()
    }
}
