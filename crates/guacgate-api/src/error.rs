//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Request-scoped failures
///
/// Internal details are logged by the handler; the response only carries
/// the generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("Forbidden: Invalid or missing authtoken")]
    Forbidden,

    #[error("Not Found")]
    NotFound,

    #[error("Failed to generate token")]
    TokenGeneration,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::TokenGeneration => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "INVALID_REQUEST",
            ApiError::Forbidden => "INVALID_AUTHTOKEN",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::TokenGeneration => "TOKEN_GENERATION_FAILED",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            code: Some(self.code().to_string()),
        };
        (self.status(), Json(body)).into_response()
    }
}
