use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::error::ResearchError;

// ApiSucess is a wrapper around a response that includes a status code.

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize>(StatusCode, Json<T>);

impl<T: Serialize> ApiSuccess<T> {
    pub(crate) fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(data))
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

// ApiError is a wrapper around a response that includes a status code.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    InternalServerError(String),
}

impl From<ResearchError> for ApiError {
    fn from(value: ResearchError) -> Self {
        match value {
            ResearchError::Validation(error) => Self::BadRequest(error.to_string()),
            error @ ResearchError::Unauthorized => Self::Unauthorized(error.to_string()),
            ResearchError::Forbidden(message) => Self::Forbidden(message),
            error @ ResearchError::NotFound(_) => Self::NotFound(capitalize(&error.to_string())),
            ResearchError::Internal(cause) => Self::InternalServerError(cause),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use ApiError::*;

        let (status, message) = match self {
            InternalServerError(e) => {
                tracing::error!("{}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            Forbidden(message) => (StatusCode::FORBIDDEN, message),
            NotFound(message) => (StatusCode::NOT_FOUND, message),
        };
        (status, Json(ApiErrorBody { error: message })).into_response()
    }
}

/// The response format for all error responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
