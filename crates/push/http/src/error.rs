//! Error responses.

use axum::Json;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use push_dispatch::DispatchError;
use serde::{Deserialize, Serialize};

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// An error with the status it is reported under.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        let status = match &e {
            DispatchError::Invalid { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DispatchError::NotFound { .. } => StatusCode::NOT_FOUND,
            DispatchError::Driver { .. } => StatusCode::BAD_GATEWAY,
            DispatchError::Queue { .. } => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::UnknownDriver { .. } | DispatchError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %e, "request failed");
        }

        Self::new(status, e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use push_core::AttemptId;

    use super::*;

    #[test]
    fn test_dispatch_errors_map_to_status() {
        let cases = [
            (DispatchError::invalid("bad"), StatusCode::UNPROCESSABLE_ENTITY),
            (
                DispatchError::NotFound {
                    id: AttemptId::new("nope"),
                },
                StatusCode::NOT_FOUND,
            ),
            (DispatchError::queue("closed"), StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status, status);
        }
    }
}
