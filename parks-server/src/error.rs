use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parks::errors::ParksError;
use serde::Serialize;

/// JSON error body: `{"http_status": 400, "error_msg": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub http_status: u16,
    pub error_msg: String,
}

/// A failed request. Validation failures answer 400, everything else 500.
#[derive(Debug)]
pub struct ApiError(pub ParksError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<ParksError> for ApiError {
    fn from(err: ParksError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // client errors carry the usage text only, details stay in the log
        let error_msg = if status == StatusCode::BAD_REQUEST {
            log::debug!("Bad request: {}", self.0);
            self.0.message().to_string()
        } else {
            log::error!("Request failed: {}", self.0);
            self.0.to_string()
        };
        let body = ErrorBody {
            http_status: status.as_u16(),
            error_msg,
        };
        (status, Json(body)).into_response()
    }
}
