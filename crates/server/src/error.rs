//! HTTP error mapping.
//!
//! Every pipeline failure surfaces as one structured `{detail}` body
//! with the status code the error taxonomy assigns to it.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use linkmirror_core::Error;
use serde::Serialize;

/// A request-scoped failure ready to serialize.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, detail: detail.into() }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::ControlNotFound(_) => StatusCode::NOT_FOUND,
            Error::Navigation(_) | Error::Extraction(_) | Error::Publish(_) | Error::Cache(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        };
        Self { status, detail: err.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err: ApiError = Error::InvalidInput("id parameter required".into()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: ApiError = Error::ControlNotFound("nothing on page".into()).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err: ApiError = Error::Navigation("net::ERR_NAME_NOT_RESOLVED".into()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);

        let err: ApiError = Error::Publish("rclone link failed".into()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);

        let err: ApiError = Error::DeadlineExceeded(90_000).into();
        assert_eq!(err.status, StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_detail_carries_upstream_text() {
        let err: ApiError = Error::Extraction("anchor harvest failed".into()).into();
        assert!(err.detail.contains("anchor harvest failed"));
    }
}
