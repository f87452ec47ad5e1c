//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<Response, AppError>`; any
//! [`vidstream_common::Error`] converts with `?`.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use vidstream_common::Error;

/// Message returned in place of internal details for 5xx responses.
pub const INTERNAL_MESSAGE: &str = "internal server error";

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: Error,
}

impl AppError {
    pub fn new(inner: Error) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Error {
        &self.inner
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.inner.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self::new(e)
    }
}

impl From<vidstream_av::Error> for AppError {
    fn from(e: vidstream_av::Error) -> Self {
        Self::new(e.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details go to the log only.
        let message = if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in handler"
            );
            INTERNAL_MESSAGE.to_string()
        } else {
            tracing::debug!(status = %status, error = %self.inner, "Request rejected");
            self.inner.to_string()
        };

        let body = json!({
            "error": message,
            "code": self.inner.code(),
        });

        let mut response = (status, axum::Json(body)).into_response();

        if let Error::RangeNotSatisfiable { file_length, .. } = self.inner {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{file_length}")) {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }

        response
    }
}
