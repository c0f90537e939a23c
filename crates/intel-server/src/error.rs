//! Maps `IntelError` onto an HTTP response (§7), mirroring the original
//! `http_exception_handler`'s `{error, request_id}` body shape. The request
//! id itself is stamped onto every response by [`crate::middleware`], not
//! here, so this only owns status + error message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use intel_core::error::IntelError;

pub struct ApiError(pub IntelError);

impl From<IntelError> for ApiError {
    fn from(err: IntelError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
