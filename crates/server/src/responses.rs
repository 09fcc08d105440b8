use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use warung_core::errors::{ApplicationError, InterfaceError};

const CORRELATION_HEADER: &str = "x-correlation-id";

/// Caller-supplied correlation id, or a fresh one.
pub fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

pub fn data<T: Serialize>(value: T) -> Json<Value> {
    Json(json!({ "success": true, "data": value }))
}

pub fn message(text: &str) -> Json<Value> {
    Json(json!({ "success": true, "message": text }))
}

/// Unwraps a JSON body, turning extractor rejections into 400s.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        ApiError::bad_request(format!("invalid payload: {}", rejection.body_text()))
    })
}

/// `{success: false, error}` with an HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self { status, error: error.into() }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    pub fn not_found(error: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error)
    }

    pub fn unauthorized(error: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, error)
    }

    pub fn unavailable(error: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, error)
    }

    /// Maps an application failure through the interface taxonomy.
    pub fn from_application(error: ApplicationError, correlation_id: &str) -> Self {
        let interface = error.into_interface(correlation_id);
        if interface.status_code() >= 500 {
            warn!(
                event_name = "interface.request.failed",
                correlation_id,
                status = interface.status_code(),
                error = %interface,
                "request failed"
            );
        }
        Self::from(interface)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<InterfaceError> for ApiError {
    fn from(value: InterfaceError) -> Self {
        let status =
            StatusCode::from_u16(value.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self { status, error: value.message().to_owned() }
    }
}

/// Fallback for paths no router claims.
pub async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "success": false, "error": self.error }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, StatusCode};

    use warung_core::errors::{ApplicationError, DomainError};

    use super::{correlation_id, ApiError};

    #[test]
    fn correlation_id_prefers_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-correlation-id", HeaderValue::from_static("req-42"));
        assert_eq!(correlation_id(&headers), "req-42");
        assert!(!correlation_id(&HeaderMap::new()).is_empty());
    }

    #[test]
    fn application_errors_keep_their_status() {
        let not_found = ApiError::from_application(
            DomainError::NotFound { entity: "order", id: "ORD-9".to_owned() }.into(),
            "req-1",
        );
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let busy =
            ApiError::from_application(ApplicationError::Integration("full".to_owned()), "req-2");
        assert_eq!(busy.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
