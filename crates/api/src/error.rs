//! API error types with HTTP response mapping.

use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

/// Request that failed routing, kept for logging.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub path: String,
}

impl RequestInfo {
    pub fn new(method: Method, uri: &Uri) -> Self {
        Self {
            method,
            path: uri.path().to_string(),
        }
    }
}

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No route matches the path.
    NotFound(RequestInfo),
    /// The path exists but not for this method.
    MethodNotAllowed(RequestInfo),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (ApiError::NotFound(request) | ApiError::MethodNotAllowed(request)) = self;

        tracing::debug!(
            status = status.as_u16(),
            method = %request.method,
            path = %request.path,
            "request rejected by router"
        );

        let detail = status.canonical_reason().unwrap_or("Error");
        let body = serde_json::json!({ "detail": detail });
        (status, axum::Json(body)).into_response()
    }
}
