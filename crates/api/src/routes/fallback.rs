//! JSON responses for requests the router cannot dispatch.

use axum::http::{Method, Uri};

use crate::error::{ApiError, RequestInfo};

/// Fallback for paths with no route.
pub async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound(RequestInfo::new(method, &uri))
}

/// Fallback for known paths requested with an unsupported method.
pub async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::MethodNotAllowed(RequestInfo::new(method, &uri))
}
