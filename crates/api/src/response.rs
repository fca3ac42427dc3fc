//! Shared response helpers for API handlers.
//!
//! List endpoints use a `{ "data": ... }` envelope via [`DataResponse`].
//! Browser-facing flows answer with `302 Found` redirects, optionally
//! carrying a fresh session cookie.

use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: items }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// `302 Found` to `location`.
pub fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(_) => {
            tracing::error!(location, "Refusing to redirect to an invalid location");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `302 Found` to `location`, setting the session cookie on the way.
pub fn redirect_with_cookie(location: &str, cookie: HeaderValue) -> Response {
    let mut response = redirect(location);
    response.headers_mut().append(SET_COOKIE, cookie);
    response
}
