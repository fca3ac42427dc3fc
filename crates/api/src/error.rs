use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nvoi_core::error::CoreError;
use serde::Serialize;

/// PostgreSQL `unique_violation`.
const PG_UNIQUE_VIOLATION: &str = "23505";

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Error type returned by HTTP handlers.
///
/// Domain failures arrive as [`CoreError`]; the remaining variants cover
/// what only the HTTP layer knows about. Every variant renders as
/// `{ "error": <message>, "code": <CODE> }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed or incomplete input, shown to the user as is.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A missing resource described in words rather than by id.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl AppError {
    /// The 401 returned to API callers without a session.
    pub fn unauthorized() -> Self {
        AppError::Core(CoreError::Unauthorized("Unauthorized".into()))
    }

    /// Re-shape a domain failure for a form action.
    ///
    /// Forms show the bare message with a 400 whatever the domain category;
    /// internal and database errors keep their 500.
    pub fn into_form_error(self) -> Self {
        match self {
            internal @ AppError::Core(CoreError::Internal(_)) => internal,
            AppError::Core(core) => AppError::BadRequest(core.message()),
            other => other,
        }
    }

    /// Status, machine code and client-facing message.
    ///
    /// Internal details are logged here and replaced by a generic message.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Core(CoreError::NotFound { .. }) | AppError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", self.client_message())
            }
            AppError::Core(CoreError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Core(CoreError::Conflict(msg)) => {
                (StatusCode::CONFLICT, "CONFLICT", msg.clone())
            }
            AppError::Core(CoreError::Unauthorized(msg)) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
            AppError::Core(CoreError::Forbidden(msg)) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Database(err) => database_parts(err),
            AppError::Core(CoreError::Internal(msg)) | AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Core(core) => core.message(),
            AppError::NotFound(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<nvoi_worker::WorkerError> for AppError {
    fn from(err: nvoi_worker::WorkerError) -> Self {
        match err {
            nvoi_worker::WorkerError::Database(e) => AppError::Database(e),
            other => AppError::InternalError(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error) = self.parts();
        (status, Json(ErrorBody { error, code })).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_MESSAGE.to_string(),
    )
}

/// `RowNotFound` is a 404 and unique violations a 409; anything else is
/// logged and reported as a bare 500.
fn database_parts(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(PG_UNIQUE_VIOLATION) => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            tracing::debug!(constraint, "Unique constraint violated");
            (
                StatusCode::CONFLICT,
                "CONFLICT",
                "A record with these details already exists".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn unauthorized_maps_to_401() {
        let response = AppError::unauthorized().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn form_error_flattens_domain_categories() {
        let err = AppError::Core(CoreError::Conflict("Email already registered".into()));
        assert_matches!(
            err.into_form_error(),
            AppError::BadRequest(msg) if msg == "Email already registered"
        );
    }

    #[test]
    fn form_error_keeps_internal_errors() {
        let err = AppError::Core(CoreError::Internal("boom".into()));
        assert_matches!(err.into_form_error(), AppError::Core(CoreError::Internal(_)));

        let err = AppError::InternalError("boom".into());
        let response = err.into_form_error().into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = AppError::Core(CoreError::not_found("Invite", "abc")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let (_, code, message) = AppError::NotFound("No workspace found".into()).parts();
        assert_eq!(code, "NOT_FOUND");
        assert_eq!(message, "No workspace found");
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let (status, _, message) = AppError::InternalError("pool exhausted".into()).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, INTERNAL_MESSAGE);
    }
}
