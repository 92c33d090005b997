use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;
use tracing::warn;

use correduria_core::domain::client::{Role, Section};
use correduria_core::errors::{classify_storage_error, StorageErrorKind};
use correduria_db::repositories::RepositoryError;

/// User-facing error payload. The message is the fixed Spanish text for
/// the classified kind; raw detail stays in the logs.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

pub type ErrorResponse = (StatusCode, Json<ApiError>);

pub fn storage_error(context: &str, error: &RepositoryError) -> ErrorResponse {
    let kind = match error {
        RepositoryError::NotFound(_) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiError { error: "El registro solicitado no existe.".to_string() }),
            );
        }
        RepositoryError::Conflict(_) => {
            return (
                StatusCode::CONFLICT,
                Json(ApiError {
                    error: "El registro cambió de estado; recarga e intenta de nuevo.".to_string(),
                }),
            );
        }
        other => classify_storage_error(&other.to_string()),
    };

    warn!(
        event_name = "api.storage_error",
        context = context,
        kind = ?kind,
        detail = %error,
        "storage operation failed"
    );

    (status_for(kind), Json(ApiError { error: kind.user_message().to_string() }))
}

fn status_for(kind: StorageErrorKind) -> StatusCode {
    match kind {
        StorageErrorKind::UniqueViolation | StorageErrorKind::ForeignKeyViolation => {
            StatusCode::CONFLICT
        }
        StorageErrorKind::RequiredField | StorageErrorKind::CheckViolation => {
            StatusCode::BAD_REQUEST
        }
        StorageErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        StorageErrorKind::SessionExpired => StatusCode::UNAUTHORIZED,
        StorageErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        StorageErrorKind::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        StorageErrorKind::Network | StorageErrorKind::Storage => StatusCode::SERVICE_UNAVAILABLE,
        StorageErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn bad_request(message: impl Into<String>) -> ErrorResponse {
    (StatusCode::BAD_REQUEST, Json(ApiError { error: message.into() }))
}

pub fn not_found() -> ErrorResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError { error: "El registro solicitado no existe.".to_string() }),
    )
}

/// Resolve the caller's role from the `X-Role` header and require
/// visibility of `section`. Request-scoped: no ambient user state.
pub fn require_role(headers: &HeaderMap, section: Section) -> Result<Role, ErrorResponse> {
    let role = headers
        .get("x-role")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Role>().ok());

    match role {
        Some(role) if role.can_view(section) => Ok(role),
        _ => Err((
            StatusCode::FORBIDDEN,
            Json(ApiError {
                error: StorageErrorKind::Unauthorized.user_message().to_string(),
            }),
        )),
    }
}
