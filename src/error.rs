use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;

use crate::services::lifecycle::LifecycleError;
use crate::utils::qr::QrError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Storage and internal failures are logged in full, the caller only sees a generic message
        let message = match self {
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => msg,
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "A storage error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidRoute { .. }
            | LifecycleError::UnknownDestination(_)
            | LifecycleError::NoActiveTicket
            | LifecycleError::TicketNotFound(_) => AppError::NotFound(err.to_string()),
            LifecycleError::InvalidCoordinates | LifecycleError::ConfirmationMismatch => {
                AppError::BadRequest(err.to_string())
            }
            LifecycleError::Qr(e) => e.into(),
            LifecycleError::Storage(e) => AppError::Database(e),
            LifecycleError::Artifact(e) => AppError::Internal(format!("Artifact I/O failed: {}", e)),
        }
    }
}

impl From<QrError> for AppError {
    fn from(err: QrError) -> Self {
        match err {
            QrError::NoCodeFound | QrError::MalformedPayload | QrError::UnreadableImage(_) => {
                AppError::BadRequest(err.to_string())
            }
            QrError::Encode(_) => AppError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_errors_map_to_http_status() {
        let invalid_route: AppError = LifecycleError::InvalidRoute {
            from: "City B".to_string(),
            to: "City A".to_string(),
        }
        .into();
        assert_eq!(invalid_route.status_code(), StatusCode::NOT_FOUND);

        let no_ticket: AppError = LifecycleError::NoActiveTicket.into();
        assert_eq!(no_ticket.status_code(), StatusCode::NOT_FOUND);

        let coords: AppError = LifecycleError::InvalidCoordinates.into();
        assert_eq!(coords.status_code(), StatusCode::BAD_REQUEST);

        let storage: AppError = LifecycleError::Storage(DbErr::Custom("boom".into())).into();
        assert_eq!(storage.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_qr_errors_are_client_errors() {
        let err: AppError = LifecycleError::Qr(QrError::NoCodeFound).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: AppError = QrError::MalformedPayload.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
