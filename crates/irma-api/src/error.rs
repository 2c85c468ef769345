use axum::{
    Json,
    extract::rejection::PathRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use irma_db::TransferError;
use irma_types::api::ErrorBody;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid username or password")]
    Unauthorized,

    #[error("permission denied")]
    Permission,

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("insufficient balance")]
    InsufficientFunds,

    #[error("internal error")]
    Persistence(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Permission => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::InsufficientFunds => StatusCode::CONFLICT,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Persistence(e) = &self {
            error!("Persistence failure: {:#}", e);
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<TransferError> for AppError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::NotFound => Self::NotFound,
            TransferError::SelfDealing | TransferError::InvalidAmount => {
                Self::Validation(err.to_string())
            }
            TransferError::InsufficientFunds => Self::InsufficientFunds,
            TransferError::PayeeMissing(_) => Self::Persistence(anyhow::anyhow!(err.to_string())),
            TransferError::Sqlite(e) => Self::Persistence(e.into()),
            TransferError::Internal(e) => Self::Persistence(e),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(format!("invalid path: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_errors_keep_their_meaning() {
        assert_eq!(
            AppError::from(TransferError::InsufficientFunds).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::from(TransferError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(TransferError::SelfDealing).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(TransferError::PayeeMissing("ghost".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn persistence_details_are_not_exposed() {
        let err = AppError::from(anyhow::anyhow!("disk I/O error at page 7"));
        assert_eq!(err.to_string(), "internal error");
    }
}
