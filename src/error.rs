use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{catalog::CatalogRef, response::ErrorResponse};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Product not found: {0}")]
    ProductNotFound(CatalogRef),

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Unauthorized {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("Database error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound | AppError::ProductNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            AppError::DbError(err) => {
                tracing::error!(error = %err, "database error");
                None
            }
            AppError::OrmError(err) => {
                tracing::error!(error = %err, "orm error");
                None
            }
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "internal error");
                None
            }
            AppError::BadRequest(reason) | AppError::Unauthorized(reason) => Some(reason.clone()),
            AppError::ProductNotFound(item) => Some(item.to_string()),
            AppError::NotFound | AppError::Forbidden => None,
        };

        let body = ErrorResponse {
            message: self.to_string(),
            error: detail.or_else(|| status.canonical_reason().map(str::to_string)),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
