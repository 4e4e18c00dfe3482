/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status + 共通封筒 QueryResponse)
 * - gate の拒否理由 / handler の失敗を統一的に変換
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::v1::dto::query::{ErrorLevel, QueryResponse};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {resource}")]
    NotFound { resource: &'static str },
    // The wrapped handler ran but reported a failure of its own.
    #[error("{0}")]
    Downstream(String),
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Downstream(_) | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (level, code) = match &self {
            AppError::Forbidden(_) => (ErrorLevel::Error, "FORBIDDEN"),
            AppError::NotFound { .. } => (ErrorLevel::Error, "NOT_FOUND"),
            AppError::Downstream(_) => (ErrorLevel::Internal, "DOWNSTREAM_FAILURE"),
            AppError::Internal => (ErrorLevel::Internal, "INTERNAL_SERVER_ERROR"),
        };

        let body = QueryResponse::<serde_json::Value>::failure(level, code, self.to_string());

        (self.status(), Json(body)).into_response()
    }
}
