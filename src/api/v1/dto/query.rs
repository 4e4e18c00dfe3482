/*
 * Responsibility
 * - API 全体で共通のレスポンス封筒 (error / meta / data)
 * - lookup 用のクエリパラメータ (QueryParams)
 * - 成功・失敗どちらでも同じ形の payload を返す
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorLevel {
    Success,
    Warning,
    Error,
    Internal,
}

impl ErrorLevel {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Lookup parameters shared by the query string and store lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impersonated_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryError {
    pub level: ErrorLevel,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryMeta {
    pub total_count: u64,
    pub count: u64,
    pub params: QueryParams,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse<T> {
    pub error: QueryError,
    pub meta: QueryMeta,
    pub data: Vec<T>,
}

impl<T> QueryResponse<T> {
    pub fn ok(data: Vec<T>) -> Self {
        let count = data.len() as u64;
        Self {
            error: QueryError {
                level: ErrorLevel::Success,
                code: "OK",
                message: String::new(),
            },
            meta: QueryMeta {
                total_count: count,
                count,
                params: QueryParams::default(),
            },
            data,
        }
    }

    pub fn failure(level: ErrorLevel, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            error: QueryError {
                level,
                code,
                message: message.into(),
            },
            meta: QueryMeta::default(),
            data: Vec::new(),
        }
    }
}

/// Attached to a handler response whose envelope reports a non-success level.
///
/// The access gate reads this instead of re-parsing the body.
#[derive(Debug, Clone)]
pub struct HandlerOutcome {
    pub level: ErrorLevel,
    pub code: &'static str,
    pub message: String,
}

impl<T: Serialize> IntoResponse for QueryResponse<T> {
    fn into_response(self) -> Response {
        let status = match self.error.level {
            ErrorLevel::Success | ErrorLevel::Warning => StatusCode::OK,
            ErrorLevel::Error | ErrorLevel::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let outcome = (!self.error.level.is_success()).then(|| HandlerOutcome {
            level: self.error.level,
            code: self.error.code,
            message: self.error.message.clone(),
        });

        let mut response = (status, Json(self)).into_response();
        if let Some(outcome) = outcome {
            response.extensions_mut().insert(outcome);
        }
        response
    }
}
