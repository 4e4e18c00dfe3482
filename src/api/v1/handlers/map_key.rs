/*
 * Responsibility
 * - GET /map_key : 設定済みの maps API key を返す (role check あり)
 * - 未設定なら失敗の封筒を返し、gate が 500 に変換する
 */
use axum::extract::State;

use crate::{
    api::v1::{
        dto::query::{ErrorLevel, QueryResponse},
        extractors::AuthCtxExtractor,
    },
    state::AppState,
};

pub async fn map_key(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
) -> QueryResponse<String> {
    match state.maps_api_key.as_deref() {
        Some(key) => {
            tracing::debug!(identity = %ctx.identity, "map key issued");
            QueryResponse::ok(vec![key.to_string()])
        }
        None => QueryResponse::failure(
            ErrorLevel::Error,
            "MAP_KEY_UNAVAILABLE",
            "map key is not configured",
        ),
    }
}
