/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health は public、/me と /map_key は access gate を通す
 * - gate の掛け方 (token only / role check) は route ごとにここで決める
 */
use axum::{Router, routing::get};

use crate::middleware::auth::{Gate, access};
use crate::state::AppState;

use crate::api::v1::handlers::{health::health, identity::me, map_key::map_key};

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/health", get(health));

    let me = access::apply(
        Router::new().route("/me", get(me)),
        state.clone(),
        Gate::token_only("me"),
    );

    let map_key = access::apply(
        Router::new().route("/map_key", get(map_key)),
        state,
        Gate::with_roles("map_key"),
    );

    public.merge(me).merge(map_key)
}
