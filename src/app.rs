/*
 * Responsibility
 * - tracing / panic hook の初期化
 * - Config読み込み → 依存生成 (validator, user store, policy) → Router 組み立て
 * - Middleware の適用 (request id / timeout / trace)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::Result;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    config::Config,
    error::AppError,
    middleware,
    repos::PgUserAccessStore,
    services::{
        access::{OperationMaskPolicy, access_bits},
        auth::build_token_validator,
    },
    state::AppState,
};

fn init_tracing() {
    // RUST_LOG=info,fv_webapi=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );
    if config.impersonation_enabled() {
        tracing::warn!("impersonation via ?impersonated_user= is enabled");
    }

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState> {
    let validator = build_token_validator(config)?;
    let users = PgUserAccessStore::connect(&config.database_url, config.db_max_connections).await?;
    let policy = OperationMaskPolicy::new().require("map_key", access_bits::READ);

    Ok(AppState::new(
        validator,
        Arc::new(users),
        Arc::new(policy),
        config.impersonation_enabled(),
    )
    .with_maps_api_key(config.maps_api_key.clone()))
}

fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .nest("/api/v1", api::v1::routes(state.clone()))
        .fallback(|| async { AppError::not_found("route") })
        .with_state(state);

    middleware::http::apply(router, config.request_timeout)
}
