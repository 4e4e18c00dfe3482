//! Access gate: bearer token (Entra ID JWT) → identity → optional role check
//! → AuthCtx を extensions に入れて handler へ
//!
//! 流れ:
//! 1. `Authorization: Bearer <jwt>` を取り出す (なければ forbidden)
//! 2. TokenValidator で JWKS 署名検証 + aud/appid/exp を確認
//! 3. 非本番のみ `impersonated_user` で identity を差し替え可能
//! 4. role check 有効時: user store から access_mask を 1 回だけ読み、
//!    PermissionPolicy で operation を評価 (session は hook にも渡し、この区間だけ保持)
//! 5. handler 実行。role check 有効時、handler 自身の失敗は 500 として返す
//!
//! 拒否はすべて AppError → 共通封筒 (QueryResponse) に変換される。

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};

use crate::api::v1::dto::query::{HandlerOutcome, QueryParams};
use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::access::{OperationLookup, access_bits};
use crate::state::AppState;

const ZERO_MASK_REASON: &str =
    "user does not have the required role to access this resource (access mask is 0)";
const USER_NOT_FOUND_REASON: &str = "user not found in the database";

/// Per-route gate settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    /// Operation name handed to the permission policy.
    pub operation: &'static str,
    pub check_for_roles: bool,
}

impl Gate {
    /// Token check only; no user-store access.
    pub const fn token_only(operation: &'static str) -> Self {
        Self {
            operation,
            check_for_roles: false,
        }
    }

    /// Token check plus access-mask lookup and permission evaluation.
    pub const fn with_roles(operation: &'static str) -> Self {
        Self {
            operation,
            check_for_roles: true,
        }
    }
}

#[derive(Clone)]
struct GateState {
    app: AppState,
    gate: Gate,
}

/// 渡された routes に gate を掛ける。
///
/// 例：
/// ```ignore
/// let map_key = Router::new().route("/map_key", get(map_key));
/// let map_key = middleware::auth::access::apply(map_key, state.clone(), Gate::with_roles("map_key"));
/// ```
pub fn apply(router: Router<AppState>, state: AppState, gate: Gate) -> Router<AppState> {
    // route_layer: 未マッチの path (404) には gate を掛けない
    router.route_layer(middleware::from_fn_with_state(
        GateState { app: state, gate },
        access_middleware,
    ))
}

async fn access_middleware(
    State(GateState { app, gate }): State<GateState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    tracing::info!(
        operation = gate.operation,
        check_for_roles = gate.check_for_roles,
        "checking access"
    );

    match check_access(&app, gate, req, next).await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(
                operation = gate.operation,
                check_for_roles = gate.check_for_roles,
                error = %err,
                "access check failed"
            );
            err.into_response()
        }
    }
}

async fn check_access(
    state: &AppState,
    gate: Gate,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())?.to_owned();

    let decision = state.validator.validate(&token).await;
    if !decision.valid {
        return Err(AppError::forbidden(decision.reason));
    }
    if decision.identity.is_empty() {
        return Err(AppError::forbidden("user not found in the token"));
    }

    let mut ctx = AuthCtx::new(decision.identity);

    if state.impersonation_enabled
        && let Some(user) = impersonated_user(req.uri())
    {
        tracing::warn!(
            token_user = %ctx.identity,
            impersonated_user = %user,
            "impersonation override applied"
        );
        ctx.identity = user;
        ctx.impersonated = true;
    }

    tracing::info!(identity = %ctx.identity, "active user");

    if !gate.check_for_roles {
        req.extensions_mut().insert(ctx);
        return Ok(next.run(req).await);
    }

    let access_mask = authorize_operation(state, gate.operation, &ctx).await?;
    ctx.access_mask = Some(access_mask);

    tracing::info!(
        operation = gate.operation,
        identity = %ctx.identity,
        access_mask,
        roles = ?access_bits::names(access_mask),
        "gate allowed"
    );

    req.extensions_mut().insert(ctx);
    let response = next.run(req).await;

    // handler は許可後に実行された。失敗は forbidden ではなく internal として返す
    if let Some(outcome) = response.extensions().get::<HandlerOutcome>() {
        tracing::warn!(
            operation = gate.operation,
            level = ?outcome.level,
            code = outcome.code,
            "handler reported a failure"
        );
        return Err(AppError::Downstream(outcome.message.clone()));
    }

    Ok(response)
}

/// Load the caller's access mask and run the permission policy.
///
/// The store session is opened and dropped inside this function, so it is
/// released on every return path and never held while the handler runs.
async fn authorize_operation(
    state: &AppState,
    operation: &'static str,
    ctx: &AuthCtx,
) -> Result<i64, AppError> {
    let mut session = state.users.open_session().await.map_err(|err| {
        tracing::error!(error = %err, "failed to open user store session");
        AppError::forbidden(USER_NOT_FOUND_REASON)
    })?;

    let lookup = QueryParams::default();

    let rows = session
        .fetch_user_rows(&lookup, &ctx.identity)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, identity = %ctx.identity, "user lookup failed");
            AppError::forbidden(USER_NOT_FOUND_REASON)
        })?;

    let access_mask = rows
        .first()
        .map(|row| row.access_mask)
        .ok_or_else(|| AppError::forbidden(USER_NOT_FOUND_REASON))?;

    if access_mask == 0 {
        return Err(AppError::forbidden(ZERO_MASK_REASON));
    }

    let ctx = AuthCtx {
        access_mask: Some(access_mask),
        ..ctx.clone()
    };

    let mut op_lookup = OperationLookup {
        auth: &ctx,
        params: &lookup,
        session: session.as_mut(),
    };

    if !state.permissions.is_op_allowed(operation, &mut op_lookup).await {
        return Err(AppError::forbidden(format!(
            "user does not have the required role to access this resource ({operation})"
        )));
    }

    Ok(access_mask)
}

/// `<scheme> <token>` with a case-insensitive `bearer` scheme, nothing more.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let raw = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::forbidden("authorization header missing"))?
        .to_str()
        .map_err(|_| AppError::forbidden("malformed authorization header"))?;

    let mut parts = raw.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (None, _, _) => Err(AppError::forbidden("authorization header missing")),
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        (Some(_), Some(_), None) => Err(AppError::forbidden("invalid or missing bearer scheme")),
        _ => Err(AppError::forbidden("malformed authorization header")),
    }
}

/// First `impersonated_user` pair in the query string, trimmed; other
/// parameters are not parsed here.
fn impersonated_user(uri: &Uri) -> Option<String> {
    url::form_urlencoded::parse(uri.query()?.as_bytes())
        .find(|(key, _)| key == "impersonated_user")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
