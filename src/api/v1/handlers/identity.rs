/*
 * Responsibility
 * - GET /me : gate が解決した identity をそのまま返す (role check なし)
 * - impersonation が効いているかの確認用
 */
use crate::api::v1::{
    dto::{identity::IdentityResponse, query::QueryResponse},
    extractors::AuthCtxExtractor,
};

pub async fn me(AuthCtxExtractor(ctx): AuthCtxExtractor) -> QueryResponse<IdentityResponse> {
    QueryResponse::ok(vec![IdentityResponse {
        identity: ctx.identity,
        impersonated: ctx.impersonated,
    }])
}
