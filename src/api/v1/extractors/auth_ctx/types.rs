/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - gate (middleware) が検証して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - JWT/JWKS 検証や role lookup は middleware/services 側の責務
 */

/// 認証済みのリクエストに付与されるコンテキスト
///
/// - `identity` は token の upn (なければ email)。非本番では impersonation で差し替わる
/// - `access_mask` は role check を行った route でのみ `Some`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCtx {
    pub identity: String,
    pub access_mask: Option<i64>,
    pub impersonated: bool,
}

impl AuthCtx {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            access_mask: None,
            impersonated: false,
        }
    }
}
