use std::{fmt, sync::Arc};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::services::auth::jwks::KeySetSource;
use crate::services::auth::token_fingerprint;

/// Only RSA signatures are accepted; the header can never pick a symmetric or
/// unsigned algorithm.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

// Errors returned by access-token verification + Entra-specific claim checks.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to fetch JWKS: {0}")]
    KeySetUnavailable(String),
    #[error("failed to fetch JWKS: status {0}")]
    KeySetStatus(u16),
    #[error("no keys found in the JWKS")]
    EmptyKeySet,
    #[error("malformed token header: {0}")]
    MalformedHeader(#[source] jsonwebtoken::errors::Error),
    #[error("key id (kid) not found in the token header")]
    MissingKeyId,
    #[error("kid not found in JWKS")]
    KeyNotFound { kid: String },
    #[error("unsupported signing algorithm: {0:?}")]
    UnsupportedAlgorithm(Algorithm),
    #[error("signing key does not match the token algorithm")]
    KeyMismatch,
    #[error("jwt verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("no appid found in the token")]
    MissingAppId,
    #[error("client id does not match appid")]
    AppIdMismatch,
    #[error("no exp found in the token")]
    MissingExpiry,
    #[error("token has expired")]
    Expired,
}

impl TokenError {
    /// Reason safe to show to the caller. Errors carrying foreign error text
    /// (HTTP client, JWT library) are collapsed to a fixed message.
    pub fn reason(&self) -> String {
        match self {
            Self::KeySetUnavailable(_) | Self::KeySetStatus(_) | Self::EmptyKeySet => {
                "unable to fetch signing keys".to_string()
            }
            Self::MalformedHeader(_) => "malformed token".to_string(),
            Self::Jwt(e) => match e.kind() {
                ErrorKind::InvalidSignature => "invalid token signature".to_string(),
                ErrorKind::InvalidAudience => "invalid token audience".to_string(),
                ErrorKind::ExpiredSignature => "token has expired".to_string(),
                ErrorKind::InvalidAlgorithm => "token algorithm does not match signing key".to_string(),
                ErrorKind::MissingRequiredClaim(claim) => format!("missing required claim: {claim}"),
                _ => "invalid token".to_string(),
            },
            other => other.to_string(),
        }
    }
}

/// Claims this service reads from an Entra ID access token.
///
/// Everything else stays in `extra` untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct DecodedToken {
    #[serde(default)]
    pub upn: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub appid: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DecodedToken {
    /// `upn`, falling back to `email`; empty when neither is usable.
    pub fn identity(&self) -> String {
        [self.upn.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

/// Outcome of a validation call. Never an error: every failure is folded into
/// `valid == false` with a reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub valid: bool,
    pub reason: String,
    pub identity: String,
}

impl AccessDecision {
    fn allow(identity: String) -> Self {
        Self {
            valid: true,
            reason: "token is valid".to_string(),
            identity,
        }
    }

    fn deny(reason: String) -> Self {
        Self {
            valid: false,
            reason,
            identity: String::new(),
        }
    }
}

/// Entra ID access-token verifier.
///
/// - The key set is fetched from `keys` on every call.
/// - Audience and `appid` must both equal the configured client id.
#[derive(Clone)]
pub struct TokenValidator {
    keys: Arc<dyn KeySetSource>,
    client_id: String,
}

impl fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenValidator")
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl TokenValidator {
    pub fn new(keys: Arc<dyn KeySetSource>, client_id: impl Into<String>) -> Self {
        Self {
            keys,
            client_id: client_id.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub async fn validate(&self, token: &str) -> AccessDecision {
        self.validate_at(token, chrono::Utc::now().timestamp()).await
    }

    /// Same as [`validate`](Self::validate) with an explicit "now" (unix seconds).
    pub async fn validate_at(&self, token: &str, now: i64) -> AccessDecision {
        tracing::info!(client_id = %self.client_id, "checking access token");

        match self.verify_at(token, now).await {
            Ok(decoded) => {
                tracing::info!(
                    name = ?decoded.name,
                    iss = ?decoded.iss,
                    tid = ?decoded.extra.get("tid").and_then(serde_json::Value::as_str),
                    "token is valid"
                );
                AccessDecision::allow(decoded.identity())
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    token = %token_fingerprint(token),
                    "access token rejected"
                );
                AccessDecision::deny(err.reason())
            }
        }
    }

    /// Verify signature and claims, returning the decoded token.
    ///
    /// Steps, in order: fetch key set, read the unverified header, locate the
    /// key by `kid`, check algorithm/key family, verify signature + audience,
    /// then check `appid` and strict expiry (`now < exp`).
    pub async fn verify_at(&self, token: &str, now: i64) -> Result<DecodedToken, TokenError> {
        let jwks = self.keys.fetch().await?;
        if jwks.keys.is_empty() {
            return Err(TokenError::EmptyKeySet);
        }

        let header = jsonwebtoken::decode_header(token).map_err(TokenError::MalformedHeader)?;
        let kid = header.kid.as_deref().ok_or(TokenError::MissingKeyId)?;

        let jwk = jwks
            .keys
            .iter()
            .find(|k| k.common.key_id.as_deref() == Some(kid))
            .ok_or_else(|| TokenError::KeyNotFound {
                kid: kid.to_string(),
            })?;

        ensure_rsa_key_for(jwk, header.alg)?;
        let decoding_key = DecodingKey::from_jwk(jwk)?;

        // exp presence is required here; its value is checked below without leeway.
        let mut validation = Validation::new(header.alg);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.required_spec_claims = ["exp", "aud"].into_iter().map(String::from).collect();

        let decoded = jsonwebtoken::decode::<DecodedToken>(token, &decoding_key, &validation)?.claims;

        let appid = decoded.appid.as_deref().ok_or(TokenError::MissingAppId)?;
        if appid != self.client_id {
            return Err(TokenError::AppIdMismatch);
        }

        let exp = decoded.exp.ok_or(TokenError::MissingExpiry)?;
        tracing::debug!(
            exp = ?chrono::DateTime::from_timestamp(exp, 0),
            now = ?chrono::DateTime::from_timestamp(now, 0),
            "token expiry"
        );
        if now >= exp {
            return Err(TokenError::Expired);
        }

        Ok(decoded)
    }
}

fn ensure_rsa_key_for(jwk: &Jwk, alg: Algorithm) -> Result<(), TokenError> {
    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        return Err(TokenError::UnsupportedAlgorithm(alg));
    }

    if !matches!(jwk.algorithm, AlgorithmParameters::RSA(_)) {
        return Err(TokenError::KeyMismatch);
    }

    // Entra keys usually omit `alg`; when present it must agree with the header.
    if let Some(key_alg) = &jwk.common.key_algorithm {
        let agrees = matches!(
            (key_alg, alg),
            (KeyAlgorithm::RS256, Algorithm::RS256)
                | (KeyAlgorithm::RS384, Algorithm::RS384)
                | (KeyAlgorithm::RS512, Algorithm::RS512)
        );
        if !agrees {
            return Err(TokenError::KeyMismatch);
        }
    }

    Ok(())
}
