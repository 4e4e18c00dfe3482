//! Signing-key set sources.
//!
//! The validator asks a [`KeySetSource`] for the identity provider's current
//! JWKS on every call. Nothing is cached: a rotated key is picked up on the
//! next request, and an unreachable provider fails that request closed.

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use serde::Deserialize;
use serde_json::Value;

use crate::services::auth::token_validator::TokenError;

#[async_trait]
pub trait KeySetSource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, TokenError>;
}

/// Fetches the JWKS document over HTTP with a bounded timeout.
#[derive(Clone, Debug)]
pub struct HttpJwksSource {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct RawJwks {
    #[serde(default)]
    keys: Vec<Value>,
}

impl HttpJwksSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TokenError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TokenError::KeySetUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl KeySetSource for HttpJwksSource {
    async fn fetch(&self) -> Result<JwkSet, TokenError> {
        tracing::debug!(url = %self.url, "fetching jwks");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| TokenError::KeySetUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TokenError::KeySetStatus(status.as_u16()));
        }

        let raw: RawJwks = response
            .json()
            .await
            .map_err(|e| TokenError::KeySetUnavailable(e.to_string()))?;

        let keys = parse_keys(raw.keys);
        if keys.is_empty() {
            return Err(TokenError::EmptyKeySet);
        }

        Ok(JwkSet { keys })
    }
}

// One unparseable entry must not take down the rest of the set.
fn parse_keys(raw: Vec<Value>) -> Vec<Jwk> {
    raw.into_iter()
        .filter_map(|v| match serde_json::from_value::<Jwk>(v) {
            Ok(jwk) => Some(jwk),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring unparseable jwk");
                None
            }
        })
        .collect()
}
