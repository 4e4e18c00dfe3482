/// Factory: build `TokenValidator` from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::jwks::HttpJwksSource;
use crate::services::auth::token_validator::{TokenError, TokenValidator};

pub fn build_token_validator(config: &Config) -> Result<Arc<TokenValidator>, TokenError> {
    let source = HttpJwksSource::new(config.jwks_url.clone(), config.jwks_fetch_timeout)?;

    let jwks_url = source.url().to_owned();
    let validator = TokenValidator::new(Arc::new(source), config.entra_id_client_id.clone());

    tracing::info!(
        %jwks_url,
        client_id = validator.client_id(),
        "token validator configured"
    );

    Ok(Arc::new(validator))
}
