pub mod factory;
pub mod jwks;
pub mod token_validator;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

pub use factory::build_token_validator;
pub use token_validator::TokenValidator;

/// Short, non-reversible token id for log correlation. Tokens are never logged.
pub fn token_fingerprint(token: &str) -> String {
    let mut fp = URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()));
    fp.truncate(16);
    fp
}
