/*
 * Responsibility
 * - /me の response DTO
 */
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub identity: String,
    pub impersonated: bool,
}
