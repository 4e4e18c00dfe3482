//! Operation-level authorization over a user's access mask.
//!
//! The gate calls [`PermissionPolicy::is_op_allowed`] after the mask has been
//! loaded and is known to be non-zero, while the request's store session is
//! still open. A policy that needs more rows reads them through that session.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::api::v1::dto::query::QueryParams;
use crate::api::v1::extractors::AuthCtx;
use crate::repos::UserAccessSession;

/// Access mask bits stored in `sc_user.access_mask`.
pub mod access_bits {
    pub const READ: i64 = 1;
    pub const WRITE: i64 = 1 << 1;
    pub const ADMIN: i64 = 1 << 2;

    /// Names of the known bits set in `mask`, for logs.
    pub fn names(mask: i64) -> Vec<&'static str> {
        [(READ, "read"), (WRITE, "write"), (ADMIN, "admin")]
            .into_iter()
            .filter(|(bit, _)| mask & bit != 0)
            .map(|(_, name)| name)
            .collect()
    }
}

/// Per-request lookup context handed to the permission hook.
///
/// `session` is the one store session opened for this request.
pub struct OperationLookup<'a> {
    pub auth: &'a AuthCtx,
    pub params: &'a QueryParams,
    pub session: &'a mut dyn UserAccessSession,
}

#[async_trait]
pub trait PermissionPolicy: Send + Sync {
    async fn is_op_allowed(&self, operation: &str, lookup: &mut OperationLookup<'_>) -> bool;
}

/// Maps operation names to the bits a caller's mask must contain.
///
/// Operations that were never registered are denied.
#[derive(Debug, Clone, Default)]
pub struct OperationMaskPolicy {
    required: HashMap<String, i64>,
}

impl OperationMaskPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, operation: impl Into<String>, bits: i64) -> Self {
        self.required.insert(operation.into(), bits);
        self
    }
}

#[async_trait]
impl PermissionPolicy for OperationMaskPolicy {
    async fn is_op_allowed(&self, operation: &str, lookup: &mut OperationLookup<'_>) -> bool {
        let Some(required) = self.required.get(operation).copied() else {
            tracing::warn!(operation, "no permission rule registered for operation");
            return false;
        };

        let mask = lookup.auth.access_mask.unwrap_or(0);
        mask != 0 && mask & required == required
    }
}
