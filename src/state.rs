/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - validator: TokenValidator, users: UserAccessStore, permissions: PermissionPolicy
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 * - 起動後は read-only (リクエスト間で共有する可変状態は持たない)
 */
use std::sync::Arc;

use crate::repos::UserAccessStore;
use crate::services::access::PermissionPolicy;
use crate::services::auth::TokenValidator;

#[derive(Clone)]
pub struct AppState {
    pub validator: Arc<TokenValidator>,
    pub users: Arc<dyn UserAccessStore>,
    pub permissions: Arc<dyn PermissionPolicy>,
    pub impersonation_enabled: bool,
    pub maps_api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        validator: Arc<TokenValidator>,
        users: Arc<dyn UserAccessStore>,
        permissions: Arc<dyn PermissionPolicy>,
        impersonation_enabled: bool,
    ) -> Self {
        Self {
            validator,
            users,
            permissions,
            impersonation_enabled,
            maps_api_key: None,
        }
    }

    pub fn with_maps_api_key(mut self, key: Option<String>) -> Self {
        self.maps_api_key = key.map(Arc::from);
        self
    }
}
