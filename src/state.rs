/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - broker: CredentialBroker, tenants: TenantResolver, stores: RecordStoreFactory
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 * - リクエストごとのクレデンシャル / DB client はここに置かない
 */
use std::sync::Arc;

use crate::repos::policy_store::RecordStoreFactory;
use crate::services::{credentials::CredentialBroker, tenant::TenantResolver};

#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<CredentialBroker>,
    pub tenants: TenantResolver,
    pub stores: Arc<dyn RecordStoreFactory>,
}

impl AppState {
    pub fn new(
        broker: Arc<CredentialBroker>,
        tenants: TenantResolver,
        stores: Arc<dyn RecordStoreFactory>,
    ) -> Self {
        Self {
            broker,
            tenants,
            stores,
        }
    }
}
