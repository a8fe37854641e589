/*
 * Responsibility
 * - policies テーブルへの put / query の抽象 (RecordStore)
 * - ScopedCredentials からリクエスト単位の store を作る (RecordStoreFactory)
 *
 * Notes
 * - store は credentials を所有し、handler のスコープを抜けると drop される
 * - プロセス全体で共有する client は持たない (tenant 間でクレデンシャルが混ざらないように)
 * - tenant の分離は DynamoDB 側の dynamodb:LeadingKeys 条件が保証する
 */
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::repos::error::StoreError;
use crate::services::credentials::ScopedCredentials;

pub type PolicyItem = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSettings {
    pub table_name: String,
    pub partition_key: String,
    pub sort_key: String,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn put_item(&self, item: PolicyItem) -> Result<(), StoreError>;

    /// All items under one partition key. No pagination.
    async fn query_by_partition_key(&self, value: &str) -> Result<Vec<PolicyItem>, StoreError>;
}

pub trait RecordStoreFactory: Send + Sync {
    fn open(&self, credentials: ScopedCredentials) -> Box<dyn RecordStore>;

    fn table(&self) -> &TableSettings;
}
