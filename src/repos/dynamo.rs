//! DynamoDB-backed [`RecordStore`].
//!
//! The factory keeps the process-level `SdkConfig` (region, HTTP client) and builds a
//! new client per request whose only credentials are that request's scoped session.
use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    Client,
    config::{Builder as ConfigBuilder, Credentials},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::Blob,
    types::AttributeValue,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Map, Number, Value};

use crate::repos::error::StoreError;
use crate::repos::policy_store::{PolicyItem, RecordStore, RecordStoreFactory, TableSettings};
use crate::services::credentials::ScopedCredentials;

const PROVIDER_NAME: &str = "TenantScopedSession";

#[derive(Clone, Debug)]
pub struct DynamoRecordStoreFactory {
    sdk_config: aws_config::SdkConfig,
    table: TableSettings,
}

impl DynamoRecordStoreFactory {
    pub fn new(sdk_config: aws_config::SdkConfig, table: TableSettings) -> Self {
        Self { sdk_config, table }
    }
}

impl RecordStoreFactory for DynamoRecordStoreFactory {
    fn open(&self, credentials: ScopedCredentials) -> Box<dyn RecordStore> {
        let credentials = Credentials::new(
            credentials.access_key_id,
            credentials.secret_access_key,
            Some(credentials.session_token),
            Some(SystemTime::from(credentials.expiration)),
            PROVIDER_NAME,
        );

        let config = ConfigBuilder::from(&self.sdk_config)
            .credentials_provider(credentials)
            .build();

        Box::new(DynamoRecordStore {
            client: Client::from_conf(config),
            table: self.table.clone(),
        })
    }

    fn table(&self) -> &TableSettings {
        &self.table
    }
}

struct DynamoRecordStore {
    client: Client,
    table: TableSettings,
}

#[async_trait]
impl RecordStore for DynamoRecordStore {
    async fn put_item(&self, item: PolicyItem) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table.table_name)
            .set_item(Some(to_attribute_map(item)))
            .send()
            .await
            .map_err(|e| store_error("PutItem", e))?;

        Ok(())
    }

    async fn query_by_partition_key(&self, value: &str) -> Result<Vec<PolicyItem>, StoreError> {
        let output = self
            .client
            .query()
            .table_name(&self.table.table_name)
            .key_condition_expression("#pk = :tenant")
            .expression_attribute_names("#pk", &self.table.partition_key)
            .expression_attribute_values(":tenant", AttributeValue::S(value.to_string()))
            .send()
            .await
            .map_err(|e| store_error("Query", e))?;

        Ok(output
            .items()
            .iter()
            .map(|item| from_attribute_map(item.clone()))
            .collect())
    }
}

fn store_error<E, R>(operation: &'static str, e: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let name = e.code().unwrap_or("StoreOperationError").to_string();
    let message = e
        .message()
        .map(str::to_owned)
        .unwrap_or_else(|| DisplayErrorContext(&e).to_string());

    StoreError::new(operation, name, message)
}

pub fn to_attribute_map(item: Map<String, Value>) -> HashMap<String, AttributeValue> {
    item.into_iter()
        .map(|(k, v)| (k, to_attribute(v)))
        .collect()
}

pub fn to_attribute(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(values) => AttributeValue::L(values.into_iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(to_attribute_map(map)),
    }
}

pub fn from_attribute_map(item: HashMap<String, AttributeValue>) -> Map<String, Value> {
    // HashMap order is arbitrary; sort so responses are stable.
    let mut pairs: Vec<_> = item.into_iter().collect();
    pairs.sort_by(|(a, _), (b, _)| a.cmp(b));

    pairs
        .into_iter()
        .map(|(k, v)| (k, from_attribute(v)))
        .collect()
}

pub fn from_attribute(value: AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s),
        AttributeValue::N(n) => number(&n),
        AttributeValue::Bool(b) => Value::Bool(b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(values) => Value::Array(values.into_iter().map(from_attribute).collect()),
        AttributeValue::M(map) => Value::Object(from_attribute_map(map)),
        AttributeValue::Ss(values) => Value::Array(values.into_iter().map(Value::String).collect()),
        AttributeValue::Ns(values) => Value::Array(values.iter().map(|n| number(n)).collect()),
        AttributeValue::B(blob) => Value::String(encode_blob(&blob)),
        AttributeValue::Bs(blobs) => Value::Array(
            blobs
                .iter()
                .map(|b| Value::String(encode_blob(b)))
                .collect(),
        ),
        _ => Value::Null,
    }
}

// DynamoDB numbers are decimal strings; keep the text when it does not fit a JSON number.
fn number(n: &str) -> Value {
    if let Ok(i) = n.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(u) = n.parse::<u64>() {
        return Value::Number(u.into());
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(n.to_string()))
}

fn encode_blob(blob: &Blob) -> String {
    STANDARD.encode(blob.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn given_json_item_when_marshalled_then_attribute_types_follow_json_types() {
        let item = json!({
            "tenantId": "acme",
            "premium": 12.5,
            "active": true,
            "note": null,
            "tags": ["a", 1],
            "holder": {"name": "Ana"}
        });
        let Value::Object(item) = item else { unreachable!() };

        let attrs = to_attribute_map(item);

        assert_eq!(attrs["tenantId"], AttributeValue::S("acme".into()));
        assert_eq!(attrs["premium"], AttributeValue::N("12.5".into()));
        assert_eq!(attrs["active"], AttributeValue::Bool(true));
        assert_eq!(attrs["note"], AttributeValue::Null(true));
        assert_eq!(
            attrs["tags"],
            AttributeValue::L(vec![
                AttributeValue::S("a".into()),
                AttributeValue::N("1".into())
            ])
        );
        assert_eq!(
            attrs["holder"],
            AttributeValue::M(HashMap::from([(
                "name".to_string(),
                AttributeValue::S("Ana".into())
            )]))
        );
    }

    #[test]
    fn given_stored_item_when_unmarshalled_then_json_is_restored() {
        let item = HashMap::from([
            ("tenantId".to_string(), AttributeValue::S("acme".into())),
            ("count".to_string(), AttributeValue::N("42".into())),
            ("ratio".to_string(), AttributeValue::N("0.25".into())),
            (
                "colors".to_string(),
                AttributeValue::Ss(vec!["red".into(), "blue".into()]),
            ),
            ("raw".to_string(), AttributeValue::B(Blob::new(b"hi".to_vec()))),
        ]);

        let json = Value::Object(from_attribute_map(item));

        assert_eq!(
            json,
            json!({
                "colors": ["red", "blue"],
                "count": 42,
                "ratio": 0.25,
                "raw": "aGk=",
                "tenantId": "acme"
            })
        );
    }

    #[test]
    fn given_number_outside_json_range_when_unmarshalled_then_text_is_kept() {
        assert_eq!(number("1e400"), Value::String("1e400".into()));
        assert_eq!(number("18446744073709551615"), json!(u64::MAX));
        assert_eq!(number("-7"), json!(-7));
    }
}
