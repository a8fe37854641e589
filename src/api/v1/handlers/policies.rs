/*
 * Responsibility
 * - GET /policies, POST /policies
 * - token → tenant / session tag → 一時クレデンシャル → store 1 回、を順番に行う
 * - tenant の絞り込みは DynamoDB 側の LeadingKeys 条件に任せる (アプリ側でフィルタしない)
 *
 * Notes
 * - store はリクエスト内で作って、関数を抜けるときに drop される
 * - decode / AssumeRole に失敗したら store には触らない
 */
use axum::{Json, body::Bytes, extract::State};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    api::v1::extractors::BearerToken, error::AppError, repos::policy_store::PolicyItem,
    services::tenant::TenantId, state::AppState,
};

pub async fn list_policies(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<Json<Value>, AppError> {
    let token = token.require()?;
    let tenant = resolve(&state, &token)?;

    let credentials = state.broker.issue_for_token(&token).await?;
    let store = state.stores.open(credentials);

    let items = store
        .query_by_partition_key(tenant.as_str())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, tenant = %tenant, "policy query failed");
            AppError::Store(e)
        })?;

    tracing::debug!(tenant = %tenant, count = items.len(), "policies listed");

    Ok(Json(Value::Array(items.into_iter().map(Value::Object).collect())))
}

pub async fn create_policy(
    State(state): State<AppState>,
    token: BearerToken,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    // Checked before any token or credential work.
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::MissingParameter("body"));
    }
    let token = token.require()?;
    let mut item = parse_item(&body)?;

    let tenant = resolve(&state, &token)?;

    let credentials = state.broker.issue_for_token(&token).await?;
    let store = state.stores.open(credentials);

    let table = state.stores.table();
    item.insert(table.partition_key.clone(), Value::String(tenant.to_string()));
    item.insert(table.sort_key.clone(), Value::String(Uuid::new_v4().to_string()));

    store.put_item(item.clone()).await.map_err(|e| {
        tracing::error!(error = %e, tenant = %tenant, "policy put failed");
        AppError::Store(e)
    })?;

    tracing::info!(tenant = %tenant, "policy created");

    Ok(Json(Value::Object(item)))
}

fn resolve(state: &AppState, token: &str) -> Result<TenantId, AppError> {
    let tenant = state.tenants.resolve_token(Some(token))?;
    if tenant.is_sentinel() {
        // The store will refuse it unless a session tag happens to carry the same value.
        tracing::warn!(tenant = %tenant, "token has no usable tenant claim");
    }
    Ok(tenant)
}

fn parse_item(body: &[u8]) -> Result<PolicyItem, AppError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(item)) => Ok(item),
        Ok(_) => Err(AppError::InvalidBody("body must be a JSON object".to_string())),
        Err(e) => Err(AppError::InvalidBody(format!("body is not valid JSON: {e}"))),
    }
}
