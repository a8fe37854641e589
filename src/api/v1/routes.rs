/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /policies (GET: tenant の一覧, POST: tenant に 1 件追加)
 */
use axum::{Router, routing::get};

use crate::state::AppState;

use crate::api::v1::handlers::policies::{create_policy, list_policies};

pub fn routes() -> Router<AppState> {
    Router::new().route("/policies", get(list_policies).post(create_policy))
}
