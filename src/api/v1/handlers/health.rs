/*
 * Responsibility
 * - GET /health (疎通用)
 * - token も AWS も使わない。プロセスが応答できるかだけを見る
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({"status": "ok", "service": env!("CARGO_PKG_NAME")})),
    )
}
