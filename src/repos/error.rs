/*
 * Responsibility
 * - record store が上位に伝えるエラーの定義
 * - handler はこれをそのまま JSON にして 500 で返す
 */
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error, Serialize, PartialEq, Eq)]
#[error("{operation} failed: {name}: {message}")]
pub struct StoreError {
    // backend error code (e.g. AccessDeniedException), or a generic name
    pub name: String,
    pub message: String,
    pub operation: &'static str,
}

impl StoreError {
    pub fn new(
        operation: &'static str,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            operation,
        }
    }
}
