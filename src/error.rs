/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / body)
 * - TokenError / CredentialError / StoreError を統一的に変換
 *
 * Notes
 * - 400 (パラメータ不足など) は text/plain で返す
 * - StoreError は DB のエラーをそのまま JSON にして 500 で返す
 * - それ以外は {"error": {"code", "message"}} 形式
 */
use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::repos::error::StoreError;
use crate::services::credentials::CredentialError;
use crate::services::token::TokenError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request, you are missing the parameter {0}")]
    MissingParameter(&'static str),

    #[error("invalid request, {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("{0}")]
    MissingClaim(String),

    #[error("{0}")]
    CredentialExchange(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CredentialError> for AppError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::Token(e) => AppError::Token(e),
            e @ CredentialError::MissingClaim { .. } => AppError::MissingClaim(e.to_string()),
            e @ CredentialError::Exchange { .. } => AppError::CredentialExchange(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::MissingParameter(_) | AppError::InvalidBody(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    self.to_string(),
                )
                    .into_response();
            }
            AppError::Store(e) => {
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(e)).into_response();
            }
            AppError::Token(TokenError::Malformed { .. }) => {
                (StatusCode::UNAUTHORIZED, "MALFORMED_TOKEN")
            }
            AppError::Token(TokenError::InvalidPayload(_)) => {
                (StatusCode::UNAUTHORIZED, "INVALID_TOKEN_PAYLOAD")
            }
            AppError::MissingClaim(_) => (StatusCode::FORBIDDEN, "MISSING_CLAIM"),
            AppError::CredentialExchange(_) => {
                (StatusCode::BAD_GATEWAY, "CREDENTIAL_EXCHANGE_FAILED")
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}
