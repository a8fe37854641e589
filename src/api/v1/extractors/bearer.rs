/*
 * Responsibility
 * - Authorization ヘッダから identity token を取り出す
 * - Cognito authorizer 経由だと生の token、クライアント直だと "Bearer <token>" の両方を受ける
 *
 * Notes
 * - 失敗しない extractor。ヘッダが無い場合の扱い (400) は handler が決める
 *   (create は body チェックを先に行うため)
 * - ここでは検証しない。decode は services::token の責務
 * - ASCII 以外を含むヘッダも「無い」扱いにはしない (decode 側で 401 になる)
 */
use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    pub fn from_header_value(raw: &str) -> Option<String> {
        let raw = raw.trim();
        let token = match raw.split_once(' ') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
            _ => raw,
        };
        // a bare scheme with no credentials
        if token.is_empty() || token.eq_ignore_ascii_case("bearer") {
            return None;
        }
        Some(token.to_string())
    }

    /// Token or the 400 the handlers answer with when it is absent.
    pub fn require(self) -> Result<String, AppError> {
        self.0.ok_or(AppError::MissingParameter("Authorization"))
    }
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .and_then(|raw| Self::from_header_value(&raw));

        Ok(BearerToken(token))
    }
}
