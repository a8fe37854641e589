/*
 * Responsibility
 * - tenant タグ付きの一時クレデンシャル (ScopedCredentials) の発行
 * - CredentialExchange (AssumeRole) の抽象化と STS 実装
 *
 * Notes
 * - リクエストごとに必ず新しく発行する。キャッシュ / リトライはしない
 * - tag 値の妥当性は STS の trust policy (aws:RequestTag/TenantId) が判定する
 */
mod broker;
mod mapping;
mod sts;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::services::token::TokenError;

#[cfg(test)]
pub(crate) use broker::fake;
pub use broker::CredentialBroker;
pub use mapping::{ClaimTagMapping, SessionTag, session_tags};
pub use sts::StsCredentialExchange;

pub const DEFAULT_SESSION_DURATION_SECONDS: i32 = 900;
// STS AssumeRole accepts 15 min .. 12 h
pub const MIN_SESSION_DURATION_SECONDS: i32 = 900;
pub const MAX_SESSION_DURATION_SECONDS: i32 = 43_200;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("claim '{claim}' required for session tag '{tag}' is missing")]
    MissingClaim { tag: String, claim: String },

    #[error("credential exchange failed: {message}")]
    Exchange {
        code: Option<String>,
        message: String,
    },
}

/// Input of a single role assumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    pub role_arn: String,
    pub session_name: String,
    pub duration_seconds: i32,
    pub tags: Vec<SessionTag>,
}

/// Temporary credentials scoped to one request's tenant.
///
/// Owned by the request that minted them and moved into that request's store;
/// dropping the store releases them.
#[derive(Clone)]
pub struct ScopedCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime<Utc>,
    pub tags: Vec<SessionTag>,
}

impl fmt::Debug for ScopedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("ScopedCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("expiration", &self.expiration)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// Role-assumption exchange (STS in production).
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    async fn assume_role(
        &self,
        request: AssumeRoleRequest,
    ) -> Result<ScopedCredentials, CredentialError>;
}
