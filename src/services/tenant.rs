/*
 * Responsibility
 * - token の claims から TenantId を決める
 * - token なし / claim なし をそれぞれ別の sentinel にする (空文字は返さない)
 * - decode 失敗は握りつぶさず呼び出し側に返す (fail-closed)
 */
use std::fmt;

use crate::services::token::{TokenError, UnverifiedClaims, decode_unverified};

pub const DEFAULT_TENANT_CLAIM: &str = "custom:tenantId";

/// Tenant identifier used as the partition key value. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantId(String);

impl TenantId {
    /// Caller supplied no token at all.
    pub const NO_TOKEN: &'static str = "HARD_WAY";
    /// Token decoded, but the tenant claim is absent, empty or not a string.
    pub const CLAIM_MISSING: &'static str = "UNKNOWN";

    fn no_token() -> Self {
        Self(Self::NO_TOKEN.to_string())
    }

    fn claim_missing() -> Self {
        Self(Self::CLAIM_MISSING.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_sentinel(&self) -> bool {
        self.0 == Self::NO_TOKEN || self.0 == Self::CLAIM_MISSING
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<TenantId> for String {
    fn from(tenant: TenantId) -> Self {
        tenant.0
    }
}

#[derive(Debug, Clone)]
pub struct TenantResolver {
    claim: String,
}

impl Default for TenantResolver {
    fn default() -> Self {
        Self::new(DEFAULT_TENANT_CLAIM)
    }
}

impl TenantResolver {
    pub fn new(claim: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
        }
    }

    pub fn resolve_token(&self, token: Option<&str>) -> Result<TenantId, TokenError> {
        resolve_tenant(token, &self.claim)
    }
}

/// Tenant of `token`, read from the `claim` claim.
pub fn resolve_tenant(token: Option<&str>, claim: &str) -> Result<TenantId, TokenError> {
    match token {
        None | Some("") => Ok(TenantId::no_token()),
        Some(token) => {
            let claims = decode_unverified(token)?;
            Ok(tenant_from_claims(&claims, claim))
        }
    }
}

fn tenant_from_claims(claims: &UnverifiedClaims, claim: &str) -> TenantId {
    match claims.get_str(claim) {
        Some(tenant) if !tenant.is_empty() => TenantId(tenant.to_string()),
        _ => TenantId::claim_missing(),
    }
}
