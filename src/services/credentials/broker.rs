use std::sync::Arc;

use uuid::Uuid;

use crate::services::credentials::{
    AssumeRoleRequest, ClaimTagMapping, CredentialError, CredentialExchange, ScopedCredentials,
    session_tags,
};
use crate::services::token::decode_unverified;

const SESSION_NAME_PREFIX: &str = "tenant-policies";

/// Decode `token`, tag a role session from its claims and assume `role_arn`.
///
/// A usable token is required: decode failures are returned, never replaced by an
/// anonymous tenant.
pub async fn issue_scoped_credentials(
    exchange: &dyn CredentialExchange,
    token: &str,
    role_arn: &str,
    mapping: &ClaimTagMapping,
    duration_seconds: i32,
) -> Result<ScopedCredentials, CredentialError> {
    let claims = decode_unverified(token)?;
    let tags = session_tags(mapping, &claims)?;

    let request = AssumeRoleRequest {
        role_arn: role_arn.to_string(),
        session_name: format!("{SESSION_NAME_PREFIX}-{}", Uuid::new_v4().simple()),
        duration_seconds,
        tags,
    };

    tracing::debug!(
        role_arn = %request.role_arn,
        session_name = %request.session_name,
        sub = ?claims.registered().sub,
        tag_keys = ?request.tags.iter().map(|t| t.key.as_str()).collect::<Vec<_>>(),
        "assuming tenant-scoped role"
    );

    exchange.assume_role(request).await
}

/// Broker bound to the process configuration (role, mapping, duration).
#[derive(Clone)]
pub struct CredentialBroker {
    exchange: Arc<dyn CredentialExchange>,
    role_arn: String,
    mapping: ClaimTagMapping,
    duration_seconds: i32,
}

impl std::fmt::Debug for CredentialBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBroker")
            .field("role_arn", &self.role_arn)
            .field("mapping", &self.mapping)
            .field("duration_seconds", &self.duration_seconds)
            .finish_non_exhaustive()
    }
}

impl CredentialBroker {
    pub fn new(
        exchange: Arc<dyn CredentialExchange>,
        role_arn: impl Into<String>,
        mapping: ClaimTagMapping,
        duration_seconds: i32,
    ) -> Self {
        Self {
            exchange,
            role_arn: role_arn.into(),
            mapping,
            duration_seconds,
        }
    }

    pub async fn issue_for_token(&self, token: &str) -> Result<ScopedCredentials, CredentialError> {
        issue_scoped_credentials(
            self.exchange.as_ref(),
            token,
            &self.role_arn,
            &self.mapping,
            self.duration_seconds,
        )
        .await
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use crate::services::credentials::{
        AssumeRoleRequest, CredentialError, CredentialExchange, ScopedCredentials,
    };

    /// Records every request; answers with fixed credentials or a fixed failure.
    #[derive(Default)]
    pub struct RecordingExchange {
        pub requests: Mutex<Vec<AssumeRoleRequest>>,
        pub reject: bool,
    }

    impl RecordingExchange {
        pub fn rejecting() -> Self {
            Self {
                reject: true,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn last(&self) -> Option<AssumeRoleRequest> {
            self.requests.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl CredentialExchange for RecordingExchange {
        async fn assume_role(
            &self,
            request: AssumeRoleRequest,
        ) -> Result<ScopedCredentials, CredentialError> {
            self.requests.lock().unwrap().push(request.clone());

            if self.reject {
                return Err(CredentialError::Exchange {
                    code: Some("AccessDenied".into()),
                    message: "not authorized to perform sts:TagSession".into(),
                });
            }

            Ok(ScopedCredentials {
                access_key_id: "ASIAFAKE".into(),
                secret_access_key: "fake-secret".into(),
                session_token: "fake-session".into(),
                expiration: Utc::now() + Duration::seconds(request.duration_seconds.into()),
                tags: request.tags,
            })
        }
    }
}
