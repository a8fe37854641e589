//! STS-backed [`CredentialExchange`].
//!
//! The caller (this service's execution role) must be trusted by the target role for
//! both `sts:AssumeRole` and `sts:TagSession`, and the trust policy must require the
//! tag keys requested here. STS rejects the call otherwise.
use async_trait::async_trait;
use aws_sdk_sts::{
    Client,
    error::{DisplayErrorContext, ProvideErrorMetadata},
    types::Tag,
};
use chrono::{DateTime, Utc};

use crate::services::credentials::{
    AssumeRoleRequest, CredentialError, CredentialExchange, ScopedCredentials,
};

#[derive(Clone, Debug)]
pub struct StsCredentialExchange {
    client: Client,
}

impl StsCredentialExchange {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl CredentialExchange for StsCredentialExchange {
    async fn assume_role(
        &self,
        request: AssumeRoleRequest,
    ) -> Result<ScopedCredentials, CredentialError> {
        let mut tags = Vec::with_capacity(request.tags.len());
        for tag in &request.tags {
            let tag = Tag::builder()
                .key(&tag.key)
                .value(&tag.value)
                .build()
                .map_err(|e| CredentialError::Exchange {
                    code: None,
                    message: e.to_string(),
                })?;
            tags.push(tag);
        }

        let output = self
            .client
            .assume_role()
            .role_arn(&request.role_arn)
            .role_session_name(&request.session_name)
            .duration_seconds(request.duration_seconds)
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(|e| {
                let code = e.code().map(str::to_owned);
                tracing::warn!(
                    role_arn = %request.role_arn,
                    code = ?code,
                    error = %DisplayErrorContext(&e),
                    "sts:AssumeRole failed"
                );
                CredentialError::Exchange {
                    code,
                    message: e
                        .message()
                        .map(str::to_owned)
                        .unwrap_or_else(|| DisplayErrorContext(&e).to_string()),
                }
            })?;

        let credentials = output.credentials().ok_or_else(|| CredentialError::Exchange {
            code: None,
            message: "AssumeRole returned no credentials".to_string(),
        })?;

        let expiration = credentials.expiration();
        let expiration = DateTime::<Utc>::from_timestamp(expiration.secs(), expiration.subsec_nanos())
            .ok_or_else(|| CredentialError::Exchange {
                code: None,
                message: "AssumeRole returned an out-of-range expiration".to_string(),
            })?;

        Ok(ScopedCredentials {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().to_string(),
            expiration,
            tags: request.tags,
        })
    }
}
