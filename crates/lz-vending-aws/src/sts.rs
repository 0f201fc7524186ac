//! STS role-assumption adapter.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sts::Client;

use lz_vending_core::{IdentityBroker, ServiceError, ServiceResult, TemporaryCredentials};

use crate::sdk::service_error;

const SERVICE: &str = "sts";

/// [`IdentityBroker`] backed by STS in the management account.
#[derive(Debug, Clone)]
pub struct StsBroker {
    client: Client,
}

impl StsBroker {
    /// Create an adapter from the shared SDK configuration.
    #[must_use]
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl IdentityBroker for StsBroker {
    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> ServiceResult<TemporaryCredentials> {
        let output = self
            .client
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .send()
            .await
            .map_err(|e| service_error(SERVICE, &e))?;

        let credentials = output.credentials().ok_or_else(|| {
            ServiceError::rejected(SERVICE, "MalformedResponse", "assume role returned no credentials")
        })?;

        let expiration = credentials.expiration();
        Ok(TemporaryCredentials {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().to_string(),
            expiration: chrono::DateTime::from_timestamp(expiration.secs(), expiration.subsec_nanos()),
        })
    }
}
