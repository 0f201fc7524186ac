//! IAM alias adapter acting inside a member account.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_iam::operation::create_account_alias::CreateAccountAliasError;
use aws_sdk_iam::Client;

use lz_vending_core::{AliasService, ServiceError, ServiceResult, TemporaryCredentials};

use crate::sdk::{assumed_role_credentials, service_error};

const SERVICE: &str = "iam";

/// [`AliasService`] that builds an IAM client per call from member-account credentials.
#[derive(Debug, Clone)]
pub struct IamAliases {
    shared: SdkConfig,
}

impl IamAliases {
    /// Create an adapter; `shared` supplies region, HTTP, retry and timeout settings.
    #[must_use]
    pub fn new(shared: &SdkConfig) -> Self {
        Self {
            shared: shared.clone(),
        }
    }

    fn client(&self, credentials: &TemporaryCredentials) -> Client {
        let config = aws_sdk_iam::config::Builder::from(&self.shared)
            .credentials_provider(assumed_role_credentials(credentials))
            .build();
        Client::from_conf(config)
    }
}

#[async_trait]
impl AliasService for IamAliases {
    async fn set_account_alias(
        &self,
        credentials: &TemporaryCredentials,
        alias: &str,
    ) -> ServiceResult<()> {
        match self
            .client(credentials)
            .create_account_alias()
            .account_alias(alias)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(CreateAccountAliasError::is_entity_already_exists_exception) =>
            {
                Err(ServiceError::already_exists(
                    SERVICE,
                    format!("account alias {alias} already exists"),
                ))
            }
            Err(err) => Err(service_error(SERVICE, &err)),
        }
    }

    async fn list_account_aliases(
        &self,
        credentials: &TemporaryCredentials,
    ) -> ServiceResult<Vec<String>> {
        let output = self
            .client(credentials)
            .list_account_aliases()
            .send()
            .await
            .map_err(|err| service_error(SERVICE, &err))?;
        Ok(output.account_aliases().to_vec())
    }
}
