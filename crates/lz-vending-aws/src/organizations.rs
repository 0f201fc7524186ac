//! Organizations adapter.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_organizations::operation::attach_policy::AttachPolicyError;
use aws_sdk_organizations::operation::move_account::MoveAccountError;
use aws_sdk_organizations::types::{
    CreateAccountState as SdkState, CreateAccountStatus as SdkStatus, IamUserAccessToBilling,
};
use aws_sdk_organizations::Client;
use tracing::debug;

use lz_vending_core::{
    AccountId, AccountRequest, BillingAccess, CreateAccountRequestId, CreateAccountState,
    CreateAccountStatus, OrganizationApi, OrganizationalUnit, OrganizationalUnitId, PolicyId,
    RootId, ServiceError, ServiceResult,
};

use crate::sdk::service_error;

const SERVICE: &str = "organizations";

/// [`OrganizationApi`] backed by AWS Organizations in the management account.
#[derive(Debug, Clone)]
pub struct AwsOrganizations {
    client: Client,
}

impl AwsOrganizations {
    /// Create an adapter from the shared SDK configuration.
    #[must_use]
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

fn malformed(what: impl Into<String>) -> ServiceError {
    ServiceError::rejected(SERVICE, "MalformedResponse", what)
}

fn status_from_sdk(status: &SdkStatus) -> ServiceResult<CreateAccountStatus> {
    let request_id = status
        .id()
        .ok_or_else(|| malformed("create account status without id"))
        .and_then(|id| CreateAccountRequestId::new(id).map_err(|e| malformed(e.to_string())))?;

    let state = match status.state() {
        Some(SdkState::InProgress) => CreateAccountState::InProgress,
        Some(SdkState::Succeeded) => CreateAccountState::Succeeded,
        Some(SdkState::Failed) => CreateAccountState::Failed,
        other => return Err(malformed(format!("unknown create account state {other:?}"))),
    };

    let account_id = status
        .account_id()
        .map(str::parse::<AccountId>)
        .transpose()
        .map_err(|e| malformed(e.to_string()))?;

    Ok(CreateAccountStatus {
        request_id,
        state,
        account_id,
        failure_reason: status.failure_reason().map(|r| r.as_str().to_string()),
    })
}

#[async_trait]
impl OrganizationApi for AwsOrganizations {
    async fn create_account(
        &self,
        request: &AccountRequest,
        role_name: &str,
        billing_access: BillingAccess,
    ) -> ServiceResult<CreateAccountStatus> {
        let output = self
            .client
            .create_account()
            .email(&request.email)
            .account_name(&request.name)
            .role_name(role_name)
            .iam_user_access_to_billing(IamUserAccessToBilling::from(billing_access.as_str()))
            .send()
            .await
            .map_err(|e| service_error(SERVICE, &e))?;

        let status = output
            .create_account_status()
            .ok_or_else(|| malformed("create account response without status"))?;
        status_from_sdk(status)
    }

    async fn describe_create_account(
        &self,
        request_id: &CreateAccountRequestId,
    ) -> ServiceResult<CreateAccountStatus> {
        let output = self
            .client
            .describe_create_account_status()
            .create_account_request_id(request_id.as_str())
            .send()
            .await
            .map_err(|e| service_error(SERVICE, &e))?;

        let status = output
            .create_account_status()
            .ok_or_else(|| malformed("describe response without status"))?;
        status_from_sdk(status)
    }

    async fn root_id(&self) -> ServiceResult<RootId> {
        let output = self
            .client
            .list_roots()
            .send()
            .await
            .map_err(|e| service_error(SERVICE, &e))?;

        let id = output
            .roots()
            .first()
            .and_then(|root| root.id())
            .ok_or_else(|| malformed("organization has no root"))?;
        RootId::new(id).map_err(|e| malformed(e.to_string()))
    }

    async fn list_units(&self, parent: &RootId) -> ServiceResult<Vec<OrganizationalUnit>> {
        let mut units = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_organizational_units_for_parent()
                .parent_id(parent.as_str())
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| service_error(SERVICE, &e))?;

            for unit in page.organizational_units() {
                if let (Some(id), Some(name)) = (unit.id(), unit.name()) {
                    units.push(OrganizationalUnit {
                        id: OrganizationalUnitId::new(id).map_err(|e| malformed(e.to_string()))?,
                        name: name.to_string(),
                    });
                }
            }

            match page.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(parent = %parent, count = units.len(), "Listed organizational units");
        Ok(units)
    }

    async fn move_account(
        &self,
        account_id: &AccountId,
        from: &RootId,
        to: &OrganizationalUnitId,
    ) -> ServiceResult<()> {
        match self
            .client
            .move_account()
            .account_id(account_id.as_str())
            .source_parent_id(from.as_str())
            .destination_parent_id(to.as_str())
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(MoveAccountError::is_duplicate_account_exception) =>
            {
                Err(ServiceError::already_exists(
                    SERVICE,
                    format!("account {account_id} is already under {to}"),
                ))
            }
            Err(err) => Err(service_error(SERVICE, &err)),
        }
    }

    async fn attach_policy(&self, policy_id: &PolicyId, target: &AccountId) -> ServiceResult<()> {
        match self
            .client
            .attach_policy()
            .policy_id(policy_id.as_str())
            .target_id(target.as_str())
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(AttachPolicyError::is_duplicate_policy_attachment_exception) =>
            {
                Err(ServiceError::already_exists(
                    SERVICE,
                    format!("policy {policy_id} is already attached to {target}"),
                ))
            }
            Err(err) => Err(service_error(SERVICE, &err)),
        }
    }
}
