//! Account creation: submit, poll to terminal, place, attach policy.

use tracing::{error, info, instrument, warn};

use lz_vending_core::{
    resolve_unit, AccountId, AccountRequest, CreateAccountState, OrganizationApi,
    OrganizationalUnitId, PolicyId, ProvisionError, ProvisioningState, Result, ServiceError,
    UnitMatch, ROOT_OU_NAME,
};

use crate::config::{FailureMode, ProvisioningConfig};
use crate::poll::{poll_until, Attempt, Cancellation};

/// Create the account, wait for it, and place it in its organizational unit.
///
/// The returned state names the requested unit, or `"Root"` when none was
/// requested, it does not exist, or relocation degraded.
///
/// # Errors
///
/// Fails on a rejected submission, a failed operation, and on relocation or
/// attachment failures configured as fatal. A poll that gives up or is cancelled
/// after the submission was accepted fails with
/// [`ProvisionError::CreationUnresolved`] carrying the request id, since
/// re-invoking would submit a second account.
#[instrument(skip_all, fields(account_name = %request.name))]
pub async fn create_account(
    organization: &dyn OrganizationApi,
    request: &AccountRequest,
    config: &ProvisioningConfig,
    cancel: &Cancellation,
) -> Result<ProvisioningState> {
    request.validate()?;

    let submitted = organization
        .create_account(request, &config.account_role, config.billing_access)
        .await
        .map_err(|source| {
            error!(error = %source, "Create account submission rejected");
            ProvisionError::SubmissionRejected {
                account_name: request.name.clone(),
                source,
            }
        })?;
    info!(request_id = %submitted.request_id, "Create account submitted");

    let request_id = &submitted.request_id;
    let account_id = poll_until(&config.create_poll, cancel, "create_account", |_| async move {
        let status = match organization.describe_create_account(request_id).await {
            Ok(status) => status,
            Err(err @ ServiceError::Unavailable { .. }) => return Attempt::Pending(err.to_string()),
            Err(err) => {
                return Attempt::Failed(ProvisionError::service("describe_create_account", err))
            }
        };
        match status.state {
            CreateAccountState::InProgress => Attempt::Pending("IN_PROGRESS".into()),
            CreateAccountState::Succeeded => match status.account_id {
                Some(id) => Attempt::Done(id),
                None => Attempt::Failed(ProvisionError::CreationFailed {
                    request_id: request_id.to_string(),
                    reason: "succeeded without an account id".into(),
                }),
            },
            CreateAccountState::Failed => Attempt::Failed(ProvisionError::CreationFailed {
                request_id: request_id.to_string(),
                reason: status
                    .failure_reason
                    .unwrap_or_else(|| "no failure reason reported".into()),
            }),
        }
    })
    .await
    .map_err(|err| err.after_submission(&request.name, Some(request_id.as_str()), None))
    .inspect_err(|err| error!(request_id = %request_id, error = %err, "Account creation did not succeed"))?;
    info!(%account_id, "Account created");

    let (ou_name, organization_unit_id) =
        place_account(organization, &account_id, request.ou_name.as_deref(), config).await?;

    let scp = match &request.scp_id {
        Some(policy_id) => attach_policy(organization, &account_id, policy_id, config).await?,
        None => None,
    };

    Ok(ProvisioningState {
        account_id,
        ou_name,
        organization_unit_id,
        scp,
    })
}

fn under_root() -> (String, Option<OrganizationalUnitId>) {
    (ROOT_OU_NAME.to_string(), None)
}

async fn place_account(
    organization: &dyn OrganizationApi,
    account_id: &AccountId,
    ou_name: Option<&str>,
    config: &ProvisioningConfig,
) -> Result<(String, Option<OrganizationalUnitId>)> {
    let Some(ou_name) = ou_name else {
        info!("No organizational unit requested, account stays under root");
        return Ok(under_root());
    };

    let degrade = |operation: &'static str, err: ServiceError| match config.relocation_failure {
        FailureMode::Degrade => {
            warn!(%account_id, ou_name, error = %err, operation, "Relocation failed, account stays under root");
            Ok(under_root())
        }
        FailureMode::Fatal => Err(ProvisionError::service(operation, err)),
    };

    let root = match organization.root_id().await {
        Ok(root) => root,
        Err(err) => return degrade("list_roots", err),
    };
    let units = match organization.list_units(&root).await {
        Ok(units) => units,
        Err(err) => return degrade("list_organizational_units", err),
    };

    let unit = match resolve_unit(&units, ou_name) {
        UnitMatch::NotFound => {
            warn!(ou_name, "Organizational unit not found, account stays under root");
            return Ok(under_root());
        }
        UnitMatch::Unique(unit) => unit,
        UnitMatch::Ambiguous { first, count } => {
            warn!(ou_name, count, chosen = %first.id, "Organizational unit name is ambiguous, using first match");
            first
        }
    };

    match organization.move_account(account_id, &root, &unit.id).await {
        Ok(()) => {}
        Err(err) if err.is_already_exists() => {
            info!(ou_id = %unit.id, "Account already in organizational unit");
        }
        Err(err) => return degrade("move_account", err),
    }
    info!(ou_name, ou_id = %unit.id, "Account moved");
    Ok((ou_name.to_string(), Some(unit.id.clone())))
}

async fn attach_policy(
    organization: &dyn OrganizationApi,
    account_id: &AccountId,
    policy_id: &PolicyId,
    config: &ProvisioningConfig,
) -> Result<Option<PolicyId>> {
    match organization.attach_policy(policy_id, account_id).await {
        Ok(()) => {}
        Err(err) if err.is_already_exists() => {
            info!(%policy_id, "Policy already attached");
        }
        Err(err) => {
            return match config.policy_attachment_failure {
                FailureMode::Degrade => {
                    warn!(%policy_id, error = %err, "Policy attachment failed, continuing without it");
                    Ok(None)
                }
                FailureMode::Fatal => {
                    error!(%policy_id, error = %err, "Policy attachment failed");
                    Err(ProvisionError::service("attach_policy", err))
                }
            };
        }
    }
    info!(%policy_id, "Policy attached");
    Ok(Some(policy_id.clone()))
}
