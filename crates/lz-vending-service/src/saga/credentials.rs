//! Cross-account credentials for a freshly created account.

use tracing::{debug, info, instrument};

use lz_vending_core::{role_arn, AccountId, IdentityBroker, Result, TemporaryCredentials};

use crate::config::ProvisioningConfig;
use crate::poll::{poll_until, Attempt, Cancellation};

/// Assume the bootstrap role in `account_id`.
///
/// The role only becomes assumable some time after the account exists, so every
/// broker error is retried on `config.role_retry` until the schedule runs out.
///
/// # Errors
///
/// `RetriesExhausted` carrying the last broker error, or `Cancelled`.
#[instrument(skip_all, fields(account_id = %account_id, role = %config.account_role))]
pub async fn assume_role(
    broker: &dyn IdentityBroker,
    account_id: &AccountId,
    config: &ProvisioningConfig,
    cancel: &Cancellation,
) -> Result<TemporaryCredentials> {
    let role = role_arn(&config.partition, account_id, &config.account_role);
    let arn = role.as_str();
    let session = config.session_name.as_str();

    let credentials = poll_until(&config.role_retry, cancel, "assume_role", |attempt| async move {
        match broker.assume_role(arn, session).await {
            Ok(credentials) => Attempt::Done(credentials),
            Err(err) => {
                debug!(attempt, error = %err, "Role not assumable yet");
                Attempt::Pending(err.to_string())
            }
        }
    })
    .await?;

    info!(expiration = ?credentials.expiration, "Assumed bootstrap role");
    Ok(credentials)
}
