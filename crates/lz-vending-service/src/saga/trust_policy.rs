//! Trust-boundary admission.
//!
//! Read-modify-write of the shared policy guarded by the store's version token:
//! a write that lost against a concurrent admission is retried from a fresh read.

use tracing::{info, instrument, warn};

use lz_vending_core::{
    AccountId, Admission, PolicyStore, PolicyWrite, ProvisionError, Result, ServiceError,
    TrustPolicyDocument, VersionedPolicy,
};

use crate::config::TrustPolicyConfig;
use crate::poll::{poll_until, Attempt, Cancellation};

/// Admit `account_id` into the trust-boundary policy and return the stored document.
///
/// # Errors
///
/// Fails when the clause is missing or malformed, on store failures, and when
/// version conflicts outlast the retry schedule.
#[instrument(skip_all, fields(account_id = %account_id, bucket = %config.bucket))]
pub async fn admit(
    store: &dyn PolicyStore,
    account_id: &AccountId,
    config: &TrustPolicyConfig,
    cancel: &Cancellation,
) -> Result<TrustPolicyDocument> {
    let location = config.bucket.as_str();
    let sid = config.clause_sid.as_str();

    poll_until(&config.conflict_retry, cancel, "admit_trust_policy", |attempt| async move {
        let VersionedPolicy {
            mut document,
            version,
        } = match store.get_document(location).await {
            Ok(policy) => policy,
            Err(err @ ServiceError::Unavailable { .. }) => return Attempt::Pending(err.to_string()),
            Err(err) => return Attempt::Failed(ProvisionError::service("get_trust_policy", err)),
        };

        match document.admit(sid, account_id.as_str()) {
            Ok(Admission::Added) => {}
            Ok(Admission::AlreadyAdmitted) => {
                info!("Account already admitted");
                return Attempt::Done(document);
            }
            Err(err) => return Attempt::Failed(err.into()),
        }

        let write = PolicyWrite {
            expected_version: Some(version.as_str()),
            acknowledge_self_lockout_risk: true,
        };
        match store.put_document(location, &document, write).await {
            Ok(()) => {
                info!(attempt, "Account admitted to trust policy");
                Attempt::Done(document)
            }
            Err(err) if err.is_conflict() => {
                warn!(attempt, error = %err, "Trust policy changed concurrently, re-reading");
                Attempt::Pending(err.to_string())
            }
            Err(err) => Attempt::Failed(ProvisionError::service("put_trust_policy", err)),
        }
    })
    .await
}
