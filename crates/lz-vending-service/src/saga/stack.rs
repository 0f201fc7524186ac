//! Bootstrap stack deployment.
//!
//! The stack's status is never stored; each poll classifies the latest lifecycle
//! event. Only whole-stack events can end the loop.

use tracing::{error, info, instrument, warn};

use lz_vending_core::{
    ProvisionError, Result, RetryPolicy, ServiceError, StackDescription, StackService, StackSpec,
    StackStatus, TemporaryCredentials,
};

use crate::poll::{poll_until, Attempt, Cancellation};

/// Create the stack described by `spec` and wait for a terminal whole-stack event.
///
/// A stack that already exists is not an error: polling resumes on it, and a
/// stack that has since settled after an update is accepted as deployed.
///
/// # Errors
///
/// `StackRolledBack` on a terminal rollback, `StackUnusable` for an existing stack
/// stuck in a failed update rollback or deletion, service errors from creation or
/// description, `RetriesExhausted` or `Cancelled` from the poll.
#[instrument(skip_all, fields(stack_name = %spec.stack_name, region = %spec.region))]
pub async fn deploy(
    stacks: &dyn StackService,
    credentials: &TemporaryCredentials,
    spec: &StackSpec,
    poll: &RetryPolicy,
    cancel: &Cancellation,
) -> Result<StackDescription> {
    match stacks.create_stack(credentials, spec).await {
        Ok(stack_id) => info!(%stack_id, "Stack creation started"),
        Err(err) if err.is_already_exists() => {
            warn!("Stack already exists, resuming its deployment");
        }
        Err(err) => {
            error!(error = %err, "Stack creation rejected");
            return Err(ProvisionError::service("create_stack", err));
        }
    }

    let stack_name = spec.stack_name.as_str();
    let region = spec.region.as_str();
    poll_until(poll, cancel, "describe_stack_events", |attempt| async move {
        let events = match stacks.describe_events(credentials, region, stack_name).await {
            Ok(events) => events,
            Err(err @ ServiceError::Unavailable { .. }) => return Attempt::Pending(err.to_string()),
            Err(err) => {
                return Attempt::Failed(ProvisionError::service("describe_stack_events", err))
            }
        };

        let latest = events.first();
        match StackStatus::from_latest(latest, stack_name) {
            StackStatus::Complete => Attempt::Done(()),
            StackStatus::Settled { status } => {
                warn!(%status, "Existing stack was updated outside this deployment, accepting it");
                Attempt::Done(())
            }
            StackStatus::Unusable { status, reason } => {
                let reason = reason.unwrap_or_else(|| "no reason reported".into());
                error!(%status, %reason, "Existing stack is unusable");
                Attempt::Failed(ProvisionError::StackUnusable {
                    stack_name: stack_name.to_string(),
                    status,
                    reason,
                })
            }
            StackStatus::RolledBack { status, reason } => {
                let reason = reason.unwrap_or_else(|| "no reason reported".into());
                error!(%status, %reason, "Stack rolled back");
                Attempt::Failed(ProvisionError::StackRolledBack {
                    stack_name: stack_name.to_string(),
                    status,
                    reason,
                })
            }
            StackStatus::Creating => match latest {
                Some(event) => {
                    info!(
                        attempt,
                        resource = %event.logical_resource_id,
                        resource_type = %event.resource_type,
                        status = %event.resource_status,
                        "Stack building"
                    );
                    Attempt::Pending(format!(
                        "{} {}",
                        event.logical_resource_id, event.resource_status
                    ))
                }
                None => Attempt::Pending("no events yet".into()),
            },
        }
    })
    .await?;

    let description = stacks
        .describe_stack(credentials, region, stack_name)
        .await
        .map_err(|err| ProvisionError::service("describe_stack", err))?;
    info!(stack_id = %description.stack_id, "Stack deployed");
    Ok(description)
}
