//! The provisioning saga.
//!
//! Six step controllers, each usable on its own, composed into the two phases an
//! orchestrator invokes:
//!
//! | Phase | Steps |
//! |---|---|
//! | [`Provisioner::create_account_phase`] | [`account_creation`], [`inventory`], [`trust_policy`] |
//! | [`Provisioner::deploy_account_phase`] | [`credentials`], [`stack`], [`alias`] |
//!
//! A phase is a function from its input record to its output record. It keeps no
//! state between invocations; the orchestrator threads the record forward.

pub mod account_creation;
pub mod alias;
pub mod credentials;
pub mod inventory;
pub mod stack;
pub mod trust_policy;

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use lz_vending_core::{
    deployment_tags, AccountRecord, AccountRequest, AliasService, BlobStore, DeployAccountRequest,
    DeploymentOutput, IdentityBroker, OrganizationApi, PolicyStore, ProvisionError,
    ProvisioningState, Result, ServiceError, StackService, StackSpec, DEPLOYMENT_SUCCESS,
};
use lz_vending_store::InventoryStore;

use crate::config::ProvisioningConfig;
use crate::poll::Cancellation;

/// The external systems the saga drives.
#[derive(Clone)]
pub struct Collaborators {
    /// Organization membership.
    pub organization: Arc<dyn OrganizationApi>,
    /// Account inventory.
    pub inventory: Arc<dyn InventoryStore>,
    /// Trust-boundary policy store.
    pub policies: Arc<dyn PolicyStore>,
    /// Role assumption.
    pub identity: Arc<dyn IdentityBroker>,
    /// Template storage.
    pub blobs: Arc<dyn BlobStore>,
    /// Stack deployment in member accounts.
    pub stacks: Arc<dyn StackService>,
    /// Alias management in member accounts.
    pub aliases: Arc<dyn AliasService>,
}

/// Runs the two provisioning phases against a fixed set of collaborators.
#[derive(Clone)]
pub struct Provisioner {
    collaborators: Collaborators,
    config: ProvisioningConfig,
}

impl Provisioner {
    /// Create a provisioner.
    #[must_use]
    pub fn new(collaborators: Collaborators, config: ProvisioningConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// The step configuration.
    #[must_use]
    pub fn config(&self) -> &ProvisioningConfig {
        &self.config
    }

    /// Phase 1: create and place the account, register it, admit it to the trust boundary.
    ///
    /// Not idempotent: re-invoking after the submission succeeded creates a second
    /// account. The orchestrator must run this phase at most once per request, so
    /// every failure past the submission is fatal.
    ///
    /// # Errors
    ///
    /// Any fatal step failure. Polls that give up or are cancelled once the
    /// account may exist surface as [`ProvisionError::CreationUnresolved`].
    #[instrument(skip_all, fields(account_name = %request.name))]
    pub async fn create_account_phase(
        &self,
        request: &AccountRequest,
        cancel: &Cancellation,
    ) -> Result<ProvisioningState> {
        let state = account_creation::create_account(
            self.collaborators.organization.as_ref(),
            request,
            &self.config,
            cancel,
        )
        .await?;

        let record = AccountRecord {
            account_id: state.account_id.clone(),
            account_name: request.name.clone(),
            account_email: request.email.clone(),
            ou_name: state.ou_name.clone(),
        };
        inventory::ensure_registered(self.collaborators.inventory.as_ref(), &record).await?;

        trust_policy::admit(
            self.collaborators.policies.as_ref(),
            &state.account_id,
            &self.config.trust_policy,
            cancel,
        )
        .await
        .map_err(|err| err.after_submission(&request.name, None, Some(state.account_id.as_str())))?;

        info!(account_id = %state.account_id, ou_name = %state.ou_name, "Account creation phase complete");
        Ok(state)
    }

    /// Phase 2: assume the bootstrap role, deploy the baseline stack, set the alias.
    ///
    /// Safe to re-invoke for the same account.
    ///
    /// # Errors
    ///
    /// Any fatal step failure, or an exhausted or cancelled poll.
    #[instrument(skip_all, fields(account_name = %request.account_name, account_id = %request.output.account_id))]
    pub async fn deploy_account_phase(
        &self,
        request: &DeployAccountRequest,
        cancel: &Cancellation,
    ) -> Result<DeploymentOutput> {
        if request.account_name.trim().is_empty() {
            return Err(ProvisionError::InvalidInput(
                "account_name must not be empty".into(),
            ));
        }
        let account_id = &request.output.account_id;

        let credentials = credentials::assume_role(
            self.collaborators.identity.as_ref(),
            account_id,
            &self.config,
            cancel,
        )
        .await?;

        let bootstrap = &self.config.bootstrap;
        let spec = StackSpec {
            stack_name: bootstrap.stack_name.clone(),
            region: bootstrap.stack_region.clone(),
            template_body: self.fetch_template().await?,
            tags: deployment_tags(Utc::now()),
        };
        let description = stack::deploy(
            self.collaborators.stacks.as_ref(),
            &credentials,
            &spec,
            &self.config.stack_poll,
            cancel,
        )
        .await?;

        alias::rename(
            self.collaborators.aliases.as_ref(),
            &credentials,
            &request.account_name,
        )
        .await?;

        info!(stack_id = %description.stack_id, "Bootstrap deployment phase complete");
        Ok(DeploymentOutput {
            status: DEPLOYMENT_SUCCESS.to_string(),
            account_name: request.account_name.clone(),
            account_email: request.account_email.clone(),
            account_id: account_id.clone(),
            ou_name: request.output.ou_name.clone(),
            stack_id: description.stack_id,
        })
    }

    async fn fetch_template(&self) -> Result<String> {
        let bootstrap = &self.config.bootstrap;
        let invalid = |reason: String| ProvisionError::InvalidTemplate {
            location: bootstrap.template_location(),
            reason,
        };

        let bytes = self
            .collaborators
            .blobs
            .get_object(&bootstrap.template_bucket, &bootstrap.template_key)
            .await
            .map_err(|err| match err {
                ServiceError::NotFound { .. } => invalid(err.to_string()),
                other => ProvisionError::service("get_template", other),
            })?;

        let body = String::from_utf8(bytes).map_err(|e| invalid(format!("not UTF-8: {e}")))?;
        if body.trim().is_empty() {
            return Err(invalid("template is empty".into()));
        }
        info!(location = %bootstrap.template_location(), bytes = body.len(), "Template fetched");
        Ok(body)
    }
}
