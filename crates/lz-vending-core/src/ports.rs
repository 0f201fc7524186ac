//! Collaborator interfaces consumed by the saga.
//!
//! Each trait is one external system. Implementations translate their transport's
//! failures into [`ServiceError`] so the saga can classify them without knowing
//! which SDK produced them.

use async_trait::async_trait;

use crate::account::{AccountRequest, BillingAccess};
use crate::credentials::TemporaryCredentials;
use crate::error::ServiceError;
use crate::ids::{AccountId, CreateAccountRequestId, OrganizationalUnitId, PolicyId, RootId, StackId};
use crate::organization::{CreateAccountStatus, OrganizationalUnit};
use crate::policy::TrustPolicyDocument;
use crate::stack::{StackDescription, StackEvent, StackSpec};

/// Result type for collaborator calls.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// The organization-membership API.
#[async_trait]
pub trait OrganizationApi: Send + Sync {
    /// Submit a create-account operation.
    async fn create_account(
        &self,
        request: &AccountRequest,
        role_name: &str,
        billing_access: BillingAccess,
    ) -> ServiceResult<CreateAccountStatus>;

    /// Read the current status of a create-account operation.
    async fn describe_create_account(
        &self,
        request_id: &CreateAccountRequestId,
    ) -> ServiceResult<CreateAccountStatus>;

    /// The organization root.
    async fn root_id(&self) -> ServiceResult<RootId>;

    /// Units directly under `parent`, in listing order.
    async fn list_units(&self, parent: &RootId) -> ServiceResult<Vec<OrganizationalUnit>>;

    /// Move an account between parents.
    async fn move_account(
        &self,
        account_id: &AccountId,
        from: &RootId,
        to: &OrganizationalUnitId,
    ) -> ServiceResult<()>;

    /// Attach a policy to an account.
    async fn attach_policy(&self, policy_id: &PolicyId, target: &AccountId) -> ServiceResult<()>;
}

/// A policy document together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedPolicy {
    /// The document.
    pub document: TrustPolicyDocument,
    /// Opaque concurrency token.
    pub version: String,
}

/// Options for a full-document policy write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyWrite<'a> {
    /// Reject the write with [`ServiceError::Conflict`] unless the stored
    /// document is still at this version.
    pub expected_version: Option<&'a str>,
    /// Accept that the new document may remove the writer's own access.
    pub acknowledge_self_lockout_risk: bool,
}

/// The store holding the shared trust-boundary policy.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Read the document at `location`.
    async fn get_document(&self, location: &str) -> ServiceResult<VersionedPolicy>;

    /// Replace the document at `location`.
    async fn put_document(
        &self,
        location: &str,
        document: &TrustPolicyDocument,
        write: PolicyWrite<'_>,
    ) -> ServiceResult<()>;
}

/// The role-assumption broker.
#[async_trait]
pub trait IdentityBroker: Send + Sync {
    /// Assume `role_arn` and return temporary credentials.
    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> ServiceResult<TemporaryCredentials>;
}

/// The object store holding bootstrap templates.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read an object in full.
    async fn get_object(&self, bucket: &str, key: &str) -> ServiceResult<Vec<u8>>;
}

/// The infrastructure-stack deployment service inside a member account.
#[async_trait]
pub trait StackService: Send + Sync {
    /// Start creating a stack.
    async fn create_stack(
        &self,
        credentials: &TemporaryCredentials,
        spec: &StackSpec,
    ) -> ServiceResult<StackId>;

    /// Lifecycle events for a stack, newest first.
    async fn describe_events(
        &self,
        credentials: &TemporaryCredentials,
        region: &str,
        stack_name: &str,
    ) -> ServiceResult<Vec<StackEvent>>;

    /// Final description of a stack.
    async fn describe_stack(
        &self,
        credentials: &TemporaryCredentials,
        region: &str,
        stack_name: &str,
    ) -> ServiceResult<StackDescription>;
}

/// Identity management inside a member account.
#[async_trait]
pub trait AliasService: Send + Sync {
    /// Set the account alias.
    ///
    /// Fails with `AlreadyExists` when the alias is taken, whichever account holds it.
    async fn set_account_alias(
        &self,
        credentials: &TemporaryCredentials,
        alias: &str,
    ) -> ServiceResult<()>;

    /// The aliases the account currently holds.
    async fn list_account_aliases(
        &self,
        credentials: &TemporaryCredentials,
    ) -> ServiceResult<Vec<String>>;
}
