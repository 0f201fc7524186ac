//! Core types and saga rules for landing-zone account vending.
//!
//! This crate holds everything about vending an account that does not depend on a
//! particular cloud SDK or runtime:
//!
//! - **Identifiers**: `AccountId`, `OrganizationalUnitId`, `PolicyId`, ...
//! - **State**: `AccountRequest`, `AccountRecord`, `ProvisioningState`, `DeploymentOutput`
//! - **Rules**: trust-policy admission, unit resolution, stack event classification,
//!   alias canonicalization, retry schedules
//! - **Ports**: the collaborator traits the saga drives
//!
//! # Data flow
//!
//! `AccountRequest` → account creation phase → `ProvisioningState` →
//! bootstrap phase → `DeploymentOutput`. Nothing flows backwards.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod credentials;
pub mod error;
pub mod ids;
pub mod organization;
pub mod policy;
pub mod ports;
pub mod retry;
pub mod stack;

pub use account::{
    canonical_alias, AccountRecord, AccountRequest, BillingAccess, DeployAccountRequest,
    DeploymentOutput, ProvisioningState, DEPLOYMENT_SUCCESS, ROOT_OU_NAME,
};
pub use credentials::{role_arn, TemporaryCredentials, DEFAULT_SESSION_NAME};
pub use error::{ProvisionError, Result, ServiceError};
pub use ids::{
    AccountId, CreateAccountRequestId, IdError, OrganizationalUnitId, PolicyId, RootId, StackId,
};
pub use organization::{
    resolve_unit, CreateAccountState, CreateAccountStatus, OrganizationalUnit, UnitMatch,
};
pub use policy::{Admission, PolicyError, TrustPolicyDocument, DEFAULT_CLAUSE_SID};
pub use ports::{
    AliasService, BlobStore, IdentityBroker, OrganizationApi, PolicyStore, PolicyWrite,
    ServiceResult, StackService, VersionedPolicy,
};
pub use retry::{Backoff, RetryPolicy};
pub use stack::{
    deployment_tags, StackDescription, StackEvent, StackSpec, StackStatus, StackTag,
};
