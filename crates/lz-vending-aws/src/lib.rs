//! AWS SDK adapters for the lz-vending collaborator traits.
//!
//! | Trait | Adapter | Service |
//! |---|---|---|
//! | `OrganizationApi` | [`AwsOrganizations`] | Organizations |
//! | `InventoryStore` | [`DynamoInventory`] | DynamoDB |
//! | `PolicyStore` | [`S3PolicyStore`] | S3 bucket policy |
//! | `BlobStore` | [`S3BlobStore`] | S3 objects |
//! | `IdentityBroker` | [`StsBroker`] | STS |
//! | `StackService` | [`CloudFormationStacks`] | CloudFormation (member account) |
//! | `AliasService` | [`IamAliases`] | IAM (member account) |
//!
//! Management-account adapters share one `SdkConfig` from [`load_shared_config`].
//! Member-account adapters build a client per call from assumed-role credentials.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod cloudformation;
mod dynamodb;
mod iam;
mod organizations;
mod s3;
mod sdk;
mod sts;

pub use cloudformation::CloudFormationStacks;
pub use dynamodb::{DynamoInventory, DEFAULT_INVENTORY_TABLE};
pub use iam::IamAliases;
pub use organizations::AwsOrganizations;
pub use s3::{policy_version, S3BlobStore, S3PolicyStore};
pub use sdk::load_shared_config;
pub use sts::StsBroker;
