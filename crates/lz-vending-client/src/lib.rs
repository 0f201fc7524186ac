//! Account vending client SDK.
//!
//! This crate lets an orchestrator drive the two provisioning phases over HTTP.
//!
//! # Example
//!
//! ```no_run
//! use lz_vending_client::{AccountRequest, DeployAccountRequest, ProvisioningClient};
//!
//! # async fn example() -> Result<(), lz_vending_client::ClientError> {
//! let client = ProvisioningClient::new(
//!     "http://lz-vending.platform.svc:8080",
//!     "your-service-api-key",
//! )?;
//!
//! let request = AccountRequest::new("team-a", "team-a@example.com").with_ou("Sandbox");
//! let state = client.create_account(&request).await?;
//!
//! let output = client
//!     .deploy_account(&DeployAccountRequest {
//!         account_name: request.name.clone(),
//!         account_email: request.email.clone(),
//!         output: state,
//!     })
//!     .await?;
//!
//! println!("Bootstrapped {} with stack {}", output.account_id, output.stack_id);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, ProvisioningClient};
pub use error::ClientError;
pub use lz_vending_core::{
    AccountRequest, DeployAccountRequest, DeploymentOutput, ProvisioningState,
};
pub use types::{ApiErrorBody, ApiErrorResponse, HealthResponse};
