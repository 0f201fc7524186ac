//! Account vending service.
//!
//! This crate runs the provisioning saga for one account per invocation:
//!
//! - Step controllers ([`saga`]) that poll external operations to a terminal state
//! - Cancellable, bounded polling ([`poll`])
//! - Explicit per-step configuration ([`config`])
//! - An HTTP surface an orchestrator calls for each phase ([`routes`])
//!
//! # Authentication
//!
//! Step endpoints require the service API key in `x-api-key`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Health handler is async for routing

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod poll;
pub mod routes;
pub mod saga;
pub mod state;

pub use config::{ConfigError, FailureMode, ProvisioningConfig, ServiceConfig};
pub use error::ApiError;
pub use poll::{cancellation, CancelHandle, Cancellation};
pub use routes::create_router;
pub use saga::{Collaborators, Provisioner};
pub use state::AppState;
