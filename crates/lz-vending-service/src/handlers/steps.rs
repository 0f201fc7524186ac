//! Step invocation handlers.
//!
//! Each call runs one phase to completion within the request. The orchestrator
//! owns sequencing, retries between steps, and persistence of the state record.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use tracing::{error, info, instrument};
use uuid::Uuid;

use lz_vending_core::{AccountRequest, DeployAccountRequest, DeploymentOutput, ProvisioningState};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Run the account creation phase.
#[instrument(
    skip_all,
    fields(step = "create_account", invocation = %Uuid::new_v4(), caller = %auth.service_name)
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<AccountRequest>,
) -> Result<Json<ProvisioningState>, ApiError> {
    info!(account_name = %body.name, ou_name = ?body.ou_name, "Step invoked");

    state
        .provisioner
        .create_account_phase(&body, &state.cancel)
        .await
        .map(Json)
        .map_err(|err| {
            error!(error = %err, fatal = err.is_fatal(), "Step failed");
            ApiError::from(err)
        })
}

/// Run the bootstrap deployment phase.
#[instrument(
    skip_all,
    fields(step = "deploy_account", invocation = %Uuid::new_v4(), caller = %auth.service_name)
)]
pub async fn deploy_account(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<DeployAccountRequest>,
) -> Result<Json<DeploymentOutput>, ApiError> {
    info!(account_name = %body.account_name, account_id = %body.output.account_id, "Step invoked");

    state
        .provisioner
        .deploy_account_phase(&body, &state.cancel)
        .await
        .map(Json)
        .map_err(|err| {
            error!(error = %err, fatal = err.is_fatal(), "Step failed");
            ApiError::from(err)
        })
}
