//! Application state.

use crate::config::ServiceConfig;
use crate::poll::Cancellation;
use crate::saga::Provisioner;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Runs the provisioning phases.
    pub provisioner: Provisioner,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Fires on shutdown; every step invocation polls under it.
    pub cancel: Cancellation,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(provisioner: Provisioner, config: ServiceConfig, cancel: Cancellation) -> Self {
        if config.service_api_key.is_none() {
            tracing::warn!("SERVICE_API_KEY not configured - step endpoints will reject every call");
        }

        Self {
            provisioner,
            config,
            cancel,
        }
    }
}
