//! Client error types.

/// Errors that can occur when driving the vending steps.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// The step failed terminally. Re-invoking it will not succeed.
    #[error("provisioning failed: {message}")]
    Fatal {
        /// Diagnostic from the service.
        message: String,
    },

    /// The account name is already registered to a different account.
    #[error("conflict: {message}")]
    Conflict {
        /// Diagnostic from the service.
        message: String,
    },

    /// A polling loop on the service ran out of attempts.
    #[error("retries exhausted in {operation} after {attempts} attempts: {message}")]
    RetriesExhausted {
        /// The loop that gave up.
        operation: String,
        /// Attempts made.
        attempts: u64,
        /// Diagnostic from the service.
        message: String,
    },

    /// Account creation may have gone through; re-invoking it would create a
    /// second account. An operator must reconcile using the identifiers.
    #[error("account creation unresolved: {message}")]
    CreationUnresolved {
        /// Diagnostic from the service or transport.
        message: String,
        /// The create-account operation handle, when the service reported it.
        request_id: Option<String>,
        /// The created account, when the service reported it.
        account_id: Option<String>,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Whether the request never reached the service.
    #[must_use]
    pub fn is_unsent(&self) -> bool {
        matches!(self, Self::Http(err) if err.is_connect() || err.is_builder())
    }

    /// Whether an orchestrator may usefully re-invoke the step.
    ///
    /// [`crate::ProvisioningClient::create_account`] never returns a retryable
    /// error once its request may have been delivered.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::RetriesExhausted { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Fatal { .. }
            | Self::Conflict { .. }
            | Self::CreationUnresolved { .. }
            | Self::Serialization(_)
            | Self::Configuration(_) => false,
        }
    }
}
