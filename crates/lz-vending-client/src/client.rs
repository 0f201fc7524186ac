//! Vending service HTTP client implementation.

use reqwest::Client;
use std::time::Duration;

use lz_vending_core::{AccountRequest, DeployAccountRequest, DeploymentOutput, ProvisioningState};
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::types::{ApiErrorResponse, HealthResponse};

/// Vending service API client.
///
/// Each method drives one saga phase to completion. Calls block for as long
/// as the service polls, so the default timeout is measured in hours.
#[derive(Debug, Clone)]
pub struct ProvisioningClient {
    client: Client,
    base_url: String,
    api_key: String,
    service_name: String,
}

impl ProvisioningClient {
    /// Create a new vending client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the vending service (e.g., `"http://lz-vending:8080"`)
    /// * `api_key` - Service API key for authentication
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is blank or the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, api_key, ClientOptions::default())
    }

    /// Create a new vending client with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is blank or the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base URL is empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            service_name: options.service_name,
        })
    }

    /// Run the account creation phase.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Fatal`] when the step failed terminally,
    /// [`ClientError::Conflict`] when the name belongs to another account, and
    /// [`ClientError::CreationUnresolved`] when the account may exist. Any failure
    /// that would otherwise be retryable becomes `CreationUnresolved` unless the
    /// request provably never reached the service.
    pub async fn create_account(
        &self,
        request: &AccountRequest,
    ) -> Result<ProvisioningState, ClientError> {
        debug!(account_name = %request.name, "Invoking create-account step");
        self.post_step("create-account", request)
            .await
            .map_err(|err| {
                if err.is_retryable() && !err.is_unsent() {
                    warn!(account_name = %request.name, error = %err, "Create-account outcome unknown");
                    ClientError::CreationUnresolved {
                        message: err.to_string(),
                        request_id: None,
                        account_id: None,
                    }
                } else {
                    err
                }
            })
    }

    /// Run the bootstrap deployment phase with the state the creation phase returned.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Fatal`] when the step failed terminally, and
    /// other variants for transport or service failures.
    pub async fn deploy_account(
        &self,
        request: &DeployAccountRequest,
    ) -> Result<DeploymentOutput, ClientError> {
        debug!(
            account_name = %request.account_name,
            account_id = %request.output.account_id,
            "Invoking deploy-account step"
        );
        self.post_step("deploy-account", request).await
    }

    /// Check service health.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        handle_response(response).await
    }

    async fn post_step<B, T>(&self, step: &str, body: &B) -> Result<T, ClientError>
    where
        B: serde::Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}/v1/steps/{step}", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name)
            .json(body)
            .send()
            .await?;

        handle_response(response).await
    }
}

/// Handle API response and convert errors.
async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();

    if status.is_success() {
        let bytes = response.bytes().await?;
        return Ok(serde_json::from_slice(&bytes)?);
    }

    // Try to parse error response
    let error_body: Result<ApiErrorResponse, _> = response.json().await;

    match error_body {
        Ok(api_error) => {
            let code = api_error.error.code;
            let message = api_error.error.message;
            let details = api_error.error.details;

            match code.as_str() {
                "provisioning_failed" => Err(ClientError::Fatal { message }),
                "conflict" => Err(ClientError::Conflict { message }),
                "creation_unresolved" => {
                    let detail = |key: &str| {
                        details
                            .as_ref()
                            .and_then(|d| d.get(key))
                            .and_then(serde_json::Value::as_str)
                            .map(str::to_string)
                    };
                    Err(ClientError::CreationUnresolved {
                        request_id: detail("request_id"),
                        account_id: detail("account_id"),
                        message,
                    })
                }
                "retries_exhausted" => {
                    let operation = details
                        .as_ref()
                        .and_then(|d| d.get("operation"))
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or("unknown")
                        .to_string();
                    let attempts = details
                        .as_ref()
                        .and_then(|d| d.get("attempts"))
                        .and_then(serde_json::Value::as_u64)
                        .unwrap_or(0);

                    Err(ClientError::RetriesExhausted {
                        operation,
                        attempts,
                        message,
                    })
                }
                _ => Err(ClientError::Api {
                    code,
                    message,
                    status: status.as_u16(),
                }),
            }
        }
        Err(_) => Err(ClientError::Api {
            code: "unknown".to_string(),
            message: format!("HTTP {status}"),
            status: status.as_u16(),
        }),
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: three hours, the longest a step may poll).
    pub timeout_seconds: u64,
    /// Service name to include in requests.
    pub service_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 3 * 3600,
            service_name: "unknown".to_string(),
        }
    }
}

impl ClientOptions {
    /// Create options with a service name.
    #[must_use]
    pub fn with_service_name(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            ..Self::default()
        }
    }
}
