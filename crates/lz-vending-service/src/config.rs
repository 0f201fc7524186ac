//! Service configuration.
//!
//! Everything a step needs is collected once into a [`ProvisioningConfig`] and
//! passed explicitly into each step; no step reads the environment.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use lz_vending_aws::DEFAULT_INVENTORY_TABLE;
use lz_vending_core::retry::{
    ASSUME_ROLE_RETRY, CREATE_ACCOUNT_POLL, POLICY_CONFLICT_RETRY, STACK_EVENT_POLL,
};
use lz_vending_core::{BillingAccess, RetryPolicy, DEFAULT_CLAUSE_SID, DEFAULT_SESSION_NAME};

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// The variable name.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// How a step reacts when an optional placement action fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Log a warning and continue without the action.
    Degrade,
    /// Terminate the step.
    Fatal,
}

impl FromStr for FailureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(Self::Degrade),
            "fatal" => Ok(Self::Fatal),
            other => Err(format!("expected degrade or fatal, got {other}")),
        }
    }
}

/// The shared trust-boundary policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustPolicyConfig {
    /// Bucket whose policy lists admitted accounts.
    pub bucket: String,
    /// Statement id of the admitted-account clause.
    pub clause_sid: String,
    /// Re-read/re-write schedule on version conflicts.
    pub conflict_retry: RetryPolicy,
}

/// Where the bootstrap template lives and where it is deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Bucket holding the template.
    pub template_bucket: String,
    /// Object key of the template.
    pub template_key: String,
    /// Stack name inside the new account.
    pub stack_name: String,
    /// Region the stack is deployed into.
    pub stack_region: String,
}

impl BootstrapConfig {
    /// Human-readable template location for diagnostics.
    #[must_use]
    pub fn template_location(&self) -> String {
        format!("s3://{}/{}", self.template_bucket, self.template_key)
    }
}

/// Per-step configuration for both provisioning phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningConfig {
    /// ARN partition (`aws`, `aws-cn`, ...).
    pub partition: String,
    /// Role created in every new account and assumed to bootstrap it.
    pub account_role: String,
    /// Session name used when assuming `account_role`.
    pub session_name: String,
    /// Billing visibility for IAM users of the new account.
    pub billing_access: BillingAccess,
    /// Reaction to a failed move into the requested unit.
    pub relocation_failure: FailureMode,
    /// Reaction to a failed policy attachment.
    pub policy_attachment_failure: FailureMode,
    /// Create-account status polling.
    pub create_poll: RetryPolicy,
    /// Role assumption retries.
    pub role_retry: RetryPolicy,
    /// Stack event polling.
    pub stack_poll: RetryPolicy,
    /// Trust-boundary policy.
    pub trust_policy: TrustPolicyConfig,
    /// Bootstrap template and target.
    pub bootstrap: BootstrapConfig,
}

impl ProvisioningConfig {
    /// Configuration with reference schedules and failure modes for the given locations.
    #[must_use]
    pub fn new(
        account_role: impl Into<String>,
        metadata_bucket: impl Into<String>,
        bootstrap: BootstrapConfig,
    ) -> Self {
        Self {
            partition: "aws".into(),
            account_role: account_role.into(),
            session_name: DEFAULT_SESSION_NAME.into(),
            billing_access: BillingAccess::default(),
            relocation_failure: FailureMode::Degrade,
            policy_attachment_failure: FailureMode::Fatal,
            create_poll: CREATE_ACCOUNT_POLL,
            role_retry: ASSUME_ROLE_RETRY,
            stack_poll: STACK_EVENT_POLL,
            trust_policy: TrustPolicyConfig {
                bucket: metadata_bucket.into(),
                clause_sid: DEFAULT_CLAUSE_SID.into(),
                conflict_retry: POLICY_CONFLICT_RETRY,
            },
            bootstrap,
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Service API key required on step endpoints.
    pub service_api_key: Option<String>,

    /// Home region of the management account; SDK default chain when unset.
    pub aws_region: Option<String>,

    /// Inventory table name.
    pub inventory_table: String,

    /// Local inventory directory; used instead of the table when the
    /// `rocksdb-backend` feature is enabled.
    pub data_dir: Option<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds. Must cover the longest polling schedule.
    pub request_timeout_seconds: u64,

    /// Maximum step invocations served at once.
    pub max_concurrent_steps: usize,

    /// Step configuration.
    pub provisioning: ProvisioningConfig,
}

/// Service secrets file structure.
#[derive(Debug, Deserialize)]
struct ServiceSecrets {
    service_api_key: String,
}

impl ServiceConfig {
    /// Load configuration from the process environment and the optional secrets file.
    ///
    /// # Errors
    ///
    /// Fails when a required variable is missing or any variable is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        if let Some(key) = load_service_secrets() {
            config.service_api_key = Some(key);
        }
        Ok(config)
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Fails when a required variable is missing or any variable is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let bootstrap = BootstrapConfig {
            template_bucket: vars.required("BUCKET_NAME")?,
            template_key: vars.required("TEMPLATE_FILE")?,
            stack_name: vars.required("STACK_NAME")?,
            stack_region: vars.required("STACK_REGION")?,
        };

        let mut provisioning = ProvisioningConfig::new(
            vars.required("ACCOUNT_ROLE")?,
            vars.required("METADATA_BUCKET_NAME")?,
            bootstrap,
        );
        provisioning.billing_access = vars.parsed_required("ACCESS_TO_BILLING")?;
        if let Some(partition) = vars.optional("AWS_PARTITION") {
            provisioning.partition = partition;
        }
        if let Some(sid) = vars.optional("POLICY_CLAUSE_SID") {
            provisioning.trust_policy.clause_sid = sid;
        }
        provisioning.create_poll = vars.schedule(
            provisioning.create_poll,
            "CREATE_POLL_SECONDS",
            "CREATE_MAX_ATTEMPTS",
        )?;
        provisioning.role_retry = vars.schedule(
            provisioning.role_retry,
            "ROLE_RETRY_SECONDS",
            "ROLE_MAX_ATTEMPTS",
        )?;
        provisioning.stack_poll = vars.schedule(
            provisioning.stack_poll,
            "STACK_POLL_SECONDS",
            "STACK_MAX_ATTEMPTS",
        )?;
        provisioning.relocation_failure = vars
            .parsed("RELOCATION_FAILURE_MODE")?
            .unwrap_or(provisioning.relocation_failure);
        provisioning.policy_attachment_failure = vars
            .parsed("POLICY_ATTACHMENT_FAILURE_MODE")?
            .unwrap_or(provisioning.policy_attachment_failure);

        Ok(Self {
            listen_addr: vars
                .optional("LISTEN_ADDR")
                .unwrap_or_else(|| "0.0.0.0:8080".into()),
            service_api_key: vars.optional("SERVICE_API_KEY"),
            aws_region: vars.optional("AWS_REGION"),
            inventory_table: vars
                .optional("INVENTORY_TABLE")
                .unwrap_or_else(|| DEFAULT_INVENTORY_TABLE.into()),
            data_dir: vars.optional("DATA_DIR"),
            max_body_bytes: vars.parsed("MAX_BODY_BYTES")?.unwrap_or(64 * 1024),
            request_timeout_seconds: vars.parsed("REQUEST_TIMEOUT_SECONDS")?.unwrap_or(3 * 3600),
            max_concurrent_steps: vars.parsed("MAX_CONCURRENT_STEPS")?.unwrap_or(16),
            provisioning,
        })
    }

    /// Request timeout as a duration.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    fn parsed<T>(&self, key: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .map(|raw| {
                raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                    key,
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    fn parsed_required<T>(&self, key: &'static str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.parsed(key)?.ok_or(ConfigError::Missing(key))
    }

    fn schedule(
        &self,
        base: RetryPolicy,
        interval_key: &'static str,
        attempts_key: &'static str,
    ) -> Result<RetryPolicy, ConfigError> {
        let mut policy = base;
        if let Some(seconds) = self.parsed::<u64>(interval_key)? {
            policy = policy.with_interval(Duration::from_secs(seconds));
        }
        if let Some(attempts) = self.parsed::<u32>(attempts_key)? {
            if attempts == 0 {
                return Err(ConfigError::Invalid {
                    key: attempts_key,
                    reason: "must be at least 1".into(),
                });
            }
            policy = policy.with_max_attempts(attempts);
        }
        Ok(policy)
    }
}

/// Load the service API key from a secrets file, if one exists.
fn load_service_secrets() -> Option<String> {
    let secret_paths = [".secrets/service.json", "../.secrets/service.json"];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<ServiceSecrets>(path) {
            tracing::info!(path = %path, "Loaded service secrets from file");
            return Some(secrets.service_api_key);
        }
    }

    tracing::debug!("Service secrets file not found, using environment variables");
    None
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("ACCOUNT_ROLE", "OrganizationAccountAccessRole"),
            ("ACCESS_TO_BILLING", "DENY"),
            ("METADATA_BUCKET_NAME", "lz-metadata"),
            ("BUCKET_NAME", "lz-templates"),
            ("TEMPLATE_FILE", "baseline.yaml"),
            ("STACK_NAME", "lz-baseline"),
            ("STACK_REGION", "cn-north-1"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<ServiceConfig, ConfigError> {
        ServiceConfig::from_lookup(|key| vars.get(key).map(ToString::to_string))
    }

    #[test]
    fn defaults_preserve_reference_behavior() {
        let config = load(&base()).unwrap();
        let p = &config.provisioning;

        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.inventory_table, DEFAULT_INVENTORY_TABLE);
        assert_eq!(p.partition, "aws");
        assert_eq!(p.relocation_failure, FailureMode::Degrade);
        assert_eq!(p.policy_attachment_failure, FailureMode::Fatal);
        assert_eq!(p.create_poll.interval, Duration::from_secs(10));
        assert_eq!(p.stack_poll.interval, Duration::from_secs(15));
        assert_eq!(p.trust_policy.clause_sid, DEFAULT_CLAUSE_SID);
        assert_eq!(p.bootstrap.template_location(), "s3://lz-templates/baseline.yaml");
    }

    #[test]
    fn missing_required_variable_is_named() {
        let mut vars = base();
        vars.remove("STACK_REGION");
        assert!(matches!(load(&vars), Err(ConfigError::Missing("STACK_REGION"))));
    }

    #[test]
    fn overrides_are_applied() {
        let mut vars = base();
        vars.insert("AWS_PARTITION", "aws-cn");
        vars.insert("ACCESS_TO_BILLING", "allow");
        vars.insert("ROLE_RETRY_SECONDS", "2");
        vars.insert("ROLE_MAX_ATTEMPTS", "7");
        vars.insert("RELOCATION_FAILURE_MODE", "fatal");

        let p = load(&vars).unwrap().provisioning;

        assert_eq!(p.partition, "aws-cn");
        assert_eq!(p.billing_access, BillingAccess::Allow);
        assert_eq!(p.role_retry.interval, Duration::from_secs(2));
        assert_eq!(p.role_retry.max_attempts, 7);
        assert_eq!(p.relocation_failure, FailureMode::Fatal);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let mut vars = base();
        vars.insert("STACK_MAX_ATTEMPTS", "0");
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { key: "STACK_MAX_ATTEMPTS", .. })
        ));

        let mut vars = base();
        vars.insert("POLICY_ATTACHMENT_FAILURE_MODE", "ignore");
        assert!(load(&vars).is_err());
    }
}
