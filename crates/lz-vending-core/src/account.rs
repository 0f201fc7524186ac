//! Account request, inventory record, and the state threaded between phases.

use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, Result};
use crate::ids::{AccountId, OrganizationalUnitId, PolicyId, StackId};

/// Group name reported when an account stays directly under the organization root.
pub const ROOT_OU_NAME: &str = "Root";

/// Status string reported by a successful bootstrap deployment.
pub const DEPLOYMENT_SUCCESS: &str = "Success";

/// Caller-supplied intent to vend one account. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRequest {
    /// Display name of the new account.
    #[serde(rename = "account_name")]
    pub name: String,

    /// Root email address of the new account.
    #[serde(rename = "account_email")]
    pub email: String,

    /// Organizational unit to place the account under, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ou_name: Option<String>,

    /// Service control policy to attach, if any.
    #[serde(default, rename = "scp", skip_serializing_if = "Option::is_none")]
    pub scp_id: Option<PolicyId>,
}

impl AccountRequest {
    /// Create a request with no placement or policy.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ou_name: None,
            scp_id: None,
        }
    }

    /// Request placement under the named organizational unit.
    #[must_use]
    pub fn with_ou(mut self, ou_name: impl Into<String>) -> Self {
        self.ou_name = Some(ou_name.into());
        self
    }

    /// Request attachment of a service control policy.
    #[must_use]
    pub fn with_scp(mut self, scp_id: PolicyId) -> Self {
        self.scp_id = Some(scp_id);
        self
    }

    /// Reject requests that the organization would refuse outright.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::InvalidInput`] for a blank name or a malformed email.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ProvisionError::InvalidInput(
                "account_name must not be empty".into(),
            ));
        }
        let valid_email = self
            .email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid_email {
            return Err(ProvisionError::InvalidInput(format!(
                "account_email is not an email address: {}",
                self.email
            )));
        }
        Ok(())
    }
}

/// The durable inventory entry, written exactly once per `account_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Account id assigned by the organization.
    pub account_id: AccountId,
    /// Inventory key.
    pub account_name: String,
    /// Root email address.
    pub account_email: String,
    /// Group the account ended up under (`"Root"` when not relocated).
    pub ou_name: String,
}

/// State produced by the account creation phase and consumed by the bootstrap phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningState {
    /// The newly created account.
    pub account_id: AccountId,

    /// The requested group name, or `"Root"` when placement degraded.
    pub ou_name: String,

    /// The resolved group, when the account was relocated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_unit_id: Option<OrganizationalUnitId>,

    /// The attached policy, when one was attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scp: Option<PolicyId>,
}

impl ProvisioningState {
    /// Whether the account was left under the organization root.
    #[must_use]
    pub fn is_under_root(&self) -> bool {
        self.ou_name == ROOT_OU_NAME
    }
}

/// Input to the bootstrap phase: the original request fields plus the prior phase's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployAccountRequest {
    /// Display name of the account; also the source of its alias.
    pub account_name: String,
    /// Root email address.
    pub account_email: String,
    /// Output of the account creation phase.
    pub output: ProvisioningState,
}

/// Result of a completed bootstrap phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentOutput {
    /// Always [`DEPLOYMENT_SUCCESS`].
    pub status: String,
    /// Display name of the account.
    pub account_name: String,
    /// Root email address.
    pub account_email: String,
    /// The bootstrapped account.
    pub account_id: AccountId,
    /// Group the account lives under.
    pub ou_name: String,
    /// The bootstrap stack.
    pub stack_id: StackId,
}

/// Whether IAM users in the new account may see billing data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BillingAccess {
    /// IAM users with permissions may access billing.
    Allow,
    /// Only the root user may access billing.
    #[default]
    Deny,
}

impl BillingAccess {
    /// The wire value expected by the organization API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Deny => "DENY",
        }
    }
}

impl std::str::FromStr for BillingAccess {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALLOW" => Ok(Self::Allow),
            "DENY" => Ok(Self::Deny),
            other => Err(ProvisionError::InvalidInput(format!(
                "billing access must be ALLOW or DENY, got {other}"
            ))),
        }
    }
}

/// Canonical account alias for a display name.
///
/// Aliases are case-insensitive externally, so the canonical form is lowercase.
#[must_use]
pub fn canonical_alias(account_name: &str) -> String {
    account_name.to_lowercase()
}
