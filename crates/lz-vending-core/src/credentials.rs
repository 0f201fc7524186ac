//! Temporary cross-account credentials.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::ids::AccountId;

/// Session name used when assuming the bootstrap role.
pub const DEFAULT_SESSION_NAME: &str = "NewAccountRole";

/// Short-lived credentials for a role inside a member account.
#[derive(Clone, PartialEq, Eq)]
pub struct TemporaryCredentials {
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Session token.
    pub session_token: String,
    /// When the credentials stop working, if known.
    pub expiration: Option<DateTime<Utc>>,
}

impl fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// ARN of a role inside a member account.
#[must_use]
pub fn role_arn(partition: &str, account_id: &AccountId, role_name: &str) -> String {
    format!("arn:{partition}:iam::{account_id}:role/{role_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arn_uses_partition() {
        let id: AccountId = "111111111111".parse().unwrap();
        assert_eq!(
            role_arn("aws-cn", &id, "OrganizationAccountAccessRole"),
            "arn:aws-cn:iam::111111111111:role/OrganizationAccountAccessRole"
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let creds = TemporaryCredentials {
            access_key_id: "ASIAEXAMPLE".into(),
            secret_access_key: "very-secret".into(),
            session_token: "session-secret".into(),
            expiration: None,
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("ASIAEXAMPLE"));
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("session-secret"));
    }
}
