//! Organization-side view: create-account operations and organizational units.

use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, CreateAccountRequestId, OrganizationalUnitId};

/// State of an asynchronous create-account operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreateAccountState {
    /// Still running; the only state that keeps the poll loop going.
    InProgress,
    /// The account exists.
    Succeeded,
    /// The organization gave up.
    Failed,
}

/// Snapshot of an asynchronous create-account operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountStatus {
    /// Operation handle.
    pub request_id: CreateAccountRequestId,
    /// Current state.
    pub state: CreateAccountState,
    /// Set once the operation succeeded.
    #[serde(default)]
    pub account_id: Option<AccountId>,
    /// Set once the operation failed.
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// A named node directly under the organization root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    /// Unit identifier.
    pub id: OrganizationalUnitId,
    /// Display name.
    pub name: String,
}

/// Outcome of resolving a unit by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitMatch<'a> {
    /// No unit carries the name.
    NotFound,
    /// Exactly one unit carries the name.
    Unique(&'a OrganizationalUnit),
    /// Several units carry the name; `first` is the one used.
    Ambiguous {
        /// First match in listing order.
        first: &'a OrganizationalUnit,
        /// Total number of matches.
        count: usize,
    },
}

impl<'a> UnitMatch<'a> {
    /// The unit placement should use, if any.
    #[must_use]
    pub const fn unit(&self) -> Option<&'a OrganizationalUnit> {
        match self {
            Self::NotFound => None,
            Self::Unique(unit) | Self::Ambiguous { first: unit, .. } => Some(*unit),
        }
    }
}

/// Find a unit by exact (case-sensitive) name; the first match in listing order wins.
#[must_use]
pub fn resolve_unit<'a>(units: &'a [OrganizationalUnit], name: &str) -> UnitMatch<'a> {
    let mut matches = units.iter().filter(|u| u.name == name);
    match (matches.next(), matches.count()) {
        (None, _) => UnitMatch::NotFound,
        (Some(unit), 0) => UnitMatch::Unique(unit),
        (Some(first), rest) => UnitMatch::Ambiguous {
            first,
            count: rest + 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: &str, name: &str) -> OrganizationalUnit {
        OrganizationalUnit {
            id: OrganizationalUnitId::new(id).unwrap(),
            name: name.into(),
        }
    }

    #[test]
    fn resolves_exact_name() {
        let units = vec![unit("ou-1", "Sandbox"), unit("ou-2", "Prod")];
        assert_eq!(resolve_unit(&units, "Prod"), UnitMatch::Unique(&units[1]));
    }

    #[test]
    fn match_is_case_sensitive() {
        let units = vec![unit("ou-1", "Sandbox")];
        assert_eq!(resolve_unit(&units, "sandbox"), UnitMatch::NotFound);
    }

    #[test]
    fn first_duplicate_wins() {
        let units = vec![unit("ou-1", "Sandbox"), unit("ou-2", "Sandbox")];
        let resolved = resolve_unit(&units, "Sandbox");
        assert_eq!(
            resolved,
            UnitMatch::Ambiguous {
                first: &units[0],
                count: 2
            }
        );
        assert_eq!(resolved.unit().map(|u| u.id.as_str()), Some("ou-1"));
    }

    #[test]
    fn state_uses_organization_wire_names() {
        let state: CreateAccountState = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(state, CreateAccountState::InProgress);
    }
}
