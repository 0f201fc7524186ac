//! Error types for account vending.
//!
//! Two layers: [`ServiceError`] describes how a collaborator call failed, and
//! [`ProvisionError`] describes how a saga step terminated.

use crate::ids::IdError;
use crate::policy::PolicyError;

/// Result type for saga operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// A failed call to an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The collaborator understood the request and refused it.
    #[error("{service} rejected the request: {code}: {message}")]
    Rejected {
        /// The collaborator that failed.
        service: String,
        /// Machine-readable error code.
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// The target of a create-style call already exists.
    #[error("{service}: already exists: {message}")]
    AlreadyExists {
        /// The collaborator that failed.
        service: String,
        /// Human-readable message.
        message: String,
    },

    /// A conditional write lost against a concurrent writer.
    #[error("{service}: conflicting concurrent update: {message}")]
    Conflict {
        /// The collaborator that failed.
        service: String,
        /// Human-readable message.
        message: String,
    },

    /// The addressed resource does not exist.
    #[error("{service}: not found: {message}")]
    NotFound {
        /// The collaborator that failed.
        service: String,
        /// Human-readable message.
        message: String,
    },

    /// The call never produced a response (network, timeout, throttling).
    #[error("{service} unavailable: {message}")]
    Unavailable {
        /// The collaborator that failed.
        service: String,
        /// Human-readable message.
        message: String,
    },
}

impl ServiceError {
    /// Build a rejection.
    pub fn rejected(
        service: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            service: service.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build an already-exists error.
    pub fn already_exists(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AlreadyExists {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Build a concurrency conflict.
    pub fn conflict(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Build a not-found error.
    pub fn not_found(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Build an unavailability error.
    pub fn unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Whether the error reports an existing target.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Whether the error reports a lost conditional write.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Errors that terminate a saga step.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// The organization refused the create-account submission.
    #[error("account creation for {account_name} was rejected: {source}")]
    SubmissionRejected {
        /// The requested account name.
        account_name: String,
        /// The underlying rejection.
        #[source]
        source: ServiceError,
    },

    /// The create-account operation reached `FAILED`.
    #[error("account creation {request_id} failed: {reason}")]
    CreationFailed {
        /// The operation handle.
        request_id: String,
        /// The organization's failure reason.
        reason: String,
    },

    /// The account may exist but this invocation could not confirm it.
    ///
    /// Raised when a poll after a successful submission gives up or is cancelled.
    /// Re-invoking account creation would submit a second account, so the
    /// identifiers are carried for an operator to resolve by hand.
    #[error(
        "account creation for {account_name} is unresolved (request {}, account {}): {reason}",
        .request_id.as_deref().unwrap_or("unknown"),
        .account_id.as_deref().unwrap_or("unknown")
    )]
    CreationUnresolved {
        /// The requested account name.
        account_name: String,
        /// The create-account operation handle, when this step submitted it.
        request_id: Option<String>,
        /// The created account, once known.
        account_id: Option<String>,
        /// The poll outcome that left creation unresolved.
        reason: String,
    },

    /// The alias is registered to a different account.
    #[error("alias {alias} belongs to another account (this account has [{}])", .current.join(", "))]
    AliasTaken {
        /// The alias that was requested.
        alias: String,
        /// The aliases this account currently holds.
        current: Vec<String>,
    },

    /// The bootstrap stack rolled back.
    #[error("stack {stack_name} rolled back ({status}): {reason}")]
    StackRolledBack {
        /// The stack name.
        stack_name: String,
        /// The terminal status observed.
        status: String,
        /// The status reason on the terminal event.
        reason: String,
    },

    /// An existing stack of the same name cannot serve as the baseline.
    #[error("stack {stack_name} is unusable ({status}): {reason}")]
    StackUnusable {
        /// The stack name.
        stack_name: String,
        /// The terminal status observed.
        status: String,
        /// The status reason on the terminal event.
        reason: String,
    },

    /// The inventory already holds a different account under this name.
    #[error("inventory already holds {account_name} as account {existing_id}, not {account_id}")]
    InventoryConflict {
        /// The inventory key.
        account_name: String,
        /// The account id that is already registered.
        existing_id: String,
        /// The account id this invocation tried to register.
        account_id: String,
    },

    /// The inventory store failed.
    #[error("inventory store error: {0}")]
    Inventory(String),

    /// The trust-boundary policy could not be edited.
    #[error("trust policy error: {0}")]
    Policy(#[from] PolicyError),

    /// The bootstrap template is not usable.
    #[error("invalid template {location}: {reason}")]
    InvalidTemplate {
        /// Where the template was read from.
        location: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A collaborator call failed outside any retry loop.
    #[error("{operation} failed: {source}")]
    Service {
        /// The saga operation that made the call.
        operation: &'static str,
        /// The underlying failure.
        #[source]
        source: ServiceError,
    },

    /// A polling or retry loop gave up.
    #[error("{operation} gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// The saga operation.
        operation: &'static str,
        /// Attempts made.
        attempts: u32,
        /// The last observation or error.
        last_error: String,
    },

    /// The caller cancelled the step.
    #[error("{operation} was cancelled")]
    Cancelled {
        /// The saga operation that was interrupted.
        operation: &'static str,
    },

    /// The step input is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A collaborator returned an unusable identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}

impl ProvisionError {
    /// Wrap a collaborator failure with the operation that observed it.
    #[must_use]
    pub fn service(operation: &'static str, source: ServiceError) -> Self {
        Self::Service { operation, source }
    }

    /// Convert a non-fatal poll outcome into [`ProvisionError::CreationUnresolved`].
    ///
    /// Fatal errors pass through unchanged.
    #[must_use]
    pub fn after_submission(
        self,
        account_name: &str,
        request_id: Option<&str>,
        account_id: Option<&str>,
    ) -> Self {
        if self.is_fatal() {
            return self;
        }
        Self::CreationUnresolved {
            account_name: account_name.to_string(),
            request_id: request_id.map(str::to_string),
            account_id: account_id.map(str::to_string),
            reason: self.to_string(),
        }
    }

    /// Whether the failure is terminal for the saga.
    ///
    /// Only exhausted retry loops and cancellation are worth re-invoking the step for;
    /// everything else needs an operator.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::RetriesExhausted { .. } | Self::Cancelled { .. })
    }
}
