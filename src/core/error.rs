//! Error types.
//!
//! Strata separates structural errors (rejected synchronously, before any
//! mutation) from activation errors (absorbed and reported through the
//! message sink). Only interruption is re-raised to callers of batch
//! operations as a distinguishable control-flow signal.

use thiserror::Error;

/// Common Strata error conditions.
#[derive(Debug, Error)]
pub enum StrataError {
    /// Structural mutation would create a cycle in the group graph.
    ///
    /// Rejected before mutation; the graph is left unchanged.
    #[error("cycle: adding '{child}' under '{parent}' would make a group its own ancestor")]
    Cycle { parent: String, child: String },

    /// Structurally forbidden mutation, e.g. setting a parent on a
    /// designated root group.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The activation side effect for a group returned an error.
    ///
    /// Captured and reported via the message sink; surfaced to
    /// `set_active` callers only as `Ok(false)`.
    #[error("activation of '{group}' failed: {reason}")]
    ActivationFailed { group: String, reason: String },

    /// An in-flight activation observed its cancellation token fire and
    /// wound down cooperatively before committing.
    #[error("activation cancelled")]
    Cancelled,

    /// Shutdown fired while waiting on an activation request.
    ///
    /// The only condition re-raised to batch callers, after cooperative
    /// cancellation of in-flight siblings completes.
    #[error("interrupted while waiting on activation")]
    Interrupted,
}

impl StrataError {
    /// Create an ActivationFailed error.
    pub fn activation_failed(group: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ActivationFailed {
            group: group.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidOperation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// Check if this error terminates a whole batch rather than a single
    /// group's transition.
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Interrupted)
    }

    /// Check if this error is a structural rejection (graph unchanged).
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Cycle { .. } | Self::InvalidOperation(_))
    }
}

/// Result type using StrataError.
pub type StrataResult<T> = Result<T, StrataError>;
