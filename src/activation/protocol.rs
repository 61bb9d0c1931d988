//! Per-group activation state machine.
//!
//! Every group carries one protocol instance for its lifetime. The
//! machine cycles `Inactive → Activating → Active → Deactivating →
//! Inactive`; the transient states are the only place the external,
//! potentially slow side effect executes. A request either commits to
//! the terminal state or rolls back to the prior one: the machine is
//! never left transient once a request returns.

use crate::core::cancel::CancelToken;
use crate::core::error::{StrataError, StrataResult};
use parking_lot::Mutex;
use std::future::Future;

/// Activation lifecycle state of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    /// Initial and terminal: the group's data is not live.
    Inactive,
    /// Transient: the activation side effect is running.
    Activating,
    /// Terminal: the group's data is live.
    Active,
    /// Transient: the deactivation side effect is running.
    Deactivating,
}

impl ActivationState {
    /// Whether a side effect is currently in flight.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Activating | Self::Deactivating)
    }

    /// Whether the group's data is live.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether this terminal state already satisfies the target.
    fn matches_target(&self, target_active: bool) -> bool {
        match self {
            Self::Active => target_active,
            Self::Inactive => !target_active,
            Self::Activating | Self::Deactivating => false,
        }
    }

    fn terminal_for(target_active: bool) -> Self {
        if target_active {
            Self::Active
        } else {
            Self::Inactive
        }
    }

    fn transient_for(target_active: bool) -> Self {
        if target_active {
            Self::Activating
        } else {
            Self::Deactivating
        }
    }
}

/// Three-phase cancellable transition machine for one group.
#[derive(Debug)]
pub struct ActivationProtocol {
    /// Observable state; terminal except while a request holds the
    /// transition lock.
    state: Mutex<ActivationState>,
    /// Serializes transitions so at most one side effect runs per group.
    transition: tokio::sync::Mutex<()>,
}

impl ActivationProtocol {
    /// Create a protocol in the `Inactive` state.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ActivationState::Inactive),
            transition: tokio::sync::Mutex::new(()),
        }
    }

    /// Current observable state.
    pub fn state(&self) -> ActivationState {
        *self.state.lock()
    }

    /// Whether the group is currently active (transients count as their
    /// origin state: an `Activating` group is not yet active).
    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    fn set_state(&self, state: ActivationState) {
        *self.state.lock() = state;
    }

    /// Drive one transition toward `target_active`.
    ///
    /// Waits for any in-flight transition on this group, then:
    /// 1. Returns `Ok(false)` immediately when the state already matches
    ///    the target (no-op success).
    /// 2. Returns `Err(Cancelled)` without entering the transient phase
    ///    when `token` has already fired.
    /// 3. Otherwise enters the transient state and runs `effect`, which
    ///    receives a clone of `token` and is expected to check it at its
    ///    own checkpoints.
    /// 4. Commits the terminal state on success (`Ok(true)`). A failed
    ///    or cancelled activation rolls back to `Inactive`; a failed or
    ///    cancelled deactivation still commits `Inactive`, since a group
    ///    whose teardown ran and errored cannot be trusted as active.
    ///    Either way the error is surfaced and the machine is never left
    ///    transient.
    pub async fn request<F, Fut>(
        &self,
        target_active: bool,
        token: &CancelToken,
        effect: F,
    ) -> StrataResult<bool>
    where
        F: FnOnce(CancelToken) -> Fut,
        Fut: Future<Output = StrataResult<()>>,
    {
        let _guard = self.transition.lock().await;

        let prior = self.state();
        debug_assert!(
            !prior.is_transient(),
            "transient state observed while holding the transition lock"
        );
        if prior.matches_target(target_active) {
            return Ok(false);
        }
        if token.is_cancelled() {
            return Err(StrataError::Cancelled);
        }

        self.set_state(ActivationState::transient_for(target_active));
        let result = effect(token.clone()).await;
        match result {
            Ok(()) => {
                self.set_state(ActivationState::terminal_for(target_active));
                Ok(true)
            }
            Err(err) => {
                // Activation failures roll back; deactivation failures
                // still land Inactive, teardown is not resumable.
                self.set_state(if target_active {
                    prior
                } else {
                    ActivationState::Inactive
                });
                Err(err)
            }
        }
    }
}

impl Default for ActivationProtocol {
    fn default() -> Self {
        Self::new()
    }
}
