//! Collaborator traits consumed by the activation layer.
//!
//! The core never performs the real activation work itself. The
//! surrounding system supplies an [`ActivationEffect`] that does the
//! network fetches and rendering setup for one group, and a
//! [`MessageSink`] that carries user-facing error reports.

use crate::core::cancel::CancelToken;
use crate::core::error::StrataResult;
use crate::group::node::GroupNode;
use std::sync::Arc;

/// Performs the real activate/deactivate work for one group.
///
/// Implementations must be safe to call concurrently for different
/// groups and must check the token periodically, returning
/// [`StrataError::Cancelled`](crate::core::error::StrataError::Cancelled)
/// when it fires.
#[async_trait::async_trait]
pub trait ActivationEffect: Send + Sync {
    /// Bring `group` to the requested activation state.
    async fn apply(
        &self,
        group: &Arc<GroupNode>,
        target_active: bool,
        token: &CancelToken,
    ) -> StrataResult<()>;
}

/// Fire-and-forget surface for user-facing messages.
pub trait MessageSink: Send + Sync {
    /// Deliver a message; `is_error` distinguishes errors from notices.
    fn report(&self, message: &str, is_error: bool);
}

/// Sink that forwards reports to the tracing pipeline.
///
/// The default sink for embedders that have no UI message surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MessageSink for TracingSink {
    fn report(&self, message: &str, is_error: bool) {
        if is_error {
            tracing::error!(target: "strata::messages", "{message}");
        } else {
            tracing::info!(target: "strata::messages", "{message}");
        }
    }
}

/// Effect that succeeds without doing any work.
///
/// Useful for embedders that only want the state machine bookkeeping,
/// and for tests and simulations.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEffect;

#[async_trait::async_trait]
impl ActivationEffect for NoopEffect {
    async fn apply(
        &self,
        _group: &Arc<GroupNode>,
        _target_active: bool,
        _token: &CancelToken,
    ) -> StrataResult<()> {
        Ok(())
    }
}
