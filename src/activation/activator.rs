//! Single and batch activation orchestration.
//!
//! The activator drives [`ActivationProtocol`] transitions, invoking the
//! external side effect and absorbing its failures: a failed group
//! degrades to `false` and an error report on the message sink, it never
//! aborts a batch. Batches fan out one task per group under a shared
//! cancellation token; only shutdown interruption is re-raised to the
//! caller, after every in-flight sibling has wound down.

use crate::activation::effect::{ActivationEffect, MessageSink};
use crate::core::cancel::CancelToken;
use crate::core::config::ActivationConfig;
use crate::core::error::{StrataError, StrataResult};
use crate::group::node::GroupNode;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Counters describing activator behavior over its lifetime.
#[derive(Debug, Default)]
pub struct ActivationStats {
    /// Transitions requested, including no-ops.
    attempted: AtomicU64,
    /// Transitions that committed or were no-op successes.
    succeeded: AtomicU64,
    /// Transitions whose side effect failed and rolled back.
    failed: AtomicU64,
    /// Transitions that wound down after a cancellation.
    cancelled: AtomicU64,
    /// Batches that were interrupted by shutdown.
    batches_interrupted: AtomicU64,
}

/// Point-in-time copy of [`ActivationStats`].
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsSnapshot {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub batches_interrupted: u64,
}

impl ActivationStats {
    /// Take a consistent-enough snapshot for reporting.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            attempted: self.attempted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            batches_interrupted: self.batches_interrupted.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// What a batch task runs per group.
#[derive(Debug, Clone, Copy)]
enum BatchOp {
    Set(bool),
    Reactivate,
}

/// Orchestrates activation requests over group protocols.
///
/// Cheap to clone; clones share the effect, sink, shutdown token,
/// concurrency limiter, and stats.
#[derive(Clone)]
pub struct Activator {
    effect: Arc<dyn ActivationEffect>,
    sink: Arc<dyn MessageSink>,
    shutdown: CancelToken,
    limiter: Arc<Semaphore>,
    effect_timeout_ms: u64,
    stats: Arc<ActivationStats>,
}

impl Activator {
    /// Create an activator.
    ///
    /// `shutdown` is the interruption source: when it fires, waiting
    /// callers get [`StrataError::Interrupted`] and batches cancel their
    /// shared token.
    pub fn new(
        effect: Arc<dyn ActivationEffect>,
        sink: Arc<dyn MessageSink>,
        shutdown: CancelToken,
        config: &ActivationConfig,
    ) -> Self {
        Self {
            effect,
            sink,
            shutdown,
            limiter: Arc::new(Semaphore::new(config.resolved_concurrency())),
            effect_timeout_ms: config.effect_timeout_ms,
            stats: Arc::new(ActivationStats::default()),
        }
    }

    /// Lifetime counters.
    pub fn stats(&self) -> &ActivationStats {
        &self.stats
    }

    /// Bring one group to the requested activation state.
    ///
    /// Side-effect failure degrades to `Ok(false)` with an error report
    /// on the sink; `Ok(true)` covers both committed transitions and
    /// no-op successes. Only shutdown interruption is an `Err`.
    pub async fn set_active(&self, group: &Arc<GroupNode>, active: bool) -> StrataResult<bool> {
        let ok = self.drive(group, active, &self.shutdown).await;
        if !ok && self.shutdown.is_cancelled() {
            return Err(StrataError::Interrupted);
        }
        Ok(ok)
    }

    /// Bring many groups to the requested activation state in parallel.
    ///
    /// One task per group, bounded by the configured concurrency, all
    /// sharing one cancellation token. The result is the logical AND of
    /// the per-group results. When shutdown fires mid-batch the shared
    /// token is cancelled so siblings wind down (in-flight transitions
    /// still complete their own commit or rollback; tasks that have not
    /// entered their transient phase never do), and after every task has
    /// joined the call returns [`StrataError::Interrupted`].
    pub async fn set_active_many(
        &self,
        groups: &[Arc<GroupNode>],
        active: bool,
    ) -> StrataResult<bool> {
        self.run_batch(groups, BatchOp::Set(active)).await
    }

    /// Deactivate one group, then activate it again only if the
    /// deactivation succeeded.
    pub async fn reactivate(&self, group: &Arc<GroupNode>) -> StrataResult<bool> {
        if !self.set_active(group, false).await? {
            return Ok(false);
        }
        self.set_active(group, true).await
    }

    /// Batched analogue of [`reactivate`](Self::reactivate): each group
    /// runs its own deactivate-then-activate sequence, with the same
    /// cancellation discipline as [`set_active_many`](Self::set_active_many).
    pub async fn reactivate_many(&self, groups: &[Arc<GroupNode>]) -> StrataResult<bool> {
        self.run_batch(groups, BatchOp::Reactivate).await
    }

    /// Drive one protocol transition, absorbing failures.
    ///
    /// Returns whether the group ended in the target state.
    async fn drive(&self, group: &Arc<GroupNode>, target: bool, token: &CancelToken) -> bool {
        ActivationStats::bump(&self.stats.attempted);

        let timeout_ms = self.effect_timeout_ms;
        let outcome = group
            .activation()
            .request(target, token, |effect_token| {
                let effect = Arc::clone(&self.effect);
                let group = Arc::clone(group);
                async move {
                    if timeout_ms == 0 {
                        return effect.apply(&group, target, &effect_token).await;
                    }
                    match tokio::time::timeout(
                        Duration::from_millis(timeout_ms),
                        effect.apply(&group, target, &effect_token),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(StrataError::activation_failed(
                            group.id(),
                            format!("side effect exceeded {timeout_ms}ms"),
                        )),
                    }
                }
            })
            .await;

        match outcome {
            Ok(changed) => {
                ActivationStats::bump(&self.stats.succeeded);
                tracing::debug!(group = %group.id(), active = target, changed, "activation transition done");
                true
            }
            Err(StrataError::Cancelled) => {
                ActivationStats::bump(&self.stats.cancelled);
                tracing::debug!(group = %group.id(), active = target, "activation transition cancelled");
                false
            }
            Err(err) => {
                ActivationStats::bump(&self.stats.failed);
                tracing::warn!(group = %group.id(), active = target, error = %err, "activation transition failed");
                self.sink.report(&err.to_string(), true);
                false
            }
        }
    }

    async fn run_batch(&self, groups: &[Arc<GroupNode>], op: BatchOp) -> StrataResult<bool> {
        if groups.is_empty() {
            return Ok(true);
        }

        let shared = CancelToken::new();
        if self.shutdown.is_cancelled() {
            shared.cancel();
        }

        let mut handles = Vec::with_capacity(groups.len());
        for group in groups {
            let this = self.clone();
            let group = Arc::clone(group);
            let token = shared.clone();
            handles.push(tokio::spawn(async move {
                let Ok(_permit) = this.limiter.acquire().await else {
                    return false;
                };
                match op {
                    BatchOp::Set(active) => this.drive(&group, active, &token).await,
                    BatchOp::Reactivate => {
                        if !this.drive(&group, false, &token).await {
                            return false;
                        }
                        this.drive(&group, true, &token).await
                    }
                }
            }));
        }

        let mut join_all = Box::pin(async move {
            let mut all_ok = true;
            for handle in handles {
                match handle.await {
                    Ok(ok) => all_ok &= ok,
                    Err(err) => {
                        tracing::error!(error = %err, "activation task panicked");
                        all_ok = false;
                    }
                }
            }
            all_ok
        });

        let joined = tokio::select! {
            all_ok = &mut join_all => Some(all_ok),
            _ = self.shutdown.cancelled() => None,
        };
        let all_ok = match joined {
            Some(all_ok) => all_ok,
            None => {
                tracing::warn!("shutdown during batch activation, cancelling siblings");
                shared.cancel();
                join_all.await
            }
        };

        if shared.is_cancelled() {
            ActivationStats::bump(&self.stats.batches_interrupted);
            return Err(StrataError::Interrupted);
        }
        Ok(all_ok)
    }
}

impl std::fmt::Debug for Activator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Activator")
            .field("effect_timeout_ms", &self.effect_timeout_ms)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
