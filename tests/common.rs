//! Common test utilities.
//!
//! Shared helpers for integration tests. Import with `mod common;`.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use strata::core::cancel::CancelToken;
use strata::core::config::ActivationConfig;
use strata::core::error::{StrataError, StrataResult};
use strata::group::member::{MemberRef, StaticLayer};
use strata::{ActivationEffect, Activator, GroupNode, MessageSink};

/// Build a raster layer handle.
pub fn layer(id: &str, name: &str) -> MemberRef {
    StaticLayer::new(id, name, "raster").into_member()
}

/// Build a layer handle with an explicit kind.
pub fn layer_of_kind(id: &str, name: &str, kind: &str) -> MemberRef {
    StaticLayer::new(id, name, kind).into_member()
}

/// Message sink that records every report.
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<(String, bool)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reports(&self) -> Vec<(String, bool)> {
        self.reports.lock().clone()
    }

    pub fn error_count(&self) -> usize {
        self.reports.lock().iter().filter(|(_, e)| *e).count()
    }
}

impl MessageSink for RecordingSink {
    fn report(&self, message: &str, is_error: bool) {
        self.reports.lock().push((message.to_string(), is_error));
    }
}

/// Configurable activation side effect for tests.
///
/// Sleeps for `delay` (observing the token), then fails for group ids
/// listed in `fail_activate` / `fail_deactivate`. Records which groups
/// entered the side effect at all.
#[derive(Default)]
pub struct ScriptedEffect {
    pub delay: Duration,
    pub fail_activate: HashSet<String>,
    pub fail_deactivate: HashSet<String>,
    /// Ignore the cancellation token entirely (models an effect between
    /// checkpoints).
    pub oblivious: bool,
    pub started: Mutex<Vec<String>>,
}

impl ScriptedEffect {
    pub fn instant() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing_activation(ids: &[&str]) -> Self {
        Self {
            fail_activate: ids.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing_deactivation(ids: &[&str]) -> Self {
        Self {
            fail_deactivate: ids.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Group ids whose side effect was entered, in order.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().clone()
    }
}

#[async_trait::async_trait]
impl ActivationEffect for ScriptedEffect {
    async fn apply(
        &self,
        group: &Arc<GroupNode>,
        target_active: bool,
        token: &CancelToken,
    ) -> StrataResult<()> {
        self.started.lock().push(group.id());

        if self.delay > Duration::ZERO {
            if self.oblivious {
                tokio::time::sleep(self.delay).await;
            } else {
                tokio::select! {
                    _ = tokio::time::sleep(self.delay) => {}
                    _ = token.cancelled() => return Err(StrataError::Cancelled),
                }
            }
        }

        let fails = if target_active {
            &self.fail_activate
        } else {
            &self.fail_deactivate
        };
        if fails.contains(&group.id()) {
            return Err(StrataError::activation_failed(group.id(), "scripted failure"));
        }
        Ok(())
    }
}

/// Build an activator over `effect` and `sink` with a fresh shutdown
/// token, returning the token alongside.
pub fn activator_with(
    effect: Arc<dyn ActivationEffect>,
    sink: Arc<dyn MessageSink>,
    max_concurrent: usize,
) -> (Activator, CancelToken) {
    let shutdown = CancelToken::new();
    let config = ActivationConfig {
        max_concurrent,
        effect_timeout_ms: 0,
    };
    let activator = Activator::new(effect, sink, shutdown.clone(), &config);
    (activator, shutdown)
}
