//! Component lifecycle wiring.
//!
//! The runtime assembles the pieces an embedder needs: the key
//! registry, the activator bound to the caller's side effect and
//! message sink, the shared shutdown token, and the periodic registry
//! cleanup sweep. Shutdown is cooperative: cancelling the token stops
//! the sweep and interrupts waiting activation calls; nothing is
//! force-killed.

use crate::activation::activator::Activator;
use crate::activation::effect::{ActivationEffect, MessageSink};
use crate::core::cancel::CancelToken;
use crate::core::config::Config;
use crate::group::registry::KeyRegistry;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Strata runtime holding the assembled components.
pub struct Runtime {
    /// Configuration.
    config: Arc<Config>,

    /// Shared id → group lookup.
    registry: Arc<KeyRegistry>,

    /// Activation orchestrator.
    activator: Activator,

    /// Shutdown signal shared with the activator and the sweep task.
    shutdown: CancelToken,

    /// Whether the runtime is running.
    running: Arc<AtomicBool>,

    /// Registry cleanup sweep task handle.
    sweeper: Option<JoinHandle<()>>,
}

impl Runtime {
    /// Create a runtime from configuration and the embedder's
    /// collaborators.
    pub fn new(
        config: Config,
        effect: Arc<dyn ActivationEffect>,
        sink: Arc<dyn MessageSink>,
    ) -> Result<Self> {
        config.validate().context("invalid configuration")?;

        let shutdown = CancelToken::new();
        let registry = Arc::new(KeyRegistry::new());
        let activator = Activator::new(effect, sink, shutdown.clone(), &config.activation);

        Ok(Self {
            config: Arc::new(config),
            registry,
            activator,
            shutdown,
            running: Arc::new(AtomicBool::new(false)),
            sweeper: None,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the shared registry.
    pub fn registry(&self) -> &Arc<KeyRegistry> {
        &self.registry
    }

    /// Get the activation orchestrator.
    pub fn activator(&self) -> &Activator {
        &self.activator
    }

    /// Clone the shutdown token for cooperating tasks.
    pub fn shutdown_token(&self) -> CancelToken {
        self.shutdown.clone()
    }

    /// Check if the runtime is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start the runtime: spawns the periodic registry cleanup sweep.
    ///
    /// Must be called from within a tokio runtime. Idempotent.
    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!(
            cleanup_interval_ms = self.config.registry.cleanup_interval_ms,
            "starting strata runtime"
        );

        let registry = Arc::clone(&self.registry);
        let shutdown = self.shutdown.clone();
        let period = Duration::from_millis(self.config.registry.cleanup_interval_ms);
        self.sweeper = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick resolves immediately; skip it so the sweep
            // runs one full period after startup.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = registry.cleanup();
                        if evicted > 0 {
                            tracing::debug!(evicted, "registry cleanup sweep");
                        }
                    }
                }
            }
        }));

        tracing::info!("strata runtime started");
    }

    /// Trigger cooperative shutdown without waiting for tasks.
    pub fn shutdown(&self) {
        tracing::info!("shutdown requested");
        self.shutdown.cancel();
    }

    /// Stop the runtime: cancels the shutdown token and waits for the
    /// sweep task to exit.
    pub async fn stop(&mut self) {
        self.shutdown.cancel();
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.sweeper.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "registry sweep task panicked");
            }
        }
        tracing::info!("strata runtime stopped");
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("running", &self.is_running())
            .field("registry_len", &self.registry.len())
            .finish()
    }
}
