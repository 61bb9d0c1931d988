//! Activate command implementation.
//!
//! Loads a catalog into a runtime and drives a simulated activation
//! batch over its groups, with optional injected failures and work
//! delay. Prints per-group outcomes and the activator's counters.

use crate::activation::effect::{ActivationEffect, MessageSink};
use crate::catalog::Catalog;
use crate::core::cancel::CancelToken;
use crate::core::config::Config;
use crate::core::error::{StrataError, StrataResult};
use crate::core::runtime::Runtime;
use crate::group::node::GroupNode;
use anyhow::Result;
use clap::Args;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Run a simulated activation over a catalog.
#[derive(Args, Debug)]
pub struct ActivateArgs {
    /// Catalog file path.
    pub catalog: PathBuf,

    /// Deactivate instead of activate.
    #[arg(long)]
    pub deactivate: bool,

    /// Group ids whose side effect fails (repeatable).
    #[arg(long)]
    pub fail: Vec<String>,

    /// Simulated per-group work duration in milliseconds.
    #[arg(long, default_value_t = 50)]
    pub delay_ms: u64,

    /// Restrict to these group ids (repeatable); all groups otherwise.
    #[arg(long)]
    pub group: Vec<String>,
}

/// Side effect that sleeps for the configured delay and fails for the
/// listed group ids.
struct SimulatedEffect {
    delay: Duration,
    fail: HashSet<String>,
}

#[async_trait::async_trait]
impl ActivationEffect for SimulatedEffect {
    async fn apply(
        &self,
        group: &Arc<GroupNode>,
        target_active: bool,
        token: &CancelToken,
    ) -> StrataResult<()> {
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => {}
            _ = token.cancelled() => return Err(StrataError::Cancelled),
        }
        if target_active && self.fail.contains(&group.id()) {
            return Err(StrataError::activation_failed(group.id(), "simulated failure"));
        }
        Ok(())
    }
}

/// Sink that prints user-facing reports to stderr.
struct ConsoleSink;

impl MessageSink for ConsoleSink {
    fn report(&self, message: &str, is_error: bool) {
        if is_error {
            eprintln!("error: {message}");
        } else {
            eprintln!("{message}");
        }
    }
}

/// Run the activate command.
pub async fn run_activate(args: ActivateArgs, config_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let catalog = Catalog::from_file(&args.catalog)?;

    let effect = Arc::new(SimulatedEffect {
        delay: Duration::from_millis(args.delay_ms),
        fail: args.fail.iter().cloned().collect(),
    });
    let mut runtime = Runtime::new(config, effect, Arc::new(ConsoleSink))?;
    runtime.start();

    let roots = catalog.instantiate(runtime.registry())?;
    let groups = select_groups(&roots, &args.group);
    if groups.is_empty() {
        anyhow::bail!("no matching groups in catalog");
    }

    let target_active = !args.deactivate;
    let all_ok = runtime
        .activator()
        .set_active_many(&groups, target_active)
        .await?;

    for group in &groups {
        println!("{:12} {:?}", group.id(), group.activation().state());
    }
    let stats = runtime.activator().stats().snapshot();
    println!(
        "batch {}: {}",
        if all_ok { "succeeded" } else { "had failures" },
        serde_json::to_string(&stats)?
    );

    runtime.stop().await;
    Ok(())
}

/// Flatten the catalog's trees into a group list, optionally restricted
/// to the requested ids.
fn select_groups(roots: &[Arc<GroupNode>], ids: &[String]) -> Vec<Arc<GroupNode>> {
    let mut groups = Vec::new();
    for root in roots {
        collect(root, &mut groups);
    }
    if ids.is_empty() {
        return groups;
    }
    let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
    groups
        .into_iter()
        .filter(|g| wanted.contains(g.id().as_str()))
        .collect()
}

fn collect(node: &Arc<GroupNode>, out: &mut Vec<Arc<GroupNode>>) {
    out.push(Arc::clone(node));
    for child in node.children() {
        collect(&child, out);
    }
}
