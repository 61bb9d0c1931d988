//! CLI command implementations.

mod activate;
mod config;
mod tree;

pub use activate::{run_activate, ActivateArgs};
pub use config::{run_config, ConfigArgs};
pub use tree::{run_tree, TreeArgs};
