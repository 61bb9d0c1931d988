//! Tree command implementation.
//!
//! Loads a catalog, builds the requested display tree, and prints it as
//! indented text or JSON.

use crate::catalog::Catalog;
use crate::core::config::Config;
use crate::group::registry::KeyRegistry;
use crate::tree::builder::TreeBuilder;
use crate::tree::display::{DisplayNode, DisplayTree};
use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};

/// Render a catalog as a display tree.
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Catalog file path.
    pub catalog: PathBuf,

    /// One row per layer instead of per group.
    #[arg(long, conflicts_with = "mirror")]
    pub by_layers: bool,

    /// Mirror the group graph structurally instead of categorizing.
    #[arg(long)]
    pub mirror: bool,

    /// Only include layers of this kind.
    #[arg(long)]
    pub kind: Option<String>,

    /// Output format (text, json).
    #[arg(long, default_value = "text")]
    pub format: String,
}

/// Run the tree command.
pub fn run_tree(args: TreeArgs, config_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let catalog = Catalog::from_file(&args.catalog)?;
    let registry = KeyRegistry::new();
    let roots = catalog.instantiate(&registry)?;

    let fallback = config.tree.fallback_category.clone();
    let mut builder = TreeBuilder::new().with_categorizer(move |group| {
        let categories: Vec<String> = group.categories().into_iter().collect();
        if categories.is_empty() {
            vec![fallback.clone()]
        } else {
            categories
        }
    });
    if let Some(kind) = args.kind.clone() {
        builder = builder.with_layer_filter(move |layer| layer.kind() == kind);
    }

    let tree = if args.by_layers {
        builder.build_by_layers(&roots)
    } else if args.mirror {
        builder.build_mirrored(&roots)
    } else {
        builder.build(&roots)
    };

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&tree.to_json())?),
        _ => print_text(&tree),
    }
    Ok(())
}

fn print_text(tree: &DisplayTree) {
    if tree.is_empty() {
        println!("(empty tree)");
        return;
    }
    for root in &tree.roots {
        print_node(root, 0);
    }
}

fn print_node(node: &DisplayNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let suffix = if node.group_count > 0 {
        format!(" ({})", node.group_count)
    } else {
        String::new()
    };
    println!("{indent}{}{suffix}", node.label);
    for member in &node.members {
        // Collapsed layer rows already carry the member as their label.
        if node.label != member.display_name() {
            println!("{indent}  - {}", member.display_name());
        }
    }
    for child in &node.children {
        print_node(child, depth + 1);
    }
}
