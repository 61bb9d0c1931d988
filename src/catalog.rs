//! Catalog manifests.
//!
//! A catalog is a TOML description of a group tree: groups with flags,
//! category tags, parent links, and leaf layer entries. Catalogs are the
//! fixture surface for the CLI and tests; embedders building graphs
//! programmatically do not need them.
//!
//! ```toml
//! [[group]]
//! id = "basemaps"
//! name = "Base Maps"
//! categories = ["Imagery"]
//!
//! [[group.layer]]
//! id = "osm"
//! name = "OpenStreetMap"
//! kind = "raster"
//!
//! [[group]]
//! id = "overlays"
//! name = "Overlays"
//! parent = "basemaps"
//! ```

use crate::group::member::StaticLayer;
use crate::group::node::GroupNode;
use crate::group::registry::KeyRegistry;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// A parsed catalog manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Group entries in declaration order.
    #[serde(default, rename = "group")]
    pub groups: Vec<GroupEntry>,
}

/// One group in a catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupEntry {
    /// Globally unique group id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Id of the parent group; absent for roots.
    #[serde(default)]
    pub parent: Option<String>,

    /// Category tags.
    #[serde(default)]
    pub categories: Vec<String>,

    /// Whether display building may flatten this group.
    #[serde(default = "default_true")]
    pub flattenable: bool,

    /// Whether child order is meaningful.
    #[serde(default)]
    pub preserve_child_order: bool,

    /// Whether the group is excluded from display trees.
    #[serde(default)]
    pub hidden: bool,

    /// Leaf layer entries.
    #[serde(default, rename = "layer")]
    pub layers: Vec<LayerEntry>,
}

/// One layer in a catalog group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerEntry {
    /// Globally unique layer id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Kind tag used by layer categorizers.
    #[serde(default = "default_kind")]
    pub kind: String,
}

fn default_true() -> bool {
    true
}

fn default_kind() -> String {
    "raster".to_string()
}

impl Catalog {
    /// Load a catalog from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog file: {}", path.display()))?;
        let catalog: Catalog =
            toml::from_str(&content).with_context(|| "failed to parse catalog file")?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let catalog: Catalog =
            toml::from_str(content).with_context(|| "failed to parse catalog")?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Validate manifest consistency: non-empty unique ids, resolvable
    /// parent links. Parent cycles spanning several entries surface
    /// later, during [`instantiate`](Self::instantiate), as cycle
    /// rejections from the graph itself.
    pub fn validate(&self) -> Result<()> {
        let mut group_ids = HashSet::new();
        let mut layer_ids = HashSet::new();
        for group in &self.groups {
            if group.id.is_empty() {
                anyhow::bail!("catalog group with empty id");
            }
            if !group_ids.insert(group.id.as_str()) {
                anyhow::bail!("duplicate group id in catalog: {}", group.id);
            }
            for layer in &group.layers {
                if layer.id.is_empty() {
                    anyhow::bail!("catalog layer with empty id in group {}", group.id);
                }
                if !layer_ids.insert(layer.id.as_str()) {
                    anyhow::bail!("duplicate layer id in catalog: {}", layer.id);
                }
            }
        }
        for group in &self.groups {
            if let Some(ref parent) = group.parent {
                if parent == &group.id {
                    anyhow::bail!("group {} lists itself as parent", group.id);
                }
                if !group_ids.contains(parent.as_str()) {
                    anyhow::bail!(
                        "group {} references unknown parent: {}",
                        group.id,
                        parent
                    );
                }
            }
        }
        Ok(())
    }

    /// Build the live group graph this catalog describes and register
    /// every group in `registry`. Returns the root groups in declaration
    /// order.
    pub fn instantiate(&self, registry: &KeyRegistry) -> Result<Vec<Arc<GroupNode>>> {
        let mut nodes: HashMap<String, Arc<GroupNode>> = HashMap::new();

        for entry in &self.groups {
            let node = if entry.parent.is_none() {
                GroupNode::new_root(&entry.id, &entry.name)
            } else {
                GroupNode::new(&entry.id, &entry.name)
            };
            node.set_flattenable(entry.flattenable);
            node.set_preserve_child_order(entry.preserve_child_order);
            node.set_hidden(entry.hidden);
            for category in &entry.categories {
                node.add_category(category.clone());
            }
            for layer in &entry.layers {
                node.add_member(StaticLayer::new(&layer.id, &layer.name, &layer.kind).into_member());
            }
            registry.set(&entry.id, &node);
            nodes.insert(entry.id.clone(), node);
        }

        for entry in &self.groups {
            if let Some(ref parent_id) = entry.parent {
                let parent = &nodes[parent_id];
                let child = &nodes[&entry.id];
                parent.add_child(child).with_context(|| {
                    format!("failed to attach group {} under {}", entry.id, parent_id)
                })?;
            }
        }

        let roots = self
            .groups
            .iter()
            .filter(|entry| entry.parent.is_none())
            .map(|entry| Arc::clone(&nodes[&entry.id]))
            .collect();
        Ok(roots)
    }
}
