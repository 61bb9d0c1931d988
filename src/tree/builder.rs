//! Categorized display tree derivation.
//!
//! The builder walks a snapshot of the live group graph and produces a
//! [`DisplayTree`]. Three modes:
//! - categorized (default): flattenable groups hoist their children to
//!   the category level, single-member childless groups collapse to one
//!   layer row, buckets are keyed by the categorizer;
//! - by layers: one row per member layer across all passing groups;
//! - mirrored: a structurally faithful copy of the graph.
//!
//! The output is deterministic for a given snapshot, categorizer, and
//! comparator: buckets are emitted in lexical category order, sorts are
//! stable, and ties break on display name.

use crate::group::member::{Layer, MemberRef};
use crate::group::node::GroupNode;
use crate::tree::display::{DisplayNode, DisplayTree};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Assigns zero or more category labels to a group.
pub type Categorizer = Box<dyn Fn(&Arc<GroupNode>) -> Vec<String> + Send + Sync>;

/// Assigns zero or more category labels to a layer.
pub type LayerCategorizer = Box<dyn Fn(&dyn Layer) -> Vec<String> + Send + Sync>;

/// Decides whether a group is included.
pub type GroupFilter = Box<dyn Fn(&Arc<GroupNode>) -> bool + Send + Sync>;

/// Decides whether a layer is included.
pub type LayerFilter = Box<dyn Fn(&dyn Layer) -> bool + Send + Sync>;

/// Orders two groups within a bucket.
pub type GroupComparator = Box<dyn Fn(&Arc<GroupNode>, &Arc<GroupNode>) -> Ordering + Send + Sync>;

/// Derives display trees from the live group graph.
///
/// Configure with the builder-style `with_*` methods, then call one of
/// the `build*` methods with a slice of root groups. Hidden groups never
/// pass the filters; their children are still visited when the hidden
/// group is flattenable, since filters apply per node and traversal
/// continues regardless.
pub struct TreeBuilder {
    categorizer: Categorizer,
    layer_categorizer: LayerCategorizer,
    group_filter: GroupFilter,
    layer_filter: LayerFilter,
    comparator: GroupComparator,
}

impl TreeBuilder {
    /// Create a builder with defaults: groups categorize by their own
    /// category tags, layers by their kind, all pass, name order.
    pub fn new() -> Self {
        Self {
            categorizer: Box::new(|group| group.categories().into_iter().collect()),
            layer_categorizer: Box::new(|layer| vec![layer.kind().to_string()]),
            group_filter: Box::new(|_| true),
            layer_filter: Box::new(|_| true),
            comparator: Box::new(default_comparator),
        }
    }

    /// Replace the group categorizer.
    pub fn with_categorizer(
        mut self,
        categorizer: impl Fn(&Arc<GroupNode>) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        self.categorizer = Box::new(categorizer);
        self
    }

    /// Replace the layer categorizer used by
    /// [`build_by_layers`](Self::build_by_layers).
    pub fn with_layer_categorizer(
        mut self,
        categorizer: impl Fn(&dyn Layer) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        self.layer_categorizer = Box::new(categorizer);
        self
    }

    /// Replace the group filter.
    pub fn with_group_filter(
        mut self,
        filter: impl Fn(&Arc<GroupNode>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.group_filter = Box::new(filter);
        self
    }

    /// Replace the layer filter.
    pub fn with_layer_filter(
        mut self,
        filter: impl Fn(&dyn Layer) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.layer_filter = Box::new(filter);
        self
    }

    /// Replace the bucket comparator. Sorts stay stable and ties still
    /// break on display name.
    pub fn with_comparator(
        mut self,
        comparator: impl Fn(&Arc<GroupNode>, &Arc<GroupNode>) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        self.comparator = Box::new(comparator);
        self
    }

    // ------------------------------------------------------------------
    // Categorized mode
    // ------------------------------------------------------------------

    /// Build the categorized, flattened display tree.
    pub fn build(&self, roots: &[Arc<GroupNode>]) -> DisplayTree {
        let mut units = Vec::new();
        for root in roots {
            self.collect_units(root, &mut units);
        }

        let mut buckets: BTreeMap<String, Vec<Arc<GroupNode>>> = BTreeMap::new();
        for unit in &units {
            for category in (self.categorizer)(unit) {
                buckets.entry(category).or_default().push(Arc::clone(unit));
            }
        }

        let mut tree = DisplayTree::default();
        for (category, mut bucket) in buckets {
            self.sort_bucket(&mut bucket);
            let mut node = DisplayNode::category(category);
            node.group_count = bucket.len();
            for group in &bucket {
                node.children.push(self.display_node_for(group));
            }
            tree.roots.push(node);
        }
        tree
    }

    /// Collect categorization units: every passing node reachable by
    /// walking through flattenable groups. A flattenable group's
    /// children are hoisted to the category level; a non-flattenable
    /// group keeps its subtree nested beneath it.
    fn collect_units(&self, node: &Arc<GroupNode>, out: &mut Vec<Arc<GroupNode>>) {
        if self.passes(node) {
            out.push(Arc::clone(node));
        }
        if node.is_flattenable() {
            for child in node.children() {
                self.collect_units(&child, out);
            }
        }
    }

    /// Build the display row for one unit.
    fn display_node_for(&self, group: &Arc<GroupNode>) -> DisplayNode {
        if group.is_collapsible() {
            if let Some(member) = group.members().into_iter().next() {
                if (self.layer_filter)(member.as_ref()) {
                    return DisplayNode::layer(&member, Some(group));
                }
            }
        }

        let mut node = DisplayNode::group(group);
        node.members = group
            .members()
            .into_iter()
            .filter(|m| (self.layer_filter)(m.as_ref()))
            .collect();

        // A flattenable unit's children were hoisted; only nest below
        // groups that keep their structure.
        if !group.is_flattenable() {
            let mut children: Vec<Arc<GroupNode>> = group
                .children()
                .into_iter()
                .filter(|c| self.passes(c))
                .collect();
            if !group.preserves_child_order() {
                self.sort_bucket(&mut children);
            }
            for child in &children {
                node.children.push(self.display_node_for(child));
            }
        }
        node
    }

    // ------------------------------------------------------------------
    // By-layers mode
    // ------------------------------------------------------------------

    /// Build a tree with one row per member layer across all passing
    /// groups, categorized by the layer categorizer. A layer reachable
    /// through several groups appears once.
    pub fn build_by_layers(&self, roots: &[Arc<GroupNode>]) -> DisplayTree {
        let mut units = Vec::new();
        for root in roots {
            self.collect_units(root, &mut units);
        }

        let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut buckets: BTreeMap<String, Vec<(MemberRef, Arc<GroupNode>)>> = BTreeMap::new();
        for unit in &units {
            for member in unit.members() {
                if !(self.layer_filter)(member.as_ref()) {
                    continue;
                }
                if !seen.insert(member.id().to_string()) {
                    continue;
                }
                for category in (self.layer_categorizer)(member.as_ref()) {
                    buckets
                        .entry(category)
                        .or_default()
                        .push((Arc::clone(&member), Arc::clone(unit)));
                }
            }
        }

        let mut tree = DisplayTree::default();
        for (category, mut rows) in buckets {
            rows.sort_by(|(a, _), (b, _)| {
                lowercase(a.display_name())
                    .cmp(&lowercase(b.display_name()))
                    .then_with(|| a.id().cmp(b.id()))
            });
            let mut node = DisplayNode::category(category);
            node.group_count = rows.len();
            for (member, origin) in &rows {
                node.children.push(DisplayNode::layer(member, Some(origin)));
            }
            tree.roots.push(node);
        }
        tree
    }

    // ------------------------------------------------------------------
    // Mirrored mode
    // ------------------------------------------------------------------

    /// Build a structurally faithful tree mirroring the group graph.
    ///
    /// No hoisting and no collapse; filters only decide which branches
    /// are included, and a filtered-out group drops its whole branch.
    /// Child order follows the stored order when the group preserves it,
    /// the comparator otherwise.
    pub fn build_mirrored(&self, roots: &[Arc<GroupNode>]) -> DisplayTree {
        let mut included: Vec<Arc<GroupNode>> = roots
            .iter()
            .filter(|r| self.passes(r))
            .cloned()
            .collect();
        self.sort_bucket(&mut included);

        let mut tree = DisplayTree::default();
        for root in &included {
            tree.roots.push(self.mirror_node(root));
        }
        tree
    }

    fn mirror_node(&self, group: &Arc<GroupNode>) -> DisplayNode {
        let mut node = DisplayNode::group(group);
        node.members = group
            .members()
            .into_iter()
            .filter(|m| (self.layer_filter)(m.as_ref()))
            .collect();

        let mut children: Vec<Arc<GroupNode>> = group
            .children()
            .into_iter()
            .filter(|c| self.passes(c))
            .collect();
        if !group.preserves_child_order() {
            self.sort_bucket(&mut children);
        }
        for child in &children {
            node.children.push(self.mirror_node(child));
        }
        node
    }

    // ------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------

    /// Per-node filter decision: hidden groups never pass; otherwise the
    /// group filter and the layer filter (a group with members passes
    /// when at least one member does; a pure folder always passes the
    /// layer side).
    fn passes(&self, node: &Arc<GroupNode>) -> bool {
        if node.is_hidden() || !(self.group_filter)(node) {
            return false;
        }
        let members = node.members();
        members.is_empty() || members.iter().any(|m| (self.layer_filter)(m.as_ref()))
    }

    fn sort_bucket(&self, bucket: &mut [Arc<GroupNode>]) {
        bucket.sort_by(|a, b| {
            (self.comparator)(a, b)
                .then_with(|| lowercase(&a.display_name()).cmp(&lowercase(&b.display_name())))
                .then_with(|| a.id().cmp(&b.id()))
        });
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_comparator(a: &Arc<GroupNode>, b: &Arc<GroupNode>) -> Ordering {
    lowercase(&a.display_name()).cmp(&lowercase(&b.display_name()))
}

fn lowercase(s: &str) -> String {
    s.to_lowercase()
}
