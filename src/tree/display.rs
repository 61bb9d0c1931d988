//! Display tree output model.
//!
//! A display tree is a snapshot: an ordered, labeled tree derived from
//! the live group graph by [`TreeBuilder`](crate::tree::builder::TreeBuilder)
//! and handed to the UI layer. Nodes keep weak back-references to their
//! originating groups so a stale tree never pins a deleted subtree. The
//! JSON projection is fully owned and reference-free.

use crate::group::member::MemberRef;
use crate::group::node::GroupNode;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Weak};

/// What a display node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayKind {
    /// A category bucket.
    Category,
    /// A group row.
    Group,
    /// A single layer row (direct, or a collapsed single-member group).
    Layer,
}

/// One node of a display tree.
#[derive(Clone)]
pub struct DisplayNode {
    /// Stable identifier: category label, group id, or layer id.
    pub id: String,
    /// Label shown in the UI.
    pub label: String,
    /// Node kind.
    pub kind: DisplayKind,
    /// Originating group, when any. Weak: the display tree never keeps
    /// the graph alive.
    pub origin: Option<Weak<GroupNode>>,
    /// Member layers attached to this row.
    pub members: Vec<MemberRef>,
    /// For category nodes: how many groups contributed directly under
    /// this category.
    pub group_count: usize,
    /// Ordered sub-nodes.
    pub children: Vec<DisplayNode>,
}

impl DisplayNode {
    /// Create a category bucket node.
    pub fn category(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            id: label.clone(),
            label,
            kind: DisplayKind::Category,
            origin: None,
            members: Vec::new(),
            group_count: 0,
            children: Vec::new(),
        }
    }

    /// Create a group row for `group`.
    pub fn group(group: &Arc<GroupNode>) -> Self {
        Self {
            id: group.id(),
            label: group.display_name(),
            kind: DisplayKind::Group,
            origin: Some(Arc::downgrade(group)),
            members: Vec::new(),
            group_count: 0,
            children: Vec::new(),
        }
    }

    /// Create a layer row, optionally backed by the group it came from
    /// (a collapsed single-member group keeps its origin).
    pub fn layer(member: &MemberRef, origin: Option<&Arc<GroupNode>>) -> Self {
        Self {
            id: member.id().to_string(),
            label: member.display_name().to_string(),
            kind: DisplayKind::Layer,
            origin: origin.map(Arc::downgrade),
            members: vec![Arc::clone(member)],
            group_count: 0,
            children: Vec::new(),
        }
    }

    /// Resolve the originating group, if it is still alive.
    pub fn origin_group(&self) -> Option<Arc<GroupNode>> {
        self.origin.as_ref().and_then(Weak::upgrade)
    }

    /// Total number of nodes in this subtree, including self.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(DisplayNode::subtree_len)
            .sum::<usize>()
    }

    fn to_json(&self) -> DisplayNodeJson {
        DisplayNodeJson {
            id: self.id.clone(),
            label: self.label.clone(),
            kind: self.kind,
            layers: self
                .members
                .iter()
                .map(|m| m.display_name().to_string())
                .collect(),
            group_count: self.group_count,
            children: self.children.iter().map(DisplayNode::to_json).collect(),
        }
    }
}

impl fmt::Debug for DisplayNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayNode")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("group_count", &self.group_count)
            .field("children", &self.children.len())
            .finish()
    }
}

/// An ordered, labeled tree ready for display.
#[derive(Debug, Clone, Default)]
pub struct DisplayTree {
    /// Top-level nodes, in display order.
    pub roots: Vec<DisplayNode>,
}

impl DisplayTree {
    /// Total number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.roots.iter().map(DisplayNode::subtree_len).sum()
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Owned, reference-free projection for serialization.
    pub fn to_json(&self) -> DisplayTreeJson {
        DisplayTreeJson {
            roots: self.roots.iter().map(DisplayNode::to_json).collect(),
        }
    }
}

/// Serializable projection of a display tree.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayTreeJson {
    pub roots: Vec<DisplayNodeJson>,
}

/// Serializable projection of one display node.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayNodeJson {
    pub id: String,
    pub label: String,
    pub kind: DisplayKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub layers: Vec<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub group_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DisplayNodeJson>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(count: &usize) -> bool {
    *count == 0
}
