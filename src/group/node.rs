//! The group tree entity.
//!
//! A `GroupNode` is a folder-like entity holding child groups and member
//! layers. Nodes are shared as `Arc<GroupNode>`; the parent link is weak
//! so a subtree never keeps its ancestors alive. Every node guards its
//! mutable state with its own `RwLock`: structural mutators take the
//! write lock, read traversals take the read lock and return snapshots,
//! never live views. Different subtrees can therefore be mutated
//! concurrently without a global lock.
//!
//! Structural invariants:
//! - The parent/child relation is a forest. Mutations that would make a
//!   node its own ancestor are rejected with [`StrataError::Cycle`]
//!   before anything changes.
//! - Designated root nodes never acquire a parent.

use crate::activation::protocol::ActivationProtocol;
use crate::core::error::{StrataError, StrataResult};
use crate::group::listener::{GroupEvent, GroupListener, ListenerSet};
use crate::group::member::{same_layer, Layer, MemberRef};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Weak};

bitflags::bitflags! {
    /// Behavior flags for a group.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GroupFlags: u8 {
        /// Display building may hoist this group's children and collapse
        /// a single-member group into one leaf row.
        const FLATTENABLE = 0b0000_0001;
        /// Child order is meaningful; display building must not re-sort.
        const PRESERVE_CHILD_ORDER = 0b0000_0010;
        /// Excluded from display trees.
        const HIDDEN = 0b0000_0100;
    }
}

impl Default for GroupFlags {
    fn default() -> Self {
        Self::FLATTENABLE
    }
}

/// Mutable state guarded by the per-node lock.
struct NodeState {
    id: String,
    display_name: String,
    parent: Weak<GroupNode>,
    children: Vec<Arc<GroupNode>>,
    members: Vec<MemberRef>,
    flags: GroupFlags,
    categories: BTreeSet<String>,
}

/// A group in the layer tree.
pub struct GroupNode {
    is_root: bool,
    /// Back-reference to the owning `Arc`, set at construction; lets
    /// `&self` methods hand out parent links without a live `Arc`.
    weak_self: Weak<GroupNode>,
    state: RwLock<NodeState>,
    listeners: ListenerSet,
    activation: ActivationProtocol,
}

impl GroupNode {
    /// Create a new non-root group.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Arc<Self> {
        Self::build(id.into(), display_name.into(), false)
    }

    /// Create a designated root group. Root groups may never acquire a
    /// parent.
    pub fn new_root(id: impl Into<String>, display_name: impl Into<String>) -> Arc<Self> {
        Self::build(id.into(), display_name.into(), true)
    }

    fn build(id: String, display_name: String, is_root: bool) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            is_root,
            weak_self: weak_self.clone(),
            state: RwLock::new(NodeState {
                id,
                display_name,
                parent: Weak::new(),
                children: Vec::new(),
                members: Vec::new(),
                flags: GroupFlags::default(),
                categories: BTreeSet::new(),
            }),
            listeners: ListenerSet::new(),
            activation: ActivationProtocol::new(),
        })
    }

    // ------------------------------------------------------------------
    // Identity and attributes
    // ------------------------------------------------------------------

    /// The group's globally unique id. Uniqueness is enforced by the
    /// registry, not the node.
    pub fn id(&self) -> String {
        self.state.read().id.clone()
    }

    /// Human-readable name shown in display trees.
    pub fn display_name(&self) -> String {
        self.state.read().display_name.clone()
    }

    /// Rename the group.
    pub fn set_display_name(&self, display_name: impl Into<String>) {
        self.state.write().display_name = display_name.into();
    }

    /// Whether this group was constructed as a root.
    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// Replace the node's id. Id changes must go through
    /// [`KeyRegistry::rekey`](crate::group::registry::KeyRegistry::rekey),
    /// which keeps the lookup table consistent.
    pub(crate) fn set_id(&self, id: String) {
        self.state.write().id = id;
    }

    /// The activation state machine attached to this group.
    pub fn activation(&self) -> &ActivationProtocol {
        &self.activation
    }

    // ------------------------------------------------------------------
    // Flags and categories
    // ------------------------------------------------------------------

    /// Current flag set.
    pub fn flags(&self) -> GroupFlags {
        self.state.read().flags
    }

    /// Whether display building may flatten this group.
    pub fn is_flattenable(&self) -> bool {
        self.flags().contains(GroupFlags::FLATTENABLE)
    }

    /// Whether child order is meaningful.
    pub fn preserves_child_order(&self) -> bool {
        self.flags().contains(GroupFlags::PRESERVE_CHILD_ORDER)
    }

    /// Whether the group is excluded from display trees.
    pub fn is_hidden(&self) -> bool {
        self.flags().contains(GroupFlags::HIDDEN)
    }

    /// Set or clear the flattenable flag.
    pub fn set_flattenable(&self, flattenable: bool) {
        self.set_flag(GroupFlags::FLATTENABLE, flattenable);
    }

    /// Set or clear the preserve-child-order flag.
    pub fn set_preserve_child_order(&self, preserve: bool) {
        self.set_flag(GroupFlags::PRESERVE_CHILD_ORDER, preserve);
    }

    /// Set or clear the hidden flag.
    pub fn set_hidden(&self, hidden: bool) {
        self.set_flag(GroupFlags::HIDDEN, hidden);
    }

    fn set_flag(&self, flag: GroupFlags, value: bool) {
        self.state.write().flags.set(flag, value);
    }

    /// Tag the group with a category. Returns false if already present.
    pub fn add_category(&self, category: impl Into<String>) -> bool {
        self.state.write().categories.insert(category.into())
    }

    /// Remove a category tag. Returns whether it was present.
    pub fn remove_category(&self, category: &str) -> bool {
        self.state.write().categories.remove(category)
    }

    /// Snapshot of the group's category tags.
    pub fn categories(&self) -> BTreeSet<String> {
        self.state.read().categories.clone()
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// The current parent, if any.
    pub fn parent(&self) -> Option<Arc<GroupNode>> {
        self.state.read().parent.upgrade()
    }

    /// Snapshot of the current children.
    pub fn children(&self) -> Vec<Arc<GroupNode>> {
        self.state.read().children.clone()
    }

    /// Check whether `candidate` appears on this node's ancestor chain.
    ///
    /// A node is never its own ancestor.
    pub fn has_ancestor(&self, candidate: &Arc<GroupNode>) -> bool {
        let mut current = self.parent();
        while let Some(node) = current {
            if Arc::ptr_eq(&node, candidate) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Attach `child` under this group.
    ///
    /// Fails with [`StrataError::Cycle`] when `child` is this node or one
    /// of its ancestors (checked by walking the ancestor chain before
    /// insertion, O(depth)), and with [`StrataError::InvalidOperation`]
    /// when `child` is a root group or already attached elsewhere. On
    /// success a [`GroupEvent::ChildAdded`] notification fires on this
    /// node and propagates to every ancestor, after the write lock has
    /// been released.
    pub fn add_child(&self, child: &Arc<GroupNode>) -> StrataResult<()> {
        if std::ptr::eq(self, Arc::as_ptr(child)) {
            return Err(StrataError::Cycle {
                parent: self.id(),
                child: child.id(),
            });
        }
        if child.is_root {
            return Err(StrataError::invalid_operation(format!(
                "root group '{}' cannot be given a parent",
                child.id()
            )));
        }
        if self.has_ancestor(child) {
            return Err(StrataError::Cycle {
                parent: self.id(),
                child: child.id(),
            });
        }

        {
            let mut child_state = child.state.write();
            if child_state.parent.upgrade().is_some() {
                return Err(StrataError::invalid_operation(format!(
                    "group '{}' already has a parent; remove it first",
                    child_state.id
                )));
            }
            child_state.parent = self.weak_self.clone();
        }
        self.state.write().children.push(Arc::clone(child));

        tracing::debug!(parent = %self.id(), child = %child.id(), "child group attached");
        self.notify_upward(&GroupEvent::ChildAdded {
            parent_id: self.id(),
            child: Arc::clone(child),
        });
        Ok(())
    }

    /// Detach `child` from this group.
    ///
    /// When `keep_active` is false the removal notification instructs
    /// dependents to tear down the child's activation; when true the
    /// child's activation state is left untouched. Returns whether the
    /// child was present.
    pub fn remove_child(&self, child: &Arc<GroupNode>, keep_active: bool) -> bool {
        let removed = {
            let mut state = self.state.write();
            let before = state.children.len();
            state.children.retain(|c| !Arc::ptr_eq(c, child));
            state.children.len() != before
        };
        if !removed {
            return false;
        }
        child.state.write().parent = Weak::new();

        tracing::debug!(parent = %self.id(), child = %child.id(), keep_active, "child group detached");
        self.notify_upward(&GroupEvent::ChildRemoved {
            parent_id: self.id(),
            child: Arc::clone(child),
            keep_active,
        });
        true
    }

    // ------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------

    /// Associate a member layer with this group. Returns false if a
    /// member with the same layer id is already present.
    pub fn add_member(&self, member: MemberRef) -> bool {
        {
            let mut state = self.state.write();
            if state
                .members
                .iter()
                .any(|m| same_layer(m.as_ref(), member.as_ref()))
            {
                return false;
            }
            state.members.push(Arc::clone(&member));
        }
        self.notify_upward(&GroupEvent::MemberAdded {
            group_id: self.id(),
            member,
        });
        true
    }

    /// Dissociate a member layer.
    ///
    /// With `recursive` set, children are searched depth-first; if the
    /// removal empties a child group that also has no children of its
    /// own, that child group is removed too (cascading collapse).
    /// Returns whether a member was removed anywhere.
    pub fn remove_member(&self, member: &dyn Layer, recursive: bool) -> bool {
        let removed = {
            let mut state = self.state.write();
            let position = state
                .members
                .iter()
                .position(|m| same_layer(m.as_ref(), member));
            position.map(|index| state.members.remove(index))
        };
        if let Some(member) = removed {
            self.notify_upward(&GroupEvent::MemberRemoved {
                group_id: self.id(),
                member,
            });
            return true;
        }
        if !recursive {
            return false;
        }

        for child in self.children() {
            if child.remove_member(member, true) {
                if child.num_members(false) == 0 && child.children().is_empty() {
                    self.remove_child(&child, false);
                }
                return true;
            }
        }
        false
    }

    /// Snapshot of the group's direct members.
    pub fn members(&self) -> Vec<MemberRef> {
        self.state.read().members.clone()
    }

    /// Count members: direct only, or including every descendant.
    pub fn num_members(&self, recursive: bool) -> usize {
        let direct = self.state.read().members.len();
        if !recursive {
            return direct;
        }
        let mut total = direct;
        for child in self.children() {
            total += child.num_members(true);
        }
        total
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    /// Depth-first search over child groups.
    ///
    /// `stop_on_first` short-circuits within a level; descent into
    /// children still happens while nothing has been found yet, so a
    /// match is found whenever one exists, though not necessarily the
    /// shallowest one.
    pub fn find_children<F>(
        &self,
        predicate: F,
        recursive: bool,
        stop_on_first: bool,
    ) -> Vec<Arc<GroupNode>>
    where
        F: Fn(&Arc<GroupNode>) -> bool,
    {
        let mut found = Vec::new();
        self.find_children_into(&predicate, recursive, stop_on_first, &mut found);
        found
    }

    fn find_children_into<F>(
        &self,
        predicate: &F,
        recursive: bool,
        stop_on_first: bool,
        found: &mut Vec<Arc<GroupNode>>,
    ) where
        F: Fn(&Arc<GroupNode>) -> bool,
    {
        let children = self.children();
        for child in &children {
            if predicate(child) {
                found.push(Arc::clone(child));
                if stop_on_first {
                    break;
                }
            }
        }
        if recursive {
            for child in &children {
                if stop_on_first && !found.is_empty() {
                    break;
                }
                child.find_children_into(predicate, true, stop_on_first, found);
            }
        }
    }

    /// Depth-first search over member layers. Same traversal contract as
    /// [`find_children`](Self::find_children).
    pub fn find_members<F>(
        &self,
        predicate: F,
        recursive: bool,
        stop_on_first: bool,
    ) -> Vec<MemberRef>
    where
        F: Fn(&dyn Layer) -> bool,
    {
        let mut found = Vec::new();
        self.find_members_into(&predicate, recursive, stop_on_first, &mut found);
        found
    }

    fn find_members_into<F>(
        &self,
        predicate: &F,
        recursive: bool,
        stop_on_first: bool,
        found: &mut Vec<MemberRef>,
    ) where
        F: Fn(&dyn Layer) -> bool,
    {
        for member in self.members() {
            if predicate(member.as_ref()) {
                found.push(member);
                if stop_on_first {
                    break;
                }
            }
        }
        if recursive {
            for child in self.children() {
                if stop_on_first && !found.is_empty() {
                    break;
                }
                child.find_members_into(predicate, true, stop_on_first, found);
            }
        }
    }

    // ------------------------------------------------------------------
    // Display eligibility and listeners
    // ------------------------------------------------------------------

    /// Whether display building may collapse this group into a single
    /// leaf row: flattenable, childless, exactly one member.
    pub fn is_collapsible(&self) -> bool {
        let state = self.state.read();
        state.flags.contains(GroupFlags::FLATTENABLE)
            && state.children.is_empty()
            && state.members.len() == 1
    }

    /// Register a structural event listener on this node.
    ///
    /// The listener also observes events fired on descendants. It is
    /// held weakly: dropping the caller's `Arc` unsubscribes it.
    pub fn subscribe(&self, listener: &Arc<dyn GroupListener>) {
        self.listeners.subscribe(listener);
    }

    /// Deliver an event to this node's listeners and every ancestor's,
    /// synchronously on the calling thread. Callers must not hold any
    /// node lock.
    fn notify_upward(&self, event: &GroupEvent) {
        for listener in self.listeners.live() {
            listener.on_event(event);
        }
        let mut current = self.parent();
        while let Some(node) = current {
            for listener in node.listeners.live() {
                listener.on_event(event);
            }
            current = node.parent();
        }
    }
}

impl fmt::Debug for GroupNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("GroupNode")
            .field("id", &state.id)
            .field("display_name", &state.display_name)
            .field("is_root", &self.is_root)
            .field("children", &state.children.len())
            .field("members", &state.members.len())
            .field("flags", &state.flags)
            .finish()
    }
}
