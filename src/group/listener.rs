//! Structural event listeners.
//!
//! Listeners observe child and member mutations on a group. Events fired
//! on a node also propagate to every ancestor, so a listener registered
//! at a root sees additions anywhere below it. Listeners are held via
//! `Weak` references and never keep a subtree alive; dead entries are
//! pruned during notification.

use crate::group::member::MemberRef;
use crate::group::node::GroupNode;
use std::sync::{Arc, Weak};

/// A structural mutation observed on a group.
#[derive(Debug, Clone)]
pub enum GroupEvent {
    /// A child group was attached.
    ChildAdded {
        /// Id of the group the child was attached to.
        parent_id: String,
        /// The attached child.
        child: Arc<GroupNode>,
    },

    /// A child group was detached.
    ChildRemoved {
        /// Id of the group the child was detached from.
        parent_id: String,
        /// The detached child.
        child: Arc<GroupNode>,
        /// When false, dependents should tear down the child's
        /// activation; when true, activation state is left untouched.
        keep_active: bool,
    },

    /// A member layer was associated with a group.
    MemberAdded {
        /// Id of the group gaining the member.
        group_id: String,
        /// The associated layer handle.
        member: MemberRef,
    },

    /// A member layer was dissociated from a group.
    MemberRemoved {
        /// Id of the group losing the member.
        group_id: String,
        /// The dissociated layer handle.
        member: MemberRef,
    },
}

impl GroupEvent {
    /// Id of the group the event fired on.
    pub fn group_id(&self) -> &str {
        match self {
            Self::ChildAdded { parent_id, .. } | Self::ChildRemoved { parent_id, .. } => parent_id,
            Self::MemberAdded { group_id, .. } | Self::MemberRemoved { group_id, .. } => group_id,
        }
    }
}

/// Observer of structural mutations.
///
/// Called synchronously on the mutating thread, after the node's write
/// lock has been released. Implementations must not assume they run on
/// any particular thread.
pub trait GroupListener: Send + Sync {
    /// Handle a structural event on the node or one of its descendants.
    fn on_event(&self, event: &GroupEvent);
}

/// Weakly-held listener list attached to one node.
#[derive(Default)]
pub(crate) struct ListenerSet {
    entries: parking_lot::Mutex<Vec<Weak<dyn GroupListener>>>,
}

impl ListenerSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a listener. The caller keeps the strong reference; the
    /// registration dies with it.
    pub(crate) fn subscribe(&self, listener: &Arc<dyn GroupListener>) {
        self.entries.lock().push(Arc::downgrade(listener));
    }

    /// Upgrade live listeners and prune dead entries.
    ///
    /// Returns the strong handles so callers can invoke them without
    /// holding the list lock.
    pub(crate) fn live(&self) -> Vec<Arc<dyn GroupListener>> {
        let mut entries = self.entries.lock();
        let mut live = Vec::with_capacity(entries.len());
        entries.retain(|weak| match weak.upgrade() {
            Some(strong) => {
                live.push(strong);
                true
            }
            None => false,
        });
        live
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
