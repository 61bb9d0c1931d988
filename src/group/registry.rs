//! Weak id → group lookup.
//!
//! The registry stores non-owning handles: an entry never keeps its
//! group alive. Entries whose target has been dropped are evicted lazily
//! during lookups and in bulk by [`KeyRegistry::cleanup`], which the
//! runtime schedules periodically.

use crate::group::node::GroupNode;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Id → group lookup table with weak targets.
///
/// A single mutex guards the whole map; operations are O(1) amortized
/// except [`cleanup`](Self::cleanup), which is O(n).
#[derive(Default)]
pub struct KeyRegistry {
    entries: Mutex<HashMap<String, Weak<GroupNode>>>,
}

impl KeyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a handle under `id`.
    ///
    /// An existing entry with the same id is silently replaced; callers
    /// must prevent duplicate ids upstream.
    pub fn set(&self, id: impl Into<String>, group: &Arc<GroupNode>) {
        self.entries
            .lock()
            .insert(id.into(), Arc::downgrade(group));
    }

    /// Resolve `id` to a live group.
    ///
    /// A stale entry (target dropped) is evicted and reported as not
    /// found.
    pub fn get(&self, id: &str) -> Option<Arc<GroupNode>> {
        let mut entries = self.entries.lock();
        match entries.get(id) {
            Some(weak) => match weak.upgrade() {
                Some(group) => Some(group),
                None => {
                    entries.remove(id);
                    None
                }
            },
            None => None,
        }
    }

    /// Batch lookup. Ids with no live target are evicted and omitted
    /// from the result.
    pub fn get_many<'a, I>(&self, ids: I) -> HashMap<String, Arc<GroupNode>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut entries = self.entries.lock();
        let mut resolved = HashMap::new();
        for id in ids {
            match entries.get(id).and_then(Weak::upgrade) {
                Some(group) => {
                    resolved.insert(id.to_string(), group);
                }
                None => {
                    entries.remove(id);
                }
            }
        }
        resolved
    }

    /// Atomically move the entry at `old_id` to `new_id`, preserving the
    /// same weak target and updating the node's own id to match.
    ///
    /// Returns false when `old_id` has no live entry; a stale entry is
    /// evicted. An existing entry at `new_id` is replaced.
    pub fn rekey(&self, old_id: &str, new_id: impl Into<String>) -> bool {
        let new_id = new_id.into();
        let mut entries = self.entries.lock();
        let Some(weak) = entries.remove(old_id) else {
            return false;
        };
        let Some(group) = weak.upgrade() else {
            return false;
        };
        group.set_id(new_id.clone());
        entries.insert(new_id, weak);
        true
    }

    /// Drop the entry for `id`. Returns whether an entry existed.
    pub fn remove(&self, id: &str) -> bool {
        self.entries.lock().remove(id).is_some()
    }

    /// Sweep out every entry whose target has been dropped.
    ///
    /// Returns how many entries were evicted. Intended to run
    /// periodically rather than relying solely on lazy eviction.
    pub fn cleanup(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, weak| weak.strong_count() > 0);
        before - entries.len()
    }

    /// Number of entries, live or stale.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let registry = KeyRegistry::new();
        let group = GroupNode::new("g1", "Group One");
        registry.set("g1", &group);
        let resolved = registry.get("g1").unwrap();
        assert!(Arc::ptr_eq(&resolved, &group));
    }

    #[test]
    fn silent_replace_on_duplicate_id() {
        let registry = KeyRegistry::new();
        let first = GroupNode::new("g1", "First");
        let second = GroupNode::new("g1", "Second");
        registry.set("g1", &first);
        registry.set("g1", &second);
        let resolved = registry.get("g1").unwrap();
        assert!(Arc::ptr_eq(&resolved, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn stale_entry_evicted_on_get() {
        let registry = KeyRegistry::new();
        {
            let group = GroupNode::new("g1", "Group One");
            registry.set("g1", &group);
        }
        assert!(registry.get("g1").is_none());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn cleanup_reports_evictions() {
        let registry = KeyRegistry::new();
        let keep = GroupNode::new("keep", "Keep");
        registry.set("keep", &keep);
        {
            let a = GroupNode::new("a", "A");
            let b = GroupNode::new("b", "B");
            registry.set("a", &a);
            registry.set("b", &b);
        }
        assert_eq!(registry.cleanup(), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("keep").is_some());
    }
}
