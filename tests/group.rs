//! Tests for the group graph: structure, members, search, listeners.

mod common;

use common::layer;
use parking_lot::Mutex;
use std::sync::Arc;
use strata::group::listener::{GroupEvent, GroupListener};
use strata::{GroupNode, StrataError};

// ============================================================================
// Structure Tests
// ============================================================================

#[test]
fn add_child_links_both_directions() {
    let parent = GroupNode::new_root("root", "Root");
    let child = GroupNode::new("child", "Child");

    parent.add_child(&child).unwrap();

    assert!(Arc::ptr_eq(&child.parent().unwrap(), &parent));
    let children = parent.children();
    assert_eq!(children.len(), 1);
    assert!(Arc::ptr_eq(&children[0], &child));
}

#[test]
fn no_node_is_its_own_ancestor() {
    let root = GroupNode::new_root("root", "Root");
    let mid = GroupNode::new("mid", "Mid");
    let leaf = GroupNode::new("leaf", "Leaf");
    root.add_child(&mid).unwrap();
    mid.add_child(&leaf).unwrap();

    for node in [&root, &mid, &leaf] {
        assert!(!node.has_ancestor(node));
    }
    assert!(leaf.has_ancestor(&root));
    assert!(leaf.has_ancestor(&mid));
    assert!(!root.has_ancestor(&leaf));
}

#[test]
fn self_child_is_a_cycle() {
    let node = GroupNode::new("n", "Node");
    let result = node.add_child(&node);
    assert!(matches!(result, Err(StrataError::Cycle { .. })));
    assert!(node.children().is_empty());
    assert!(node.parent().is_none());
}

#[test]
fn descendant_cycle_rejected_and_tree_unchanged() {
    let top = GroupNode::new("top", "Top");
    let mid = GroupNode::new("mid", "Mid");
    let bottom = GroupNode::new("bottom", "Bottom");
    top.add_child(&mid).unwrap();
    mid.add_child(&bottom).unwrap();

    // top is an ancestor of bottom: attaching it underneath must fail.
    let result = bottom.add_child(&top);
    assert!(matches!(result, Err(StrataError::Cycle { .. })));

    assert!(bottom.children().is_empty());
    assert!(top.parent().is_none());
    assert_eq!(top.children().len(), 1);
}

#[test]
fn root_never_acquires_a_parent() {
    let root = GroupNode::new_root("root", "Root");
    let other = GroupNode::new("other", "Other");
    let result = other.add_child(&root);
    assert!(matches!(result, Err(StrataError::InvalidOperation(_))));
    assert!(root.parent().is_none());
    assert!(other.children().is_empty());
}

#[test]
fn attached_child_cannot_be_attached_again() {
    let a = GroupNode::new("a", "A");
    let b = GroupNode::new("b", "B");
    let child = GroupNode::new("c", "C");
    a.add_child(&child).unwrap();

    assert!(a.add_child(&child).is_err());
    assert!(b.add_child(&child).is_err());
    assert_eq!(a.children().len(), 1);
}

#[test]
fn remove_child_detaches() {
    let parent = GroupNode::new("p", "P");
    let child = GroupNode::new("c", "C");
    parent.add_child(&child).unwrap();

    assert!(parent.remove_child(&child, true));
    assert!(child.parent().is_none());
    assert!(parent.children().is_empty());
}

#[test]
fn remove_child_returns_false_when_absent() {
    let parent = GroupNode::new("p", "P");
    let stranger = GroupNode::new("s", "S");
    assert!(!parent.remove_child(&stranger, false));
}

#[test]
fn detached_child_can_be_reattached() {
    let a = GroupNode::new("a", "A");
    let b = GroupNode::new("b", "B");
    let child = GroupNode::new("c", "C");
    a.add_child(&child).unwrap();
    assert!(a.remove_child(&child, true));
    b.add_child(&child).unwrap();
    assert!(Arc::ptr_eq(&child.parent().unwrap(), &b));
}

// ============================================================================
// Member Tests
// ============================================================================

#[test]
fn member_counts_sum_over_descendants() {
    let root = GroupNode::new_root("root", "Root");
    let left = GroupNode::new("left", "Left");
    let right = GroupNode::new("right", "Right");
    let deep = GroupNode::new("deep", "Deep");
    root.add_child(&left).unwrap();
    root.add_child(&right).unwrap();
    right.add_child(&deep).unwrap();

    root.add_member(layer("l0", "L0"));
    left.add_member(layer("l1", "L1"));
    left.add_member(layer("l2", "L2"));
    right.add_member(layer("l3", "L3"));
    deep.add_member(layer("l4", "L4"));
    deep.add_member(layer("l5", "L5"));

    // The recursive count must be a true sum over the node and every
    // descendant, not the count of whichever child was visited last.
    let expected: usize = [&root, &left, &right, &deep]
        .iter()
        .map(|n| n.num_members(false))
        .sum();
    assert_eq!(root.num_members(true), expected);
    assert_eq!(root.num_members(true), 6);
    assert_eq!(right.num_members(true), 3);
    assert_eq!(root.num_members(false), 1);
}

#[test]
fn remove_member_direct() {
    let group = GroupNode::new("g", "G");
    let member = layer("l1", "L1");
    group.add_member(Arc::clone(&member));

    assert!(group.remove_member(member.as_ref(), false));
    assert_eq!(group.num_members(false), 0);
    assert!(!group.remove_member(member.as_ref(), false));
}

#[test]
fn recursive_removal_cascades_empty_groups() {
    let root = GroupNode::new_root("root", "Root");
    let holder = GroupNode::new("holder", "Holder");
    root.add_child(&holder).unwrap();
    let member = layer("only", "Only Layer");
    holder.add_member(Arc::clone(&member));

    assert!(root.remove_member(member.as_ref(), true));

    // Removing the only member of a childless child group removes the
    // group itself.
    assert!(root.children().is_empty());
    assert!(holder.parent().is_none());
}

#[test]
fn recursive_removal_keeps_groups_with_children() {
    let root = GroupNode::new_root("root", "Root");
    let holder = GroupNode::new("holder", "Holder");
    let sub = GroupNode::new("sub", "Sub");
    root.add_child(&holder).unwrap();
    holder.add_child(&sub).unwrap();
    let member = layer("only", "Only Layer");
    holder.add_member(Arc::clone(&member));

    assert!(root.remove_member(member.as_ref(), true));
    assert_eq!(root.children().len(), 1);
    assert_eq!(holder.num_members(false), 0);
}

#[test]
fn non_recursive_removal_ignores_children() {
    let root = GroupNode::new_root("root", "Root");
    let child = GroupNode::new("child", "Child");
    root.add_child(&child).unwrap();
    let member = layer("l", "L");
    child.add_member(Arc::clone(&member));

    assert!(!root.remove_member(member.as_ref(), false));
    assert_eq!(child.num_members(false), 1);
}

// ============================================================================
// Search Tests
// ============================================================================

fn sample_tree() -> Arc<GroupNode> {
    let root = GroupNode::new_root("root", "Root");
    let imagery = GroupNode::new("imagery", "Imagery");
    let terrain = GroupNode::new("terrain", "Terrain");
    let nested = GroupNode::new("nested", "Nested Imagery");
    root.add_child(&imagery).unwrap();
    root.add_child(&terrain).unwrap();
    terrain.add_child(&nested).unwrap();

    imagery.add_member(layer("osm", "OpenStreetMap"));
    nested.add_member(layer("hillshade", "Hillshade"));
    root
}

#[test]
fn find_children_recursive() {
    let root = sample_tree();
    let found = root.find_children(
        |g| g.display_name().contains("Imagery"),
        true,
        false,
    );
    assert_eq!(found.len(), 2);
}

#[test]
fn find_children_non_recursive_sees_only_direct() {
    let root = sample_tree();
    let found = root.find_children(
        |g| g.display_name().contains("Imagery"),
        false,
        false,
    );
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), "imagery");
}

#[test]
fn find_children_stop_on_first_finds_a_match() {
    let root = sample_tree();
    let found = root.find_children(|g| g.num_members(false) > 0, true, true);
    assert_eq!(found.len(), 1);
}

#[test]
fn find_children_no_match_is_empty() {
    let root = sample_tree();
    let found = root.find_children(|g| g.id() == "missing", true, true);
    assert!(found.is_empty());
}

#[test]
fn find_members_recursive() {
    let root = sample_tree();
    let found = root.find_members(|l| l.kind() == "raster", true, false);
    assert_eq!(found.len(), 2);
}

#[test]
fn find_members_stop_on_first_descends_until_found() {
    let root = sample_tree();
    // No direct members on root: the search must still find one below.
    let found = root.find_members(|l| l.id() == "hillshade", true, true);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].display_name(), "Hillshade");
}

// ============================================================================
// Listener Tests
// ============================================================================

#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl EventLog {
    fn entries(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl GroupListener for EventLog {
    fn on_event(&self, event: &GroupEvent) {
        let entry = match event {
            GroupEvent::ChildAdded { parent_id, child } => {
                format!("child-added {parent_id} {}", child.id())
            }
            GroupEvent::ChildRemoved {
                parent_id,
                child,
                keep_active,
            } => format!("child-removed {parent_id} {} {keep_active}", child.id()),
            GroupEvent::MemberAdded { group_id, member } => {
                format!("member-added {group_id} {}", member.id())
            }
            GroupEvent::MemberRemoved { group_id, member } => {
                format!("member-removed {group_id} {}", member.id())
            }
        };
        self.events.lock().push(entry);
    }
}

#[test]
fn child_added_propagates_to_ancestors() {
    let root = GroupNode::new_root("root", "Root");
    let mid = GroupNode::new("mid", "Mid");
    root.add_child(&mid).unwrap();

    let log = Arc::new(EventLog::default());
    let listener: Arc<dyn GroupListener> = log.clone();
    root.subscribe(&listener);

    let leaf = GroupNode::new("leaf", "Leaf");
    mid.add_child(&leaf).unwrap();

    // The root listener sees the addition two levels below it.
    assert_eq!(log.entries(), vec!["child-added mid leaf".to_string()]);
}

#[test]
fn removal_signal_carries_teardown_flag() {
    let root = GroupNode::new_root("root", "Root");
    let child = GroupNode::new("child", "Child");
    root.add_child(&child).unwrap();

    let log = Arc::new(EventLog::default());
    let listener: Arc<dyn GroupListener> = log.clone();
    root.subscribe(&listener);

    root.remove_child(&child, false);
    assert_eq!(
        log.entries(),
        vec!["child-removed root child false".to_string()]
    );
}

#[test]
fn dropped_listener_stops_observing() {
    let root = GroupNode::new_root("root", "Root");
    {
        let log = Arc::new(EventLog::default());
        let listener: Arc<dyn GroupListener> = log.clone();
        root.subscribe(&listener);
    }
    // The listener is gone; notification must not panic or leak.
    let child = GroupNode::new("child", "Child");
    root.add_child(&child).unwrap();
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[test]
fn independent_subtrees_mutate_concurrently() {
    let root = GroupNode::new_root("root", "Root");
    let left = GroupNode::new("left", "Left");
    let right = GroupNode::new("right", "Right");
    root.add_child(&left).unwrap();
    root.add_child(&right).unwrap();

    let l = Arc::clone(&left);
    let r = Arc::clone(&right);
    let t1 = std::thread::spawn(move || {
        for i in 0..100 {
            l.add_member(layer(&format!("l{i}"), "L"));
        }
    });
    let t2 = std::thread::spawn(move || {
        for i in 0..100 {
            r.add_member(layer(&format!("r{i}"), "R"));
        }
    });
    t1.join().unwrap();
    t2.join().unwrap();

    assert_eq!(root.num_members(true), 200);
}

#[test]
fn snapshots_are_stable_under_mutation() {
    let group = GroupNode::new("g", "G");
    group.add_member(layer("a", "A"));
    let snapshot = group.members();
    group.add_member(layer("b", "B"));
    assert_eq!(snapshot.len(), 1);
    assert_eq!(group.members().len(), 2);
}
