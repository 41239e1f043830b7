//! Subtree teardown with an explicit work stack.

use smallvec::SmallVec;

use crate::node::{Branch, NodeKind};
use crate::store::NodeStore;

/// Frees every node below `root` and every slot block, `root`'s included.
///
/// Depth never touches the host call stack; the work stack holds at most one
/// branch per level encountered so far. The caller owns the branch value and
/// resets whatever node held it.
pub fn free_subtree<K, V, S: NodeStore<K, V>>(store: &mut S, root: Branch) {
    let mut stack: SmallVec<[Branch; 16]> = SmallVec::new();
    stack.push(root);
    while let Some(branch) = stack.pop() {
        for physical in 0..branch.size() {
            let child = store.slot(branch.base, physical);
            if let NodeKind::Branch(sub) = store.free_node(child).kind {
                stack.push(sub);
            }
        }
        if branch.capacity > 0 {
            store.free_slots(branch.base, branch.capacity);
        }
    }
}
