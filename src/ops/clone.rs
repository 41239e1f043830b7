//! Deep copy of a subtree into another store, with an explicit work stack.

use smallvec::SmallVec;

use crate::node::{Branch, Entry, Node, NodeKind};
use crate::store::{NodeId, NodeStore, SlotId};

/// Deep-copies the tree under `src_root` into `dst`, returning the handle of
/// the new root branch node (parent `None`).
///
/// Returns `None` when `dst` runs out of memory. The destination then holds
/// a partial copy and should be dropped wholesale.
pub fn clone_tree<K, V, S, D>(src: &S, src_root: Branch, dst: &mut D) -> Option<NodeId>
where
    K: Clone,
    V: Clone,
    S: NodeStore<K, V>,
    D: NodeStore<K, V>,
{
    let root_branch = clone_branch(dst, src_root)?;
    let root = dst
        .alloc_node(Node {
            parent: None,
            kind: NodeKind::Branch(root_branch),
        })
        .ok()?;

    // Pairs of (source branch, destination branch node) still to fill.
    let mut stack: SmallVec<[(Branch, NodeId); 16]> = SmallVec::new();
    stack.push((src_root, root));
    while let Some((src_branch, dst_id)) = stack.pop() {
        let dst_base = dst.node(dst_id).branch().base;
        for physical in 0..src_branch.size() {
            let src_child = src.slot(src_branch.base, physical);
            let child = match &src.node(src_child).kind {
                NodeKind::Entry(entry) => {
                    let copy = Entry {
                        hash: entry.hash,
                        key: entry.key.clone(),
                        value: entry.value.clone(),
                    };
                    dst.alloc_node(Node {
                        parent: Some(dst_id),
                        kind: NodeKind::Entry(copy),
                    })
                    .ok()?
                }
                NodeKind::Branch(sub) => {
                    let copy = clone_branch(dst, *sub)?;
                    let id = dst
                        .alloc_node(Node {
                            parent: Some(dst_id),
                            kind: NodeKind::Branch(copy),
                        })
                        .ok()?;
                    stack.push((*sub, id));
                    id
                }
            };
            dst.set_slot(dst_base, physical, child);
        }
    }
    Some(root)
}

/// Allocates a same-shape branch header in `dst`: same bitmap and capacity,
/// fresh unfilled block.
fn clone_branch<K, V, D: NodeStore<K, V>>(dst: &mut D, src: Branch) -> Option<Branch> {
    let base = if src.capacity > 0 {
        dst.alloc_slots(src.capacity)?
    } else {
        SlotId::DANGLING
    };
    Some(Branch {
        bitmap: src.bitmap,
        capacity: src.capacity,
        base,
    })
}
