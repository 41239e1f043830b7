//! Insertion — direct placement, in-place overwrite, or entry splitting.

use smallvec::SmallVec;

use crate::capacity::allocation_size;
use crate::error::InsertError;
use crate::hash::HashWalker;
use crate::node::{self, Branch, Entry, Node, NodeKind};
use crate::store::{NodeId, NodeStore, SlotId};

/// Initial capacity of every branch created by a split.
const SPLIT_CAPACITY: u32 = 2;

/// Inserts `entry` into the subtree below the branch node `branch_id`.
///
/// Returns the previous value when an existing key was overwritten in
/// place, `None` when the key is new. `expected_entries` is the map size
/// after this insertion; it feeds the capacity oracle when a slot block has
/// to grow.
pub fn insert_recursive<K, V, S>(
    store: &mut S,
    branch_id: NodeId,
    entry: Entry<K, V>,
    mut walker: HashWalker,
    level: u32,
    expected_entries: usize,
) -> Result<Option<V>, InsertError>
where
    K: Eq,
    S: NodeStore<K, V>,
{
    let branch = *store.node(branch_id).branch();
    let slice = walker.slice();

    if !branch.is_taken(slice) {
        place_entry(store, branch_id, slice, entry, expected_entries, level)?;
        return Ok(None);
    }

    let child = store.slot(branch.base, branch.physical_index(slice));
    if store.node(child).is_branch() {
        walker.advance();
        return insert_recursive(store, child, entry, walker, level + 1, expected_entries);
    }

    let same_key = {
        let existing = store.node(child).entry();
        existing.hash == entry.hash && existing.key == entry.key
    };
    if same_key {
        let slot = &mut store.node_mut(child).entry_mut().value;
        return Ok(Some(std::mem::replace(slot, entry.value)));
    }

    split(store, child, entry, walker)?;
    Ok(None)
}

/// Installs `entry` at the logically empty position `slice` of the branch
/// node `branch_id`, growing the slot block when it is full.
fn place_entry<K, V, S>(
    store: &mut S,
    branch_id: NodeId,
    slice: u32,
    entry: Entry<K, V>,
    expected_entries: usize,
    level: u32,
) -> Result<(), InsertError>
where
    S: NodeStore<K, V>,
{
    let branch = *store.node(branch_id).branch();
    debug_assert!(!branch.is_taken(slice), "logical position should be empty");
    let size = branch.size();
    let physical = branch.physical_index(slice);

    let id = store
        .alloc_node(Node {
            parent: Some(branch_id),
            kind: NodeKind::Entry(entry),
        })
        .map_err(|_| InsertError::AllocationFailed)?;

    let required = size + 1;
    let (base, capacity) = if required > branch.capacity {
        let capacity = allocation_size(required, expected_entries, level);
        debug_assert!(capacity >= required);
        let Some(base) = store.alloc_slots(capacity) else {
            store.free_node(id);
            return Err(InsertError::AllocationFailed);
        };
        // Repack around the gap at `physical`, then retire the old block.
        for j in 0..physical {
            let moved = store.slot(branch.base, j);
            store.set_slot(base, j, moved);
        }
        for j in physical..size {
            let moved = store.slot(branch.base, j);
            store.set_slot(base, j + 1, moved);
        }
        if branch.capacity > 0 {
            store.free_slots(branch.base, branch.capacity);
        }
        (base, capacity)
    } else {
        // Shift the tail one slot right in place.
        let mut j = size;
        while j > physical {
            let moved = store.slot(branch.base, j - 1);
            store.set_slot(branch.base, j, moved);
            j -= 1;
        }
        (branch.base, branch.capacity)
    };

    store.set_slot(base, physical, id);
    let branch = store.node_mut(branch_id).branch_mut();
    branch.base = base;
    branch.capacity = capacity;
    branch.bitmap |= node::mask(slice);
    Ok(())
}

/// Replaces the entry node `entry_id` with a branch subtree holding both the
/// displaced entry and `new_entry`, placed at the first level where their
/// slice streams separate.
///
/// `walker` is the new key's walker positioned at `entry_id`'s own slot.
/// Every fallible allocation happens before the tree is touched; on failure
/// everything grabbed so far is handed back and the displaced entry stays
/// where it was.
fn split<K, V, S>(
    store: &mut S,
    entry_id: NodeId,
    new_entry: Entry<K, V>,
    walker: HashWalker,
) -> Result<(), InsertError>
where
    S: NodeStore<K, V>,
{
    let mut new_walker = walker;
    let mut old_walker = walker.fork(store.node(entry_id).entry().hash);
    if new_walker.collides_forever(&old_walker) {
        return Err(InsertError::UnresolvableCollision);
    }
    new_walker.advance();
    old_walker.advance();

    // Slices shared below the split point; each costs one single-child
    // branch. Bounded by one reseed round.
    let mut shared: SmallVec<[u32; 8]> = SmallVec::new();
    while new_walker.slice() == old_walker.slice() {
        shared.push(new_walker.slice());
        new_walker.advance();
        old_walker.advance();
    }
    let tail_bitmap = node::mask(old_walker.slice()) | node::mask(new_walker.slice());

    // One block per chain level, the two-entry tail included.
    let mut blocks: SmallVec<[SlotId; 8]> = SmallVec::new();
    for _ in 0..=shared.len() {
        match store.alloc_slots(SPLIT_CAPACITY) {
            Some(base) => blocks.push(base),
            None => {
                release(store, &blocks, &[]);
                return Err(InsertError::AllocationFailed);
            }
        }
    }

    // Intermediate single-child branch nodes, outermost first. The bitmap of
    // each guards the next shared slice; the last guards the two leaves.
    let mut chain: SmallVec<[NodeId; 8]> = SmallVec::new();
    for depth in 0..shared.len() {
        let bitmap = match shared.get(depth + 1) {
            Some(&next) => node::mask(next),
            None => tail_bitmap,
        };
        let parent = *chain.last().unwrap_or(&entry_id);
        let branch = Branch {
            bitmap,
            capacity: SPLIT_CAPACITY,
            base: blocks[depth + 1],
        };
        match store.alloc_node(Node {
            parent: Some(parent),
            kind: NodeKind::Branch(branch),
        }) {
            Ok(id) => chain.push(id),
            Err(_) => {
                release(store, &blocks, &chain);
                return Err(InsertError::AllocationFailed);
            }
        }
    }
    let tail = *chain.last().unwrap_or(&entry_id);

    let new_id = match store.alloc_node(Node {
        parent: Some(tail),
        kind: NodeKind::Entry(new_entry),
    }) {
        Ok(id) => id,
        Err(_) => {
            release(store, &blocks, &chain);
            return Err(InsertError::AllocationFailed);
        }
    };

    // Take the displaced entry out. The one allocation left hands the node
    // back on failure, so the entry can be restored verbatim.
    let head_bitmap = match shared.first() {
        Some(&first) => node::mask(first),
        None => tail_bitmap,
    };
    let head = Branch {
        bitmap: head_bitmap,
        capacity: SPLIT_CAPACITY,
        base: blocks[0],
    };
    let displaced = std::mem::replace(&mut store.node_mut(entry_id).kind, NodeKind::Branch(head));
    let old_id = match store.alloc_node(Node {
        parent: Some(tail),
        kind: displaced,
    }) {
        Ok(id) => id,
        Err(node) => {
            store.node_mut(entry_id).kind = node.kind;
            store.free_node(new_id);
            release(store, &blocks, &chain);
            return Err(InsertError::AllocationFailed);
        }
    };

    // Wire the chain, then the two leaves in packed order.
    for (depth, &id) in chain.iter().enumerate() {
        store.set_slot(blocks[depth], 0, id);
    }
    let tail_base = blocks[shared.len()];
    let (first, second) = if old_walker.slice() < new_walker.slice() {
        (old_id, new_id)
    } else {
        (new_id, old_id)
    };
    store.set_slot(tail_base, 0, first);
    store.set_slot(tail_base, 1, second);

    Ok(())
}

/// Returns blocks and nodes grabbed by an abandoned split.
fn release<K, V, S: NodeStore<K, V>>(store: &mut S, blocks: &[SlotId], nodes: &[NodeId]) {
    for &id in nodes {
        store.free_node(id);
    }
    for &base in blocks {
        store.free_slots(base, SPLIT_CAPACITY);
    }
}
