//! Test support: controllable hashers, a quota-limited store, and tree
//! checkers mirroring the container invariants.

use std::collections::VecDeque;
use std::hash::{BuildHasher, Hash, Hasher};

use crate::node::{Node, NodeKind};
use crate::store::{NodeId, NodeStore, SlotId};
use crate::{HamtMap, NodeArena};


// ---------------------------------------------------------------------------
// Hashers
// ---------------------------------------------------------------------------

/// Hashes an integer key to itself.
#[derive(Clone, Copy, Default)]
pub(crate) struct Identity;

pub(crate) struct IdentityHasher(u64);

impl BuildHasher for Identity {
    type Hasher = IdentityHasher;

    fn build_hasher(&self) -> IdentityHasher {
        IdentityHasher(0)
    }
}

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 << 8) | u64::from(b);
        }
    }

    fn write_u32(&mut self, n: u32) {
        self.0 = u64::from(n);
    }

    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }

    fn write_i64(&mut self, n: i64) {
        self.0 = n as u64;
    }

    fn write_usize(&mut self, n: usize) {
        self.0 = n as u64;
    }
}

/// Hashes every key to the same value.
#[derive(Clone, Copy)]
pub(crate) struct Constant(pub u64);

pub(crate) struct ConstantHasher(u64);

impl BuildHasher for Constant {
    type Hasher = ConstantHasher;

    fn build_hasher(&self) -> ConstantHasher {
        ConstantHasher(self.0)
    }
}

impl Hasher for ConstantHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, _bytes: &[u8]) {}
}

/// Adversarial hash: `(key % 1024) * 0x3f3f3f3f`, so at most 1024 distinct
/// hash values exist.
#[derive(Clone, Copy, Default)]
pub(crate) struct Residue;

pub(crate) struct ResidueHasher(u64);

impl BuildHasher for Residue {
    type Hasher = ResidueHasher;

    fn build_hasher(&self) -> ResidueHasher {
        ResidueHasher(0)
    }
}

impl Hasher for ResidueHasher {
    fn finish(&self) -> u64 {
        (self.0 % 1024).wrapping_mul(0x3f3f_3f3f)
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 << 8) | u64::from(b);
        }
    }

    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }
}

/// A key with a forced hash value, for steering keys into collisions.
/// Equality is on `id`, so same-hash keys can still be distinct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CollidingKey {
    pub id: u32,
    pub forced_hash: u64,
}

impl CollidingKey {
    pub(crate) const fn new(id: u32, forced_hash: u64) -> Self {
        Self { id, forced_hash }
    }
}

impl Hash for CollidingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.forced_hash);
    }
}

// ---------------------------------------------------------------------------
// Quota-limited store
// ---------------------------------------------------------------------------

/// Arena wrapper with total allocation budgets (not replenished by frees),
/// for driving allocation-failure paths.
pub(crate) struct QuotaStore<K, V> {
    inner: NodeArena<K, V>,
    node_budget: usize,
    slot_budget: usize,
}

impl<K, V> QuotaStore<K, V> {
    pub(crate) fn new(node_budget: usize, slot_budget: usize) -> Self {
        Self {
            inner: NodeArena::new(),
            node_budget,
            slot_budget,
        }
    }
}

impl<K, V> NodeStore<K, V> for QuotaStore<K, V> {
    fn alloc_node(&mut self, node: Node<K, V>) -> Result<NodeId, Node<K, V>> {
        if self.node_budget == 0 {
            return Err(node);
        }
        self.node_budget -= 1;
        self.inner.alloc_node(node)
    }

    fn free_node(&mut self, id: NodeId) -> Node<K, V> {
        self.inner.free_node(id)
    }

    fn node(&self, id: NodeId) -> &Node<K, V> {
        self.inner.node(id)
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        self.inner.node_mut(id)
    }

    fn alloc_slots(&mut self, capacity: u32) -> Option<SlotId> {
        if self.slot_budget < capacity as usize {
            return None;
        }
        self.slot_budget -= capacity as usize;
        self.inner.alloc_slots(capacity)
    }

    fn free_slots(&mut self, base: SlotId, capacity: u32) {
        self.inner.free_slots(base, capacity);
    }

    fn slot(&self, base: SlotId, physical: u32) -> NodeId {
        self.inner.slot(base, physical)
    }

    fn set_slot(&mut self, base: SlotId, physical: u32, child: NodeId) {
        self.inner.set_slot(base, physical, child);
    }

    fn live_nodes(&self) -> usize {
        self.inner.live_nodes()
    }

    fn live_slots(&self) -> usize {
        self.inner.live_slots()
    }
}

// ---------------------------------------------------------------------------
// Structural checks
// ---------------------------------------------------------------------------

/// Walks the whole tree checking the branch invariants, the parent
/// back-references, and that the reachable entry count matches `len()`.
pub(crate) fn check_tree<K, V, H, S: NodeStore<K, V>>(map: &HamtMap<K, V, H, S>) {
    let store = map.allocator();
    let root = map.root_id();
    assert!(store.node(root).parent.is_none(), "root must have no parent");
    assert!(store.node(root).is_branch(), "root must be a branch");

    let mut queue = VecDeque::from([root]);
    let mut entries = 0_usize;
    while let Some(id) = queue.pop_front() {
        match &store.node(id).kind {
            NodeKind::Entry(_) => entries += 1,
            NodeKind::Branch(branch) => {
                assert!(branch.size() <= branch.capacity, "overfull branch");
                assert!(branch.capacity <= 32);
                if id != root {
                    assert!(branch.size() > 0, "empty non-root branch");
                }
                for physical in 0..branch.size() {
                    let child = store.slot(branch.base, physical);
                    assert_eq!(
                        store.node(child).parent,
                        Some(id),
                        "child parent link broken"
                    );
                    queue.push_back(child);
                }
            }
        }
    }
    assert_eq!(entries, map.len(), "reachable entries vs len()");
}

/// From every reachable entry, follows parent links and asserts the root is
/// reached. Returns the longest walk (in hops).
pub(crate) fn longest_parent_walk<K, V, H, S: NodeStore<K, V>>(
    map: &HamtMap<K, V, H, S>,
) -> usize {
    let store = map.allocator();
    let root = map.root_id();

    let mut queue = VecDeque::from([root]);
    let mut longest = 0;
    while let Some(id) = queue.pop_front() {
        match &store.node(id).kind {
            NodeKind::Entry(_) => {
                let mut hops = 0;
                let mut current = id;
                while let Some(parent) = store.node(current).parent {
                    current = parent;
                    hops += 1;
                    assert!(hops <= 64, "parent walk did not terminate");
                }
                assert_eq!(current, root, "parent walk must end at the root");
                longest = longest.max(hops);
            }
            NodeKind::Branch(branch) => {
                for physical in 0..branch.size() {
                    queue.push_back(store.slot(branch.base, physical));
                }
            }
        }
    }
    longest
}
