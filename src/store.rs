//! Storage abstraction: the allocator contract consumed by the trie.

use std::fmt;

use crate::node::Node;

/// Stable handle to a [`Node`] in a store.
///
/// Handles remain valid until the node is freed; in particular they survive
/// sibling shifts inside a branch's slot block, which is what keeps parent
/// back-references sound.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

/// Handle to the first slot of a child block in a store.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub(crate) u32);

impl SlotId {
    /// Placeholder for branches without a block (`capacity == 0`).
    ///
    /// Reading through it is a bug; the branch bitmap guards every access.
    pub const DANGLING: SlotId = SlotId(u32::MAX);
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotId({})", self.0)
    }
}

/// Node storage backend for a [`HamtMap`](crate::HamtMap).
///
/// This is the injected allocator of the container: nodes and child-slot
/// blocks are allocated through it and returned to it, and allocation failure
/// is observable (`Err`/`None`) rather than fatal. Capacities are counted in
/// slots, not bytes. The container assumes the store is exclusive to one map
/// instance.
///
/// Freeing a handle twice, or reading a freed handle, is a programmer error;
/// implementations are expected to panic.
pub trait NodeStore<K, V> {
    /// Allocates one node. On failure the node is handed back so the caller
    /// can restore state.
    fn alloc_node(&mut self, node: Node<K, V>) -> Result<NodeId, Node<K, V>>;

    /// Frees a node, returning its contents.
    fn free_node(&mut self, id: NodeId) -> Node<K, V>;

    /// Returns a reference to the node at `id`.
    fn node(&self, id: NodeId) -> &Node<K, V>;

    /// Returns a mutable reference to the node at `id`.
    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V>;

    /// Allocates a contiguous block of `capacity` child slots
    /// (`1 <= capacity <= 32`), returning the handle of the first one, or
    /// `None` when the store is exhausted.
    fn alloc_slots(&mut self, capacity: u32) -> Option<SlotId>;

    /// Returns a block of `capacity` slots to the store.
    fn free_slots(&mut self, base: SlotId, capacity: u32);

    /// Reads the child handle at `base + physical`.
    fn slot(&self, base: SlotId, physical: u32) -> NodeId;

    /// Writes the child handle at `base + physical`.
    fn set_slot(&mut self, base: SlotId, physical: u32, child: NodeId);

    /// Number of nodes currently allocated.
    fn live_nodes(&self) -> usize;

    /// Number of slots currently allocated (across all live blocks).
    fn live_slots(&self) -> usize;
}
