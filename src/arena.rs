//! Default storage backend: a slab of nodes plus free-listed slot blocks.

use crate::node::{Node, FANOUT};
use crate::store::{NodeId, NodeStore, SlotId};

/// Placeholder written into freshly allocated or vacated slots.
const VACANT: NodeId = NodeId(u32::MAX);

/// Free-list arena implementing [`NodeStore`].
///
/// Nodes live in a slab with a free list, so a [`NodeId`] stays valid until
/// the node is freed. Child blocks live in a second slab with one free list
/// per capacity: freeing a block of width `c` makes it available to the next
/// allocation of width `c`, which matches the grow-only capacity sequence of
/// the trie (blocks of a given width are recycled, never split).
pub struct NodeArena<K, V> {
    nodes: Vec<Option<Node<K, V>>>,
    free_nodes: Vec<u32>,
    slots: Vec<NodeId>,
    free_blocks: [Vec<u32>; (FANOUT + 1) as usize],
    live_nodes: usize,
    live_slots: usize,
}

impl<K, V> NodeArena<K, V> {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free_nodes: Vec::new(),
            slots: Vec::new(),
            free_blocks: std::array::from_fn(|_| Vec::new()),
            live_nodes: 0,
            live_slots: 0,
        }
    }
}

impl<K, V> Default for NodeArena<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> NodeStore<K, V> for NodeArena<K, V> {
    fn alloc_node(&mut self, node: Node<K, V>) -> Result<NodeId, Node<K, V>> {
        let index = match self.free_nodes.pop() {
            Some(index) => {
                debug_assert!(self.nodes[index as usize].is_none());
                index
            }
            None => {
                // Reserve u32::MAX as unrepresentable.
                let Ok(index) = u32::try_from(self.nodes.len()) else {
                    return Err(node);
                };
                if index == u32::MAX {
                    return Err(node);
                }
                self.nodes.push(None);
                index
            }
        };
        self.nodes[index as usize] = Some(node);
        self.live_nodes += 1;
        Ok(NodeId(index))
    }

    fn free_node(&mut self, id: NodeId) -> Node<K, V> {
        let node = self.nodes[id.0 as usize]
            .take()
            .expect("node already freed");
        self.free_nodes.push(id.0);
        self.live_nodes -= 1;
        node
    }

    fn node(&self, id: NodeId) -> &Node<K, V> {
        self.nodes[id.0 as usize].as_ref().expect("node freed")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        self.nodes[id.0 as usize].as_mut().expect("node freed")
    }

    fn alloc_slots(&mut self, capacity: u32) -> Option<SlotId> {
        debug_assert!(capacity >= 1 && capacity <= FANOUT);
        let base = match self.free_blocks[capacity as usize].pop() {
            Some(base) => base,
            None => {
                let base = u32::try_from(self.slots.len()).ok()?;
                // Keep every slot index below the DANGLING sentinel.
                let end = base.checked_add(capacity)?;
                if end >= u32::MAX {
                    return None;
                }
                self.slots
                    .extend(std::iter::repeat(VACANT).take(capacity as usize));
                base
            }
        };
        self.live_slots += capacity as usize;
        Some(SlotId(base))
    }

    fn free_slots(&mut self, base: SlotId, capacity: u32) {
        debug_assert!(capacity >= 1 && capacity <= FANOUT);
        debug_assert!((base.0 + capacity) as usize <= self.slots.len());
        for offset in 0..capacity {
            self.slots[(base.0 + offset) as usize] = VACANT;
        }
        self.free_blocks[capacity as usize].push(base.0);
        self.live_slots -= capacity as usize;
    }

    fn slot(&self, base: SlotId, physical: u32) -> NodeId {
        let id = self.slots[(base.0 + physical) as usize];
        debug_assert!(id != VACANT, "read of vacant slot");
        id
    }

    fn set_slot(&mut self, base: SlotId, physical: u32, child: NodeId) {
        self.slots[(base.0 + physical) as usize] = child;
    }

    fn live_nodes(&self) -> usize {
        self.live_nodes
    }

    fn live_slots(&self) -> usize {
        self.live_slots
    }
}
