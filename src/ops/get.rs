//! Lookup operation — walks the trie level by level.

use crate::hash::HashWalker;
use crate::node::NodeKind;
use crate::store::{NodeId, NodeStore};

/// Searches for `key` below the branch node `root`, returning the handle of
/// the entry node that holds it.
///
/// The cached hash is compared before the key, so most misses cost no key
/// comparison at all.
pub fn find_node<K, V, S>(
    store: &S,
    root: NodeId,
    mut walker: HashWalker,
    key: &K,
) -> Option<NodeId>
where
    K: Eq,
    S: NodeStore<K, V>,
{
    let mut branch = *store.node(root).branch();
    loop {
        let slice = walker.slice();
        if !branch.is_taken(slice) {
            return None;
        }
        let child = store.slot(branch.base, branch.physical_index(slice));
        match &store.node(child).kind {
            NodeKind::Entry(entry) => {
                let found = entry.hash == walker.key_hash() && entry.key == *key;
                return found.then_some(child);
            }
            NodeKind::Branch(next) => {
                branch = *next;
                walker.advance();
            }
        }
    }
}
