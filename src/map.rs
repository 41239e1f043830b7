//! The mutable HAMT container.

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::mem;
use std::ops;

use crate::arena::NodeArena;
use crate::capacity::allocation_size;
use crate::error::InsertError;
use crate::hash::{self, HashWalker};
use crate::iter::Iter;
use crate::node::{Branch, Entry, Node, NodeKind};
use crate::ops::clone::clone_tree;
use crate::ops::free::free_subtree;
use crate::ops::get::find_node;
use crate::ops::insert::insert_recursive;
use crate::store::{NodeId, NodeStore};

/// Hash array mapped trie mapping keys to values.
///
/// Keys are routed by successive 5-bit slices of their seeded 32-bit hash;
/// branches compress their up-to-32 children behind a bitmap, so sparse
/// trees stay compact while lookups and inserts remain near-constant.
///
/// The hasher (`H`) and the node store (`S`, the allocator) are injected;
/// the defaults are [`ahash::RandomState`] and the free-list [`NodeArena`].
/// A single instance is strictly sequential: share it read-only or not at
/// all.
pub struct HamtMap<K, V, H = ahash::RandomState, S = NodeArena<K, V>> {
    store: S,
    root: NodeId,
    seed: u32,
    count: usize,
    hash_builder: H,
    marker: PhantomData<(K, V)>,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl<K, V> HamtMap<K, V> {
    /// Creates an empty map with the per-process hash seed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    /// Creates an empty map expecting roughly `capacity` entries.
    ///
    /// The hint feeds the capacity oracle when sizing the root.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_parts(
            capacity,
            hash::process_seed(),
            ahash::RandomState::default(),
            NodeArena::new(),
        )
    }

    /// Creates an empty map with an explicit hash seed.
    ///
    /// Fixing the seed fixes the trie layout for a given hasher; meant for
    /// tests and reproducible tooling, not production use.
    #[must_use]
    pub fn with_seed(seed: u32) -> Self {
        Self::with_parts(1, seed, ahash::RandomState::default(), NodeArena::new())
    }
}

impl<K, V, H> HamtMap<K, V, H> {
    /// Creates an empty map with the given hasher.
    #[must_use]
    pub fn with_hasher(hash_builder: H) -> Self {
        Self::with_capacity_and_hasher(1, hash_builder)
    }

    /// Creates an empty map expecting `capacity` entries, with the given
    /// hasher.
    #[must_use]
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: H) -> Self {
        Self::with_parts(capacity, hash::process_seed(), hash_builder, NodeArena::new())
    }
}

impl<K, V, H, S: NodeStore<K, V>> HamtMap<K, V, H, S> {
    /// Creates an empty map inside the given node store.
    #[must_use]
    pub fn new_in(store: S) -> Self
    where
        H: Default,
    {
        Self::with_parts(1, hash::process_seed(), H::default(), store)
    }

    /// Creates an empty map from all its parts: expected size hint, hash
    /// seed, hasher, and node store.
    ///
    /// # Panics
    ///
    /// Panics if the store cannot allocate the root branch.
    #[must_use]
    pub fn with_parts(capacity: usize, seed: u32, hash_builder: H, mut store: S) -> Self {
        let root_capacity = allocation_size(1, capacity.max(1), 0);
        let base = store
            .alloc_slots(root_capacity)
            .expect("store failed to allocate the root block");
        let root_branch = Branch {
            bitmap: 0,
            capacity: root_capacity,
            base,
        };
        let root = match store.alloc_node(Node {
            parent: None,
            kind: NodeKind::Branch(root_branch),
        }) {
            Ok(id) => id,
            Err(_) => panic!("store failed to allocate the root node"),
        };
        Self {
            store,
            root,
            seed,
            count: 0,
            hash_builder,
            marker: PhantomData,
        }
    }
}

// ---------------------------------------------------------------------------
// Accessors — no trait bounds
// ---------------------------------------------------------------------------

impl<K, V, H, S> HamtMap<K, V, H, S> {
    /// Returns the number of key-value pairs.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the map contains no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The initial hash seed this map walks with.
    #[must_use]
    pub const fn seed(&self) -> u32 {
        self.seed
    }

    /// Returns a reference to the map's hasher.
    #[must_use]
    pub const fn hasher(&self) -> &H {
        &self.hash_builder
    }

    /// Returns a reference to the map's node store (its allocator).
    #[must_use]
    pub const fn allocator(&self) -> &S {
        &self.store
    }

    #[cfg(test)]
    pub(crate) const fn root_id(&self) -> NodeId {
        self.root
    }
}

// ---------------------------------------------------------------------------
// Read operations
// ---------------------------------------------------------------------------

impl<K, V, H, S> HamtMap<K, V, H, S>
where
    K: Hash + Eq,
    H: BuildHasher,
    S: NodeStore<K, V>,
{
    /// Returns a reference to the value associated with `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        let id = self.find(key)?;
        Some(&self.store.node(id).entry().value)
    }

    /// Returns a mutable reference to the value associated with `key`.
    #[must_use]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.find(key)?;
        Some(&mut self.store.node_mut(id).entry_mut().value)
    }

    /// Returns `true` if the map contains the given key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    fn find(&self, key: &K) -> Option<NodeId> {
        let walker = HashWalker::new(hash::key_hash(&self.hash_builder, key), self.seed);
        find_node(&self.store, self.root, walker, key)
    }
}

// ---------------------------------------------------------------------------
// Write operations
// ---------------------------------------------------------------------------

impl<K, V, H, S> HamtMap<K, V, H, S>
where
    K: Hash + Eq,
    H: BuildHasher,
    S: NodeStore<K, V>,
{
    /// Inserts a key-value pair.
    ///
    /// Returns `Ok(None)` when the key was new and `Ok(Some(old_value))`
    /// when an existing value was overwritten in place (the length does not
    /// change). On error the map is unchanged: allocation failures unwind
    /// any partially built split, and an unresolvable collision — a key
    /// whose slice stream matches an existing key's under every reseed —
    /// is rejected before anything is touched.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, InsertError> {
        let key_hash = hash::key_hash(&self.hash_builder, &key);
        let walker = HashWalker::new(key_hash, self.seed);
        let entry = Entry {
            hash: key_hash,
            key,
            value,
        };
        let previous = insert_recursive(
            &mut self.store,
            self.root,
            entry,
            walker,
            0,
            self.count + 1,
        )?;
        if previous.is_none() {
            self.count += 1;
        }
        Ok(previous)
    }
}

impl<K, V, H, S: NodeStore<K, V>> HamtMap<K, V, H, S> {
    /// Removes every entry, returning all storage below the root to the
    /// store. The root keeps no block until the next insert grows one.
    pub fn clear(&mut self) {
        let branch = mem::replace(self.store.node_mut(self.root).branch_mut(), Branch::empty());
        free_subtree(&mut self.store, branch);
        self.count = 0;
    }

    /// Exchanges the entire contents of two maps, stores and seeds included.
    /// O(1).
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Returns an iterator over `(&K, &V)` pairs.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V, S> {
        Iter::new(&self.store, self.root, self.count)
    }

    /// Deep-clones this map into a caller-supplied store.
    ///
    /// # Panics
    ///
    /// Panics if `store` cannot hold the copy.
    #[must_use]
    pub fn clone_in<S2: NodeStore<K, V>>(&self, mut store: S2) -> HamtMap<K, V, H, S2>
    where
        K: Clone,
        V: Clone,
        H: Clone,
    {
        let src_root = *self.store.node(self.root).branch();
        let root = clone_tree(&self.store, src_root, &mut store)
            .expect("store failed to hold the cloned tree");
        HamtMap {
            store,
            root,
            seed: self.seed,
            count: self.count,
            hash_builder: self.hash_builder.clone(),
            marker: PhantomData,
        }
    }
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

impl<K, V, H, S> Clone for HamtMap<K, V, H, S>
where
    K: Clone,
    V: Clone,
    H: Clone,
    S: NodeStore<K, V> + Default,
{
    fn clone(&self) -> Self {
        self.clone_in(S::default())
    }
}

impl<K, V> Default for HamtMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H, S> fmt::Debug for HamtMap<K, V, H, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HamtMap")
            .field("len", &self.count)
            .field("seed", &format_args!("{:#010x}", self.seed))
            .finish_non_exhaustive()
    }
}

impl<K, V, H, S> Extend<(K, V)> for HamtMap<K, V, H, S>
where
    K: Hash + Eq,
    H: BuildHasher,
    S: NodeStore<K, V>,
{
    /// Inserts every pair in order. Pairs whose insertion fails (allocation
    /// failure or unresolvable collision) are dropped.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            let _ = self.insert(key, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for HamtMap<K, V>
where
    K: Hash + Eq,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V, H, S> ops::Index<&K> for HamtMap<K, V, H, S>
where
    K: Hash + Eq,
    H: BuildHasher,
    S: NodeStore<K, V>,
{
    type Output = V;

    fn index(&self, key: &K) -> &V {
        self.get(key).expect("key not found")
    }
}

impl<'a, K, V, H, S: NodeStore<K, V>> IntoIterator for &'a HamtMap<K, V, H, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, S>;

    fn into_iter(self) -> Iter<'a, K, V, S> {
        self.iter()
    }
}
