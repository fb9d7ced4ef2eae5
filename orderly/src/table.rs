use std::{
    borrow::Borrow,
    hash::{
        BuildHasher,
        Hash,
    },
};

use hashbrown::HashTable;

use crate::arena::{
    Arena,
    Node,
    Ptr,
};

/// Lifecycle callbacks fired by [`Table`] so that an auxiliary structure
/// threaded through the entries can stay in sync with the table.
///
/// Every hook receives the arena so it can rewrite neighbor links. Hooks must
/// not allocate or free slots.
pub(crate) trait TableHooks<K, V> {
    /// A new entry was allocated at `ptr` and is already indexed.
    fn node_created(&mut self, nodes: &mut Arena<K, V>, ptr: Ptr);

    /// The entry formerly at `from` now lives at `to`. Its own links were
    /// carried over verbatim; its neighbors still point at `from`.
    fn node_replaced(&mut self, nodes: &mut Arena<K, V>, from: Ptr, to: Ptr);

    /// The entry at `ptr` has been dropped from the index and is about to be
    /// freed. Its slot is still readable.
    fn node_removed(&mut self, nodes: &mut Arena<K, V>, ptr: Ptr);
}

/// Hash index over an arena of entries. The table owns entry lifetime; the
/// index only stores handles.
#[derive(Clone)]
pub(crate) struct Table<K, V, S> {
    nodes: Arena<K, V>,
    index: HashTable<Ptr>,
    hasher: S,
}

impl<K, V, S> Table<K, V, S> {
    pub(crate) fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Table {
            nodes: Arena::with_capacity(capacity),
            index: HashTable::with_capacity(capacity),
            hasher,
        }
    }

    pub(crate) fn len(&self) -> usize {
        debug_assert_eq!(self.index.len(), self.nodes.len());
        self.index.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.index.capacity()
    }

    pub(crate) fn hasher(&self) -> &S {
        &self.hasher
    }

    pub(crate) fn nodes(&self) -> &Arena<K, V> {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut Arena<K, V> {
        &mut self.nodes
    }

    pub(crate) fn into_nodes(self) -> Arena<K, V> {
        self.nodes
    }

    pub(crate) fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        let nodes = &self.nodes;
        self.index.reserve(additional, |ptr| nodes[*ptr].hash);
        self.nodes.reserve(additional);
    }

    /// Allocates and indexes a new entry. The caller guarantees that no entry
    /// with an equal key is present.
    pub(crate) fn insert_unique(
        &mut self,
        hash: u64,
        key: K,
        value: V,
        hooks: &mut impl TableHooks<K, V>,
    ) -> Ptr {
        let ptr = self.nodes.alloc(key, value, hash);
        let nodes = &self.nodes;
        self.index.insert_unique(hash, ptr, |ptr| nodes[*ptr].hash);
        hooks.node_created(&mut self.nodes, ptr);
        ptr
    }

    /// Removes the entry at `ptr`, which must be occupied.
    #[track_caller]
    pub(crate) fn remove_ptr(&mut self, ptr: Ptr, hooks: &mut impl TableHooks<K, V>) -> Node<K, V> {
        let hash = self.nodes[ptr].hash;
        match self.index.find_entry(hash, |candidate| *candidate == ptr) {
            Ok(occupied) => {
                occupied.remove();
            }
            Err(_) => {
                unreachable!("Pointer not found in index: {ptr:?}");
            }
        }

        hooks.node_removed(&mut self.nodes, ptr);
        self.nodes.free(ptr)
    }

    /// Moves every live entry into the lowest slots of the arena and releases
    /// the rest. Returns the number of relocated entries.
    pub(crate) fn compact(&mut self, hooks: &mut impl TableHooks<K, V>) -> usize {
        let live = self.nodes.len();
        let mut vacant = 0;
        let mut occupied = self.nodes.slot_count();
        let mut relocated = 0;

        loop {
            while vacant < live && self.nodes.is_occupied(Ptr::unchecked_from(vacant)) {
                vacant += 1;
            }
            while occupied > live && !self.nodes.is_occupied(Ptr::unchecked_from(occupied - 1)) {
                occupied -= 1;
            }
            if vacant >= live || occupied <= live {
                break;
            }

            let from = Ptr::unchecked_from(occupied - 1);
            let to = Ptr::unchecked_from(vacant);
            self.nodes.relocate(from, to);

            let hash = self.nodes[to].hash;
            match self.index.find_mut(hash, |candidate| *candidate == from) {
                Some(slot) => *slot = to,
                None => unreachable!("Relocated pointer not found in index: {from:?}"),
            }
            hooks.node_replaced(&mut self.nodes, from, to);
            relocated += 1;
        }

        self.nodes.finish_compaction();
        let nodes = &self.nodes;
        self.index.shrink_to_fit(|ptr| nodes[*ptr].hash);

        relocated
    }

    #[cfg(all(debug_assertions, feature = "internal-debugging"))]
    pub(crate) fn debug_validate(&self) {
        assert_eq!(
            self.index.len(),
            self.nodes.len(),
            "Index and arena disagree on the number of entries"
        );
        for ptr in self.index.iter().copied() {
            assert!(
                self.nodes.is_occupied(ptr),
                "Index refers to a vacant slot: {ptr:?}"
            );
        }
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> Table<K, V, S> {
    pub(crate) fn hash<Q>(&self, key: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.hasher.hash_one(key)
    }

    pub(crate) fn find_hashed<Q>(&self, hash: u64, key: &Q) -> Option<Ptr>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index
            .find(hash, |ptr| self.nodes[*ptr].key.borrow() == key)
            .copied()
    }

    pub(crate) fn find<Q>(&self, key: &Q) -> Option<Ptr>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_hashed(self.hash(key), key)
    }

    pub(crate) fn remove<Q>(
        &mut self,
        key: &Q,
        hooks: &mut impl TableHooks<K, V>,
    ) -> Option<Node<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let ptr = self.find(key)?;
        Some(self.remove_ptr(ptr, hooks))
    }
}
