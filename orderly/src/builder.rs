use std::{
    hash::BuildHasher,
    marker::PhantomData,
    num::NonZeroUsize,
};

use crate::{
    Eldest,
    EvictFn,
    EvictionPolicy,
    MaxEntries,
    NeverEvict,
    OrderedMap,
    RandomState,
    links::LinkedOrder,
    map::next_map_id,
    table::Table,
};

/// The iteration order maintained by an [`OrderedMap`]. Fixed when the map is
/// built.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderMode {
    /// Entries iterate in the order their keys were first inserted.
    /// Re-inserting an existing key does not move it.
    #[default]
    Insertion,
    /// Entries iterate from least recently accessed to most recently
    /// accessed. Lookups, updates and insertions of an existing key move it to
    /// the back.
    Access,
}

/// Configures and creates an [`OrderedMap`].
///
/// Obtained from [`OrderedMap::builder`]. The eviction policy and hasher are
/// part of the map's type and are chosen here.
///
/// # Examples
///
/// ```rust
/// use orderly::{
///     OrderMode,
///     OrderedMap,
/// };
///
/// let mut cache = OrderedMap::builder()
///     .capacity(16)
///     .access_order()
///     .evict_when(|eldest| eldest.map_len() > 2)
///     .build();
///
/// cache.insert("a", 1);
/// cache.insert("b", 2);
/// cache.get(&"a");
/// cache.insert("c", 3);
///
/// assert_eq!(cache.order_mode(), OrderMode::Access);
/// assert_eq!(cache.keys().copied().collect::<Vec<_>>(), ["a", "c"]);
/// ```
pub struct Builder<K, V, P = NeverEvict, S = RandomState> {
    capacity: usize,
    mode: OrderMode,
    policy: P,
    hasher: S,
    _entries: PhantomData<fn() -> (K, V)>,
}

impl<K, V, P: std::fmt::Debug, S> std::fmt::Debug for Builder<K, V, P, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("capacity", &self.capacity)
            .field("mode", &self.mode)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<K, V> Default for Builder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Builder<K, V> {
    /// Creates a builder for an insertion-ordered map that never evicts.
    pub fn new() -> Self {
        Builder {
            capacity: 0,
            mode: OrderMode::Insertion,
            policy: NeverEvict,
            hasher: RandomState::default(),
            _entries: PhantomData,
        }
    }
}

impl<K, V, P, S> Builder<K, V, P, S> {
    /// Pre-allocates room for at least `capacity` entries.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the iteration order.
    pub fn order(mut self, mode: OrderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shorthand for `order(OrderMode::Access)`.
    pub fn access_order(self) -> Self {
        self.order(OrderMode::Access)
    }

    /// Shorthand for `order(OrderMode::Insertion)`.
    pub fn insertion_order(self) -> Self {
        self.order(OrderMode::Insertion)
    }

    /// Uses `hasher` to hash keys.
    pub fn hasher<S2: BuildHasher>(self, hasher: S2) -> Builder<K, V, P, S2> {
        Builder {
            capacity: self.capacity,
            mode: self.mode,
            policy: self.policy,
            hasher,
            _entries: PhantomData,
        }
    }

    /// Uses `policy` to decide when the eldest entry is removed.
    pub fn eviction<P2: EvictionPolicy<K, V>>(self, policy: P2) -> Builder<K, V, P2, S> {
        Builder {
            capacity: self.capacity,
            mode: self.mode,
            policy,
            hasher: self.hasher,
            _entries: PhantomData,
        }
    }

    /// Bounds the map to `max` entries, evicting the eldest entry once the
    /// bound is exceeded.
    pub fn max_entries(self, max: NonZeroUsize) -> Builder<K, V, MaxEntries, S> {
        self.eviction(MaxEntries::new(max))
    }

    /// Evicts the eldest entry whenever `should_evict` returns `true` for it.
    pub fn evict_when<F>(self, should_evict: F) -> Builder<K, V, EvictFn<F>, S>
    where
        F: FnMut(Eldest<'_, K, V>) -> bool,
    {
        self.eviction(EvictFn(should_evict))
    }

    /// Creates the map.
    pub fn build(self) -> OrderedMap<K, V, P, S> {
        OrderedMap {
            table: Table::with_capacity_and_hasher(self.capacity, self.hasher),
            order: LinkedOrder::default(),
            mode: self.mode,
            policy: self.policy,
            mod_count: 0,
            id: next_map_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use ntest::timeout;

    use super::*;

    #[test]
    #[timeout(1000)]
    fn test_defaults() {
        let map: OrderedMap<u32, u32> = Builder::new().build();
        assert_eq!(map.order_mode(), OrderMode::Insertion);
        assert!(map.is_empty());
        assert_eq!(*map.policy(), NeverEvict);
    }

    #[test]
    #[timeout(1000)]
    fn test_capacity_and_order() {
        let map: OrderedMap<u32, u32> = Builder::new().capacity(64).access_order().build();
        assert!(map.capacity() >= 64);
        assert_eq!(map.order_mode(), OrderMode::Access);

        let map: OrderedMap<u32, u32> = Builder::new()
            .access_order()
            .insertion_order()
            .build();
        assert_eq!(map.order_mode(), OrderMode::Insertion);
    }

    #[test]
    #[timeout(1000)]
    fn test_max_entries() {
        let mut map = Builder::new()
            .max_entries(NonZeroUsize::new(2).unwrap())
            .build();
        map.insert(1, "a");
        map.insert(2, "b");
        map.insert(3, "c");
        assert_eq!(map.len(), 2);
        assert_eq!(map.policy().max().get(), 2);
        assert!(!map.contains_key(&1));
    }

    #[test]
    #[timeout(1000)]
    fn test_custom_hasher() {
        let mut map = Builder::new()
            .hasher(std::hash::BuildHasherDefault::<std::hash::DefaultHasher>::default())
            .build();
        map.insert("k", 1);
        assert_eq!(map.peek(&"k"), Some(&1));
    }
}
