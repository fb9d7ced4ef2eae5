use std::num::NonZeroUsize;

/// Read-only view of the eldest entry, handed to an [`EvictionPolicy`] right
/// after a new entry was added to the map.
///
/// The eldest entry is the head of the iteration order: the least recently
/// inserted entry under insertion order, or the least recently accessed one
/// under access order.
#[derive(Debug)]
pub struct Eldest<'a, K, V> {
    key: &'a K,
    value: &'a V,
    map_len: usize,
}

impl<K, V> Clone for Eldest<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Eldest<'_, K, V> {}

impl<'a, K, V> Eldest<'a, K, V> {
    pub(crate) fn new(key: &'a K, value: &'a V, map_len: usize) -> Self {
        Eldest {
            key,
            value,
            map_len,
        }
    }

    /// The key of the eldest entry.
    pub fn key(&self) -> &'a K {
        self.key
    }

    /// The value of the eldest entry.
    pub fn value(&self) -> &'a V {
        self.value
    }

    /// Number of entries in the map, including the one just added.
    pub fn map_len(&self) -> usize {
        self.map_len
    }
}

/// Decides whether the eldest entry of a map is removed after an insertion.
///
/// The policy is consulted exactly once after every insertion that creates a
/// brand-new entry. Replacing the value of an existing key never consults the
/// policy, so a map at its bound whose existing keys are merely updated never
/// evicts. When the policy returns `true` the eldest entry is removed
/// immediately; at most one entry is removed per insertion.
///
/// # Examples
///
/// ```rust
/// use orderly::{
///     Eldest,
///     EvictionPolicy,
///     OrderedMap,
/// };
///
/// /// Drops the eldest entry whenever the total of all values would exceed a
/// /// budget.
/// struct Budget {
///     limit: u32,
///     used: u32,
/// }
///
/// impl<K> EvictionPolicy<K, u32> for Budget {
///     fn should_evict(&mut self, eldest: Eldest<'_, K, u32>) -> bool {
///         if self.used > self.limit {
///             self.used -= *eldest.value();
///             true
///         } else {
///             false
///         }
///     }
/// }
///
/// let mut map = OrderedMap::builder()
///     .eviction(Budget { limit: 10, used: 0 })
///     .build();
/// for (key, cost) in [("a", 4), ("b", 4), ("c", 4)] {
///     map.policy_mut().used += cost;
///     map.insert(key, cost);
/// }
///
/// assert_eq!(map.keys().copied().collect::<Vec<_>>(), ["b", "c"]);
/// assert_eq!(map.policy().used, 8);
/// ```
pub trait EvictionPolicy<K, V> {
    /// Returns `true` if `eldest` should be removed from the map.
    fn should_evict(&mut self, eldest: Eldest<'_, K, V>) -> bool;
}

/// The default policy: entries are never evicted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NeverEvict;

impl<K, V> EvictionPolicy<K, V> for NeverEvict {
    fn should_evict(&mut self, _: Eldest<'_, K, V>) -> bool {
        false
    }
}

/// Bounds a map to a maximum number of entries by evicting the eldest entry
/// once the bound is exceeded.
///
/// Combined with access order this is a least-recently-used cache, see
/// [`OrderedMap::lru`](crate::OrderedMap::lru).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaxEntries {
    max: NonZeroUsize,
}

impl MaxEntries {
    /// Creates a policy that keeps at most `max` entries.
    pub fn new(max: NonZeroUsize) -> Self {
        MaxEntries { max }
    }

    /// The maximum number of entries.
    pub fn max(&self) -> NonZeroUsize {
        self.max
    }

    /// Changes the bound.
    ///
    /// Lowering the bound does not shrink the map right away. Eviction only
    /// happens on insertion, and removes a single entry each time.
    pub fn set_max(&mut self, max: NonZeroUsize) {
        self.max = max;
    }
}

impl<K, V> EvictionPolicy<K, V> for MaxEntries {
    fn should_evict(&mut self, eldest: Eldest<'_, K, V>) -> bool {
        eldest.map_len() > self.max.get()
    }
}

/// Adapts a closure into an [`EvictionPolicy`].
///
/// Usually created with [`Builder::evict_when`](crate::Builder::evict_when).
#[derive(Clone, Copy)]
pub struct EvictFn<F>(pub F);

impl<F> std::fmt::Debug for EvictFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EvictFn").finish_non_exhaustive()
    }
}

impl<K, V, F> EvictionPolicy<K, V> for EvictFn<F>
where
    F: FnMut(Eldest<'_, K, V>) -> bool,
{
    fn should_evict(&mut self, eldest: Eldest<'_, K, V>) -> bool {
        (self.0)(eldest)
    }
}
