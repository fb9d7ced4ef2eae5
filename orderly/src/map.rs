use std::{
    borrow::Borrow,
    hash::{
        BuildHasher,
        Hash,
    },
    num::NonZeroUsize,
    ops::Index,
    sync::atomic::{
        AtomicU64,
        Ordering,
    },
};

use tracing::{
    debug,
    trace,
};

use crate::{
    Builder,
    Cursor,
    Eldest,
    EntriesView,
    EvictionPolicy,
    IntoIter,
    Iter,
    IterMut,
    Keys,
    KeysView,
    MaxEntries,
    NeverEvict,
    OrderMode,
    RandomState,
    Values,
    ValuesMut,
    ValuesView,
    arena::Ptr,
    links::{
        LinkFirst,
        LinkedOrder,
    },
    table::Table,
};

/// Where an insertion places its entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// New keys go to the back; existing keys move to the back only under
    /// access order.
    Ordered,
    /// New and existing keys go to the front.
    First,
    /// New and existing keys go to the back.
    Last,
}

/// A hash map that remembers an iteration order and can evict its eldest
/// entry.
///
/// Every entry is stored once, in an arena, and is reachable both through a
/// hash index and through a doubly linked list that defines the iteration
/// order. The order is chosen when the map is built (see [`OrderMode`]):
///
/// - **Insertion order** (the default): entries iterate in the order their
///   keys were first inserted. Re-inserting an existing key keeps its place.
/// - **Access order**: entries iterate from least recently accessed to most
///   recently accessed. Every lookup or update of an existing key moves it to
///   the back.
///
/// After each insertion of a brand-new key, the map asks its
/// [`EvictionPolicy`] whether the eldest entry (the front of the order) should
/// be removed. The default [`NeverEvict`] policy never does; [`MaxEntries`]
/// turns the map into a bounded cache.
///
/// Methods that reorder the map take `&mut self` even when they only read,
/// e.g. [`get`](Self::get). Use [`peek`](Self::peek) to read without
/// reordering.
///
/// # Time Complexity
/// - Insert/Get/Remove/Peek: O(1) average
/// - Promotion to the back: O(1)
/// - First/Last/Pop: O(1)
/// - `contains_value`/`retain`: O(n)
///
/// # Examples
///
/// ```rust
/// use orderly::OrderedMap;
///
/// let mut map = OrderedMap::new();
/// map.insert("A", 1);
/// map.insert("B", 2);
/// map.insert("C", 3);
/// map.insert("B", 20);
///
/// assert_eq!(
///     map.iter().collect::<Vec<_>>(),
///     [(&"A", &1), (&"B", &20), (&"C", &3)]
/// );
/// ```
///
/// An access-ordered map moves touched entries to the back:
///
/// ```rust
/// use orderly::OrderedMap;
///
/// let mut map = OrderedMap::access_ordered();
/// map.insert("A", 1);
/// map.insert("B", 2);
/// map.insert("C", 3);
/// map.get(&"A");
///
/// assert_eq!(map.keys().copied().collect::<Vec<_>>(), ["B", "C", "A"]);
/// ```
pub struct OrderedMap<K, V, P = NeverEvict, S = RandomState> {
    pub(crate) table: Table<K, V, S>,
    pub(crate) order: LinkedOrder,
    pub(crate) mode: OrderMode,
    pub(crate) policy: P,
    pub(crate) mod_count: usize,
    pub(crate) id: u64,
}

/// Hands out the identity a [`Cursor`] uses to recognize its map.
pub(crate) fn next_map_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(0);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// An access-ordered map bounded to a maximum number of entries, i.e. a
/// least-recently-used cache. Created with [`OrderedMap::lru`].
pub type LruMap<K, V> = OrderedMap<K, V, MaxEntries>;

impl<K, V> OrderedMap<K, V> {
    /// Creates an empty insertion-ordered map.
    pub fn new() -> Self {
        Builder::new().build()
    }

    /// Creates an empty insertion-ordered map with room for at least
    /// `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Builder::new().capacity(capacity).build()
    }

    /// Creates an empty map with the given iteration order.
    pub fn with_order(mode: OrderMode) -> Self {
        Builder::new().order(mode).build()
    }

    /// Creates an empty access-ordered map.
    pub fn access_ordered() -> Self {
        Self::with_order(OrderMode::Access)
    }

    /// Returns a [`Builder`] to configure capacity, order, hasher and
    /// eviction policy.
    pub fn builder() -> Builder<K, V> {
        Builder::new()
    }
}

impl<K, V> OrderedMap<K, V, MaxEntries> {
    /// Creates an access-ordered map that keeps at most `max` entries,
    /// evicting the least recently used one when a new key would exceed the
    /// bound.
    ///
    /// The bound only drives eviction; no storage is reserved for it up front.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use orderly::OrderedMap;
    ///
    /// let mut cache = OrderedMap::lru(NonZeroUsize::new(2).unwrap());
    /// cache.insert(1, "one");
    /// cache.insert(2, "two");
    /// cache.get(&1);
    /// cache.insert(3, "three");
    ///
    /// assert!(cache.contains_key(&1));
    /// assert!(!cache.contains_key(&2));
    /// assert_eq!(cache.len(), 2);
    /// ```
    pub fn lru(max: NonZeroUsize) -> Self {
        Builder::new()
            .access_order()
            .max_entries(max)
            .build()
    }
}

impl<K, V, P: Default, S: Default> Default for OrderedMap<K, V, P, S> {
    fn default() -> Self {
        OrderedMap {
            table: Table::with_capacity_and_hasher(0, S::default()),
            order: LinkedOrder::default(),
            mode: OrderMode::Insertion,
            policy: P::default(),
            mod_count: 0,
            id: next_map_id(),
        }
    }
}

impl<K, V, P, S> OrderedMap<K, V, P, S> {
    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of entries the map can hold without reallocating
    /// its index.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the iteration order the map was built with.
    pub fn order_mode(&self) -> OrderMode {
        self.mode
    }

    /// Returns the eviction policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Returns the eviction policy mutably, e.g. to change the bound of a
    /// [`MaxEntries`] policy.
    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    /// Returns the map's hasher.
    pub fn hasher(&self) -> &S {
        self.table.hasher()
    }

    /// Returns the eldest entry (the front of the iteration order) without
    /// reordering anything.
    pub fn first(&self) -> Option<(&K, &V)> {
        let node = self.table.nodes().get(self.order.head())?;
        Some((&node.key, &node.value))
    }

    /// Returns the youngest entry (the back of the iteration order) without
    /// reordering anything.
    pub fn last(&self) -> Option<(&K, &V)> {
        let node = self.table.nodes().get(self.order.tail())?;
        Some((&node.key, &node.value))
    }

    /// Returns `true` if any entry holds `value`. Walks every entry in
    /// iteration order.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values().any(|candidate| candidate == value)
    }

    /// Removes and returns the eldest entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use orderly::OrderedMap;
    ///
    /// let mut map: OrderedMap<_, _> = [(1, "a"), (2, "b")].into_iter().collect();
    /// assert_eq!(map.pop_first(), Some((1, "a")));
    /// assert_eq!(map.pop_first(), Some((2, "b")));
    /// assert_eq!(map.pop_first(), None);
    /// ```
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let head = self.order.head().optional()?;
        Some(self.remove_ptr(head))
    }

    /// Removes and returns the youngest entry.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let tail = self.order.tail().optional()?;
        Some(self.remove_ptr(tail))
    }

    /// Keeps only the entries for which `keep` returns `true`, visiting them in
    /// iteration order. Does not reorder surviving entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use orderly::OrderedMap;
    ///
    /// let mut map: OrderedMap<_, _> = (1..=6).map(|i| (i, i * 10)).collect();
    /// map.retain(|key, value| {
    ///     *value += 1;
    ///     key % 2 == 0
    /// });
    ///
    /// assert_eq!(
    ///     map.into_iter().collect::<Vec<_>>(),
    ///     [(2, 21), (4, 41), (6, 61)]
    /// );
    /// ```
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut next = self.order.head();
        while let Some(ptr) = next.optional() {
            let node = &mut self.table.nodes_mut()[ptr];
            next = node.after;
            if !keep(&node.key, &mut node.value) {
                self.remove_ptr(ptr);
            }
        }
    }

    /// Removes every entry. Keeps the allocated storage.
    pub fn clear(&mut self) {
        self.table.clear();
        self.order.clear();
        self.record_modification();
    }

    /// Reserves room for at least `additional` more entries.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Releases unused storage.
    ///
    /// Entries living in high slots are moved into the holes left by removed
    /// entries. Iteration order is unaffected, but outstanding
    /// [`Cursor`]s are invalidated if anything moved.
    pub fn shrink_to_fit(&mut self) {
        let relocated = self.table.compact(&mut self.order);
        if relocated > 0 {
            self.record_modification();
            debug!(relocated, len = self.len(), "compacted entry storage");
        }
    }

    /// Iterates over the entries in order.
    ///
    /// Iterating never reorders the map, even under access order. The iterator
    /// is double ended: `.rev()` walks from youngest to eldest.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use orderly::OrderedMap;
    ///
    /// let mut map = OrderedMap::access_ordered();
    /// map.insert("a", 1);
    /// map.insert("b", 2);
    ///
    /// let forward: Vec<_> = map.iter().collect();
    /// let backward: Vec<_> = map.iter().rev().collect();
    /// assert_eq!(forward, [(&"a", &1), (&"b", &2)]);
    /// assert_eq!(backward, [(&"b", &2), (&"a", &1)]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.table.nodes(), self.order)
    }

    /// Iterates over the entries in order with mutable access to the values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(self.table.nodes_mut(), self.order)
    }

    /// Iterates over the keys in order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Iterates over the values in order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Iterates over the values in order, mutably.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Returns a live view of the keys.
    pub fn keys_view(&self) -> KeysView<'_, K, V, P, S> {
        KeysView { map: self }
    }

    /// Returns a live view of the values.
    pub fn values_view(&self) -> ValuesView<'_, K, V, P, S> {
        ValuesView { map: self }
    }

    /// Returns a live view of the entries.
    pub fn entries_view(&self) -> EntriesView<'_, K, V, P, S> {
        EntriesView { map: self }
    }

    /// Returns a fail-fast [`Cursor`] positioned before the eldest entry.
    ///
    /// The cursor does not borrow the map; it is handed the map on every call.
    /// Any structural change made to the map by another path than
    /// [`Cursor::remove`] makes the cursor fail with
    /// [`Error::ConcurrentModification`](crate::Error::ConcurrentModification).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use orderly::{
    ///     Error,
    ///     OrderedMap,
    /// };
    ///
    /// let mut map: OrderedMap<_, _> = (1..=4).map(|i| (i, i)).collect();
    ///
    /// let mut cursor = map.cursor();
    /// while let Some((key, _)) = cursor.next(&map)? {
    ///     if key % 2 == 1 {
    ///         cursor.remove(&mut map)?;
    ///     }
    /// }
    /// assert_eq!(map.keys().copied().collect::<Vec<_>>(), [2, 4]);
    ///
    /// let mut cursor = map.cursor();
    /// map.remove(&4);
    /// assert!(matches!(
    ///     cursor.next(&map),
    ///     Err(Error::ConcurrentModification { .. })
    /// ));
    /// # Ok::<(), Error>(())
    /// ```
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.id, self.order.head(), self.mod_count)
    }

    pub(crate) fn record_modification(&mut self) {
        self.mod_count = self.mod_count.wrapping_add(1);
    }

    /// Removes the entry at `ptr`, which must be live.
    pub(crate) fn remove_ptr(&mut self, ptr: Ptr) -> (K, V) {
        let node = self.table.remove_ptr(ptr, &mut self.order);
        self.record_modification();
        (node.key, node.value)
    }

    /// Moves `ptr` according to `placement`. Counts as a structural
    /// modification only if the entry actually moved.
    fn reposition(&mut self, ptr: Ptr, placement: Placement) {
        let nodes = self.table.nodes_mut();
        let moved = match placement {
            Placement::Ordered => {
                self.mode == OrderMode::Access && self.order.move_to_last(nodes, ptr)
            }
            Placement::First => self.order.move_to_first(nodes, ptr),
            Placement::Last => self.order.move_to_last(nodes, ptr),
        };
        if moved {
            self.record_modification();
        }
    }

    fn promote(&mut self, ptr: Ptr) {
        self.reposition(ptr, Placement::Ordered);
    }

    /// Applies `remap` to a live entry: replaces and promotes it on `Some`,
    /// removes it on `None`.
    fn remap_existing<F>(&mut self, ptr: Ptr, remap: F) -> Option<&V>
    where
        F: FnOnce(&K, &V) -> Option<V>,
    {
        let node = &self.table.nodes()[ptr];
        match remap(&node.key, &node.value) {
            Some(value) => {
                self.table.nodes_mut()[ptr].value = value;
                self.promote(ptr);
                Some(&self.table.nodes()[ptr].value)
            }
            None => {
                self.remove_ptr(ptr);
                None
            }
        }
    }
}

impl<K: Hash + Eq, V, P, S: BuildHasher> OrderedMap<K, V, P, S> {
    /// Returns the value for `key` without reordering anything.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use orderly::OrderedMap;
    ///
    /// let mut map = OrderedMap::access_ordered();
    /// map.insert(1, "a");
    /// map.insert(2, "b");
    ///
    /// assert_eq!(map.peek(&1), Some(&"a"));
    /// assert_eq!(map.peek(&3), None);
    /// assert_eq!(map.keys().copied().collect::<Vec<_>>(), [1, 2]);
    /// ```
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.peek_key_value(key).map(|(_, value)| value)
    }

    /// Returns the stored key and value for `key` without reordering anything.
    pub fn peek_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let node = &self.table.nodes()[self.table.find(key)?];
        Some((&node.key, &node.value))
    }

    /// Returns `true` if the map holds `key`. Never reorders.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find(key).is_some()
    }

    /// Returns the value for `key`.
    ///
    /// Under access order a hit moves the entry to the back.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use orderly::OrderedMap;
    ///
    /// let mut map = OrderedMap::access_ordered();
    /// map.insert("A", 1);
    /// map.insert("B", 2);
    /// map.insert("C", 3);
    ///
    /// assert_eq!(map.get(&"A"), Some(&1));
    /// assert_eq!(map.get(&"Z"), None);
    /// assert_eq!(map.keys().copied().collect::<Vec<_>>(), ["B", "C", "A"]);
    /// ```
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let ptr = self.table.find(key)?;
        self.promote(ptr);
        Some(&self.table.nodes()[ptr].value)
    }

    /// Returns the value for `key` mutably. Under access order a hit moves the
    /// entry to the back.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let ptr = self.table.find(key)?;
        self.promote(ptr);
        Some(&mut self.table.nodes_mut()[ptr].value)
    }

    /// Returns the stored key and value for `key`. Under access order a hit
    /// moves the entry to the back.
    pub fn get_key_value<Q>(&mut self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let ptr = self.table.find(key)?;
        self.promote(ptr);
        let node = &self.table.nodes()[ptr];
        Some((&node.key, &node.value))
    }

    /// Returns the value for `key`, or `default` if it is absent. Under access
    /// order a hit moves the entry to the back.
    pub fn get_or<'a, Q>(&'a mut self, key: &Q, default: &'a V) -> &'a V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).unwrap_or(default)
    }

    /// Replaces the value of an existing key and returns the previous one.
    /// Does nothing if the key is absent. Under access order the entry moves to
    /// the back.
    pub fn replace<Q>(&mut self, key: &Q, value: V) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let ptr = self.table.find(key)?;
        let previous = std::mem::replace(&mut self.table.nodes_mut()[ptr].value, value);
        self.promote(ptr);
        Some(previous)
    }

    /// Replaces the value of `key` only if it currently equals `expected`.
    /// Returns whether the value was replaced. Under access order the entry
    /// moves to the back only when it was replaced.
    pub fn replace_if_eq<Q>(&mut self, key: &Q, expected: &V, value: V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        let Some(ptr) = self.table.find(key) else {
            return false;
        };
        let current = &mut self.table.nodes_mut()[ptr].value;
        if *current != *expected {
            return false;
        }
        *current = value;
        self.promote(ptr);
        true
    }

    /// Recomputes the value of an existing key.
    ///
    /// If `remap` returns `Some`, the value is replaced and, under access
    /// order, the entry moves to the back. If it returns `None`, the entry is
    /// removed. Absent keys are left alone. Returns the new value.
    pub fn compute_if_present<Q, F>(&mut self, key: &Q, remap: F) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&K, &V) -> Option<V>,
    {
        let ptr = self.table.find(key)?;
        self.remap_existing(ptr, remap)
    }

    /// Removes `key` and returns its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes `key` and returns the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let node = self.table.remove(key, &mut self.order)?;
        self.record_modification();
        Some((node.key, node.value))
    }

    /// Removes `key` only if its value equals `expected`. Returns whether the
    /// entry was removed.
    pub fn remove_if_eq<Q>(&mut self, key: &Q, expected: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        match self.table.find(key) {
            Some(ptr) if self.table.nodes()[ptr].value == *expected => {
                self.remove_ptr(ptr);
                true
            }
            _ => false,
        }
    }

    #[doc(hidden)]
    #[cfg(all(debug_assertions, feature = "internal-debugging"))]
    pub fn debug_validate(&self) {
        self.table.debug_validate();
        self.order.debug_validate(self.table.nodes());

        let mut ptr = self.order.head();
        while let Some(node) = self.table.nodes().get(ptr) {
            assert_eq!(
                node.hash,
                self.table.hash(&node.key),
                "Cached hash is stale at {ptr:?}"
            );
            assert_eq!(
                self.table.find_hashed(node.hash, &node.key),
                Some(ptr),
                "Linked entry is not indexed: {ptr:?}"
            );
            ptr = node.after;
        }
    }
}

impl<K: Hash + Eq, V, P: EvictionPolicy<K, V>, S: BuildHasher> OrderedMap<K, V, P, S> {
    /// Inserts `value` for `key` and returns the previous value.
    ///
    /// A new key is appended at the back, after which the eviction policy is
    /// consulted with the eldest entry. An existing key keeps its stored key
    /// and gets the new value; it stays in place under insertion order and
    /// moves to the back under access order. Updating an existing key never
    /// evicts.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use orderly::OrderedMap;
    ///
    /// let mut map = OrderedMap::new();
    /// assert_eq!(map.insert("a", 1), None);
    /// assert_eq!(map.insert("b", 2), None);
    /// assert_eq!(map.insert("a", 10), Some(1));
    ///
    /// assert_eq!(map.keys().copied().collect::<Vec<_>>(), ["a", "b"]);
    /// assert_eq!(map.peek(&"a"), Some(&10));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.put(key, value, Placement::Ordered, true)
    }

    /// Inserts `value` only if `key` is absent.
    ///
    /// Returns the existing value if there was one, in which case `value` is
    /// dropped and, under access order, the existing entry moves to the back.
    pub fn insert_if_absent(&mut self, key: K, value: V) -> Option<&V> {
        let hash = self.table.hash(&key);
        match self.table.find_hashed(hash, &key) {
            Some(ptr) => {
                self.promote(ptr);
                Some(&self.table.nodes()[ptr].value)
            }
            None => {
                self.insert_new(hash, key, value, Placement::Ordered, true);
                None
            }
        }
    }

    /// Inserts `value` for `key` at the front of the order, moving an existing
    /// key there in either order mode.
    ///
    /// The eviction policy is still consulted for a new key, with the new
    /// entry as the eldest.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use orderly::OrderedMap;
    ///
    /// let mut map = OrderedMap::new();
    /// map.insert(1, "a");
    /// map.insert(2, "b");
    /// map.insert_first(3, "c");
    /// map.insert_first(2, "B");
    ///
    /// assert_eq!(map.iter().collect::<Vec<_>>(), [(&2, &"B"), (&3, &"c"), (&1, &"a")]);
    /// ```
    pub fn insert_first(&mut self, key: K, value: V) -> Option<V> {
        self.put(key, value, Placement::First, true)
    }

    /// Inserts `value` for `key` at the back of the order, moving an existing
    /// key there in either order mode.
    pub fn insert_last(&mut self, key: K, value: V) -> Option<V> {
        self.put(key, value, Placement::Last, true)
    }

    /// Computes a new value for `key` from the current one, if any.
    ///
    /// - `Some` for an existing key replaces the value and, under access
    ///   order, moves the entry to the back.
    /// - `None` for an existing key removes the entry.
    /// - `Some` for an absent key inserts a new entry, which may evict.
    /// - `None` for an absent key does nothing.
    ///
    /// Returns the value now stored for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use orderly::OrderedMap;
    ///
    /// let mut counts = OrderedMap::new();
    /// for word in ["a", "b", "a"] {
    ///     counts.compute(word, |_, count| Some(count.map_or(1, |c| c + 1)));
    /// }
    /// assert_eq!(counts.peek(&"a"), Some(&2));
    ///
    /// counts.compute("b", |_, _| None);
    /// assert!(!counts.contains_key(&"b"));
    /// ```
    pub fn compute<F>(&mut self, key: K, remap: F) -> Option<&V>
    where
        F: FnOnce(&K, Option<&V>) -> Option<V>,
    {
        let hash = self.table.hash(&key);
        match self.table.find_hashed(hash, &key) {
            Some(ptr) => self.remap_existing(ptr, |key, value| remap(key, Some(value))),
            None => {
                let value = remap(&key, None)?;
                let ptr = self.insert_new(hash, key, value, Placement::Ordered, true)?;
                Some(&self.table.nodes()[ptr].value)
            }
        }
    }

    /// Returns the value for `key`, inserting the result of `make` if the key
    /// is absent and `make` returns `Some`.
    ///
    /// An existing entry moves to the back under access order. A new entry may
    /// evict.
    pub fn compute_if_absent<F>(&mut self, key: K, make: F) -> Option<&V>
    where
        F: FnOnce(&K) -> Option<V>,
    {
        let hash = self.table.hash(&key);
        match self.table.find_hashed(hash, &key) {
            Some(ptr) => {
                self.promote(ptr);
                Some(&self.table.nodes()[ptr].value)
            }
            None => {
                let value = make(&key)?;
                let ptr = self.insert_new(hash, key, value, Placement::Ordered, true)?;
                Some(&self.table.nodes()[ptr].value)
            }
        }
    }

    /// Inserts `value` if `key` is absent, otherwise combines it with the
    /// current value through `remap`. A `None` from `remap` removes the entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use orderly::OrderedMap;
    ///
    /// let mut map = OrderedMap::new();
    /// map.merge("x", 1, |old, new| Some(old + new));
    /// map.merge("x", 5, |old, new| Some(old + new));
    /// assert_eq!(map.peek(&"x"), Some(&6));
    ///
    /// map.merge("x", 0, |_, _| None);
    /// assert!(map.is_empty());
    /// ```
    pub fn merge<F>(&mut self, key: K, value: V, remap: F) -> Option<&V>
    where
        F: FnOnce(&V, V) -> Option<V>,
    {
        let hash = self.table.hash(&key);
        match self.table.find_hashed(hash, &key) {
            Some(ptr) => self.remap_existing(ptr, |_, current| remap(current, value)),
            None => {
                let ptr = self.insert_new(hash, key, value, Placement::Ordered, true)?;
                Some(&self.table.nodes()[ptr].value)
            }
        }
    }

    fn put(&mut self, key: K, value: V, placement: Placement, evict: bool) -> Option<V> {
        let hash = self.table.hash(&key);
        match self.table.find_hashed(hash, &key) {
            Some(ptr) => {
                let previous = std::mem::replace(&mut self.table.nodes_mut()[ptr].value, value);
                self.reposition(ptr, placement);
                Some(previous)
            }
            None => {
                self.insert_new(hash, key, value, placement, evict);
                None
            }
        }
    }

    /// Creates an entry for a key known to be absent. Returns its handle, or
    /// `None` if the eviction policy removed the new entry itself.
    fn insert_new(
        &mut self,
        hash: u64,
        key: K,
        value: V,
        placement: Placement,
        evict: bool,
    ) -> Option<Ptr> {
        let ptr = match placement {
            Placement::First => {
                self.table
                    .insert_unique(hash, key, value, &mut LinkFirst(&mut self.order))
            }
            Placement::Ordered | Placement::Last => {
                self.table.insert_unique(hash, key, value, &mut self.order)
            }
        };
        self.record_modification();

        if evict && self.evict_eldest() == Some(ptr) {
            None
        } else {
            Some(ptr)
        }
    }

    /// Offers the eldest entry to the eviction policy and removes it if the
    /// policy agrees. Returns the handle of the evicted entry.
    fn evict_eldest(&mut self) -> Option<Ptr> {
        let head = self.order.head();
        let node = self.table.nodes().get(head)?;
        let eldest = Eldest::new(&node.key, &node.value, self.table.len());
        if !self.policy.should_evict(eldest) {
            return None;
        }

        self.remove_ptr(head);
        trace!(len = self.table.len(), "evicted eldest entry");
        Some(head)
    }
}

impl<K, V, P, S> std::fmt::Debug for OrderedMap<K, V, P, S>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Clone, V: Clone, P: Clone, S: Clone> Clone for OrderedMap<K, V, P, S> {
    /// Clones the map, keeping its order, mode and policy. The eviction policy
    /// is not consulted while cloning.
    fn clone(&self) -> Self {
        OrderedMap {
            table: self.table.clone(),
            order: self.order,
            mode: self.mode,
            policy: self.policy.clone(),
            mod_count: 0,
            id: next_map_id(),
        }
    }
}

impl<K, V, P, S, P2, S2> PartialEq<OrderedMap<K, V, P2, S2>> for OrderedMap<K, V, P, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
    S2: BuildHasher,
{
    /// Two maps are equal if they hold the same entries, regardless of order.
    fn eq(&self, other: &OrderedMap<K, V, P2, S2>) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.peek(key) == Some(value))
    }
}

impl<K: Hash + Eq, V: Eq, P, S: BuildHasher> Eq for OrderedMap<K, V, P, S> {}

impl<K, Q, V, P, S> Index<&Q> for OrderedMap<K, V, P, S>
where
    K: Hash + Eq + Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    S: BuildHasher,
{
    type Output = V;

    /// Returns the value for `key` without reordering.
    ///
    /// # Panics
    ///
    /// Panics if the key is absent.
    #[track_caller]
    fn index(&self, key: &Q) -> &V {
        match self.peek(key) {
            Some(value) => value,
            None => panic!("key not found in OrderedMap"),
        }
    }
}

impl<K, V, P, S> std::iter::FromIterator<(K, V)> for OrderedMap<K, V, P, S>
where
    K: Hash + Eq,
    P: EvictionPolicy<K, V> + Default,
    S: BuildHasher + Default,
{
    /// Builds an insertion-ordered map. Later duplicates overwrite earlier
    /// values but keep the first position. The eviction policy is not
    /// consulted while building.
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let iter = iter.into_iter();
        let mut map = Self::default();
        map.reserve(iter.size_hint().0);
        for (key, value) in iter {
            map.put(key, value, Placement::Ordered, false);
        }
        map
    }
}

impl<K, V, P, S> Extend<(K, V)> for OrderedMap<K, V, P, S>
where
    K: Hash + Eq,
    P: EvictionPolicy<K, V>,
    S: BuildHasher,
{
    /// Inserts every pair as if by [`insert`](OrderedMap::insert), consulting
    /// the eviction policy after each new key.
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, P, S> IntoIterator for OrderedMap<K, V, P, S> {
    type IntoIter = IntoIter<K, V>;
    type Item = (K, V);

    /// Consumes the map, yielding its entries in order.
    fn into_iter(self) -> Self::IntoIter {
        let order = self.order;
        IntoIter::new(self.table.into_nodes(), order)
    }
}

impl<'a, K, V, P, S> IntoIterator for &'a OrderedMap<K, V, P, S> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, P, S> IntoIterator for &'a mut OrderedMap<K, V, P, S> {
    type IntoIter = IterMut<'a, K, V>;
    type Item = (&'a K, &'a mut V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use ntest::timeout;

    use super::*;

    fn keys<K: Copy, V, P, S>(map: &OrderedMap<K, V, P, S>) -> Vec<K> {
        map.keys().copied().collect()
    }

    #[test]
    #[timeout(1000)]
    fn test_new_is_empty() {
        let map = OrderedMap::<u32, u32>::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert_eq!(map.first(), None);
        assert_eq!(map.last(), None);
        assert_eq!(map.order_mode(), OrderMode::Insertion);
    }

    #[test]
    #[timeout(1000)]
    fn test_insertion_order_ignores_updates() {
        let mut map = OrderedMap::new();
        map.insert('A', 1);
        map.insert('B', 2);
        map.insert('C', 3);
        assert_eq!(map.insert('B', 20), Some(2));

        assert_eq!(
            map.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>(),
            [('A', 1), ('B', 20), ('C', 3)]
        );
    }

    #[test]
    #[timeout(1000)]
    fn test_access_order_promotions() {
        let mut map = OrderedMap::access_ordered();
        for key in 1..=5 {
            map.insert(key, key * 10);
        }

        map.get(&1);
        assert_eq!(keys(&map), [2, 3, 4, 5, 1]);
        *map.get_mut(&2).unwrap() += 1;
        assert_eq!(keys(&map), [3, 4, 5, 1, 2]);
        map.get_key_value(&3);
        assert_eq!(keys(&map), [4, 5, 1, 2, 3]);
        assert_eq!(*map.get_or(&4, &0), 40);
        assert_eq!(keys(&map), [5, 1, 2, 3, 4]);
        assert_eq!(*map.get_or(&99, &0), 0);
        map.insert(5, 50);
        assert_eq!(keys(&map), [1, 2, 3, 4, 5]);
        assert_eq!(map.insert_if_absent(1, 0), Some(&10));
        assert_eq!(keys(&map), [2, 3, 4, 5, 1]);
        map.replace(&2, 21);
        assert_eq!(keys(&map), [3, 4, 5, 1, 2]);
    }

    #[test]
    #[timeout(1000)]
    fn test_peek_and_iteration_do_not_reorder() {
        let mut map = OrderedMap::access_ordered();
        map.insert(1, ());
        map.insert(2, ());

        let before = map.mod_count;
        map.peek(&1);
        map.peek_key_value(&1);
        map.contains_key(&1);
        map.contains_value(&());
        map.first();
        let _ = map.iter().count();
        let _ = map.values_mut().count();
        assert_eq!(map[&1], ());

        assert_eq!(keys(&map), [1, 2]);
        assert_eq!(map.mod_count, before);
    }

    #[test]
    #[timeout(1000)]
    fn test_replace_if_eq_promotes_only_on_match() {
        let mut map = OrderedMap::access_ordered();
        map.insert("a", 1);
        map.insert("b", 2);

        assert!(!map.replace_if_eq(&"a", &5, 10));
        assert_eq!(keys(&map), ["a", "b"]);
        assert_eq!(map.peek(&"a"), Some(&1));

        assert!(map.replace_if_eq(&"a", &1, 10));
        assert_eq!(keys(&map), ["b", "a"]);
        assert_eq!(map.peek(&"a"), Some(&10));

        assert!(!map.replace_if_eq(&"missing", &1, 1));
        assert_eq!(map.replace(&"missing", 1), None);
        assert_eq!(map.len(), 2);
    }

    #[test]
    #[timeout(1000)]
    fn test_mod_count_rules() {
        let mut map = OrderedMap::access_ordered();
        map.insert(1, 1);
        map.insert(2, 2);
        let count = map.mod_count;

        map.insert(2, 20);
        assert_eq!(map.mod_count, count, "Update of the tail is not structural");
        map.get(&2);
        assert_eq!(map.mod_count, count, "Promoting the tail is a no-op");

        map.get(&1);
        assert_eq!(map.mod_count, count + 1);
        map.insert(3, 3);
        assert_eq!(map.mod_count, count + 2);
        map.remove(&3);
        assert_eq!(map.mod_count, count + 3);
        map.remove(&3);
        assert_eq!(map.mod_count, count + 3);
        map.clear();
        assert_eq!(map.mod_count, count + 4);
        map.clear();
        assert_eq!(map.mod_count, count + 5);
    }

    #[test]
    #[timeout(1000)]
    fn test_insertion_mode_update_is_not_structural() {
        let mut map = OrderedMap::new();
        map.insert(1, 1);
        map.insert(2, 2);
        let count = map.mod_count;

        map.insert(1, 10);
        map.get(&1);
        map.replace(&1, 11);
        map.compute(1, |_, v| v.map(|v| v + 1));
        assert_eq!(map.mod_count, count);
        assert_eq!(keys(&map), [1, 2]);
    }

    #[test]
    #[timeout(1000)]
    fn test_insert_first_and_last() {
        let mut map = OrderedMap::new();
        map.insert_last(1, "a");
        map.insert_first(0, "z");
        map.insert_last(2, "b");
        assert_eq!(keys(&map), [0, 1, 2]);

        assert_eq!(map.insert_last(0, "Z"), Some("z"));
        assert_eq!(keys(&map), [1, 2, 0]);
        assert_eq!(map.insert_first(2, "B"), Some("b"));
        assert_eq!(keys(&map), [2, 1, 0]);
        assert_eq!(map.first(), Some((&2, &"B")));
        assert_eq!(map.last(), Some((&0, &"Z")));
    }

    #[test]
    #[timeout(1000)]
    fn test_insert_first_offers_new_entry_as_eldest() {
        let seen = RefCell::new(Vec::new());
        let mut map = OrderedMap::builder()
            .evict_when(|eldest| {
                seen.borrow_mut().push(*eldest.key());
                false
            })
            .build();

        map.insert(1, ());
        map.insert(2, ());
        map.insert_first(3, ());
        map.insert_first(2, ());

        assert_eq!(*seen.borrow(), [1, 1, 3]);
        assert_eq!(keys(&map), [2, 3, 1]);
    }

    #[test]
    #[timeout(1000)]
    fn test_compute_variants() {
        let mut map = OrderedMap::access_ordered();
        map.insert("a", 1);
        map.insert("b", 2);

        assert_eq!(map.compute("a", |_, v| v.map(|v| v * 10)), Some(&10));
        assert_eq!(keys(&map), ["b", "a"]);

        assert_eq!(map.compute("c", |_, _| None), None);
        assert!(!map.contains_key(&"c"));
        assert_eq!(map.compute("c", |_, v| Some(v.copied().unwrap_or(3))), Some(&3));
        assert_eq!(keys(&map), ["b", "a", "c"]);

        assert_eq!(map.compute_if_absent("b", |_| Some(99)), Some(&2));
        assert_eq!(keys(&map), ["a", "c", "b"]);
        assert_eq!(map.compute_if_absent("d", |_| None), None);
        assert_eq!(map.compute_if_absent("d", |k| Some(k.len() as i32)), Some(&1));

        assert_eq!(map.compute_if_present(&"zz", |_, _| Some(0)), None);
        assert_eq!(map.compute_if_present(&"a", |_, v| Some(v + 1)), Some(&11));
        assert_eq!(keys(&map), ["c", "b", "d", "a"]);
        assert_eq!(map.compute_if_present(&"a", |_, _| None), None);
        assert_eq!(keys(&map), ["c", "b", "d"]);

        assert_eq!(map.compute("c", |_, _| None), None);
        assert_eq!(keys(&map), ["b", "d"]);
    }

    #[test]
    #[timeout(1000)]
    fn test_merge() {
        let mut map = OrderedMap::access_ordered();
        assert_eq!(map.merge("a", 1, |old, new| Some(old + new)), Some(&1));
        map.insert("b", 2);
        assert_eq!(map.merge("a", 4, |old, new| Some(old + new)), Some(&5));
        assert_eq!(keys(&map), ["b", "a"]);
        assert_eq!(map.merge("b", 0, |_, _| None), None);
        assert_eq!(keys(&map), ["a"]);
    }

    #[test]
    #[timeout(1000)]
    fn test_remove_variants() {
        let mut map: OrderedMap<_, _> = (1..=5).map(|i| (i, i * 10)).collect();

        assert_eq!(map.remove(&3), Some(30));
        assert_eq!(map.remove(&3), None);
        assert_eq!(map.remove_entry(&1), Some((1, 10)));
        assert!(!map.remove_if_eq(&2, &0));
        assert!(map.remove_if_eq(&2, &20));
        assert_eq!(keys(&map), [4, 5]);
        assert_eq!(map.pop_last(), Some((5, 50)));
        assert_eq!(map.pop_first(), Some((4, 40)));
        assert_eq!(map.pop_first(), None);
        assert_eq!(map.pop_last(), None);
    }

    #[test]
    #[timeout(1000)]
    fn test_evict_runs_once_per_new_entry() {
        let calls = RefCell::new(0);
        let mut map = OrderedMap::builder()
            .evict_when(|eldest| {
                *calls.borrow_mut() += 1;
                eldest.map_len() > 2
            })
            .build();

        map.insert(1, ());
        map.insert(2, ());
        map.insert(2, ());
        map.insert_if_absent(2, ());
        map.replace(&2, ());
        assert_eq!(*calls.borrow(), 2);

        map.insert(3, ());
        assert_eq!(*calls.borrow(), 3);
        assert_eq!(keys(&map), [2, 3]);
    }

    #[test]
    #[timeout(1000)]
    fn test_policy_evicting_new_entry() {
        let mut map = OrderedMap::builder().evict_when(|_| true).build();
        assert_eq!(map.compute(1, |_, _| Some("a")), None);
        assert_eq!(map.compute_if_absent(1, |_| Some("a")), None);
        assert_eq!(map.merge(1, "a", |_, v| Some(v)), None);
        assert!(map.is_empty());
    }

    #[test]
    #[timeout(1000)]
    fn test_from_iter_does_not_evict_but_extend_does() {
        #[derive(Default)]
        struct AlwaysEvict;

        impl<K, V> EvictionPolicy<K, V> for AlwaysEvict {
            fn should_evict(&mut self, _: Eldest<'_, K, V>) -> bool {
                true
            }
        }

        let mut map: OrderedMap<u32, u32, AlwaysEvict> = (0..5).map(|i| (i, i)).collect();
        assert_eq!(map.len(), 5);
        map.extend([(5, 5)]);
        assert_eq!(map.len(), 5);
        assert_eq!(keys(&map), [1, 2, 3, 4, 5]);

        let mut map = OrderedMap::lru(NonZeroUsize::new(2).unwrap());
        map.extend((0..5).map(|i| (i, i)));
        assert_eq!(keys(&map), [3, 4]);
    }

    #[test]
    #[timeout(1000)]
    fn test_retain_counts_each_removal() {
        let mut map: OrderedMap<_, _> = (0..6).map(|i| (i, i)).collect();
        let count = map.mod_count;
        map.retain(|k, _| k % 3 == 0);
        assert_eq!(keys(&map), [0, 3]);
        assert_eq!(map.mod_count, count + 4);
    }

    #[test]
    #[timeout(1000)]
    fn test_shrink_to_fit_keeps_order() {
        let mut map: OrderedMap<_, _> = (0..10).map(|i| (i, i * 2)).collect();
        for key in [0, 2, 3, 7] {
            map.remove(&key);
        }
        map.get(&9);
        let count = map.mod_count;
        let expected: Vec<_> = map.iter().map(|(k, v)| (*k, *v)).collect();

        map.shrink_to_fit();

        assert!(map.mod_count != count);
        assert_eq!(map.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>(), expected);
        assert_eq!(map.table.nodes().slot_count(), map.len());
        for (key, value) in expected {
            assert_eq!(map.peek(&key), Some(&value));
        }

        let count = map.mod_count;
        map.shrink_to_fit();
        assert_eq!(map.mod_count, count);
    }

    #[test]
    #[timeout(1000)]
    fn test_equality_ignores_order() {
        let a: OrderedMap<_, _> = [(1, "a"), (2, "b")].into_iter().collect();
        let b: OrderedMap<_, _> = [(2, "b"), (1, "a")].into_iter().collect();
        let c: OrderedMap<_, _> = [(2, "b")].into_iter().collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    #[timeout(1000)]
    fn test_clone_is_independent() {
        let mut map = OrderedMap::access_ordered();
        map.insert(1, String::from("a"));
        map.insert(2, String::from("b"));

        let mut copy = map.clone();
        copy.get(&1);
        copy.insert(3, String::from("c"));

        assert_eq!(keys(&map), [1, 2]);
        assert_eq!(keys(&copy), [2, 1, 3]);
        assert_eq!(copy.order_mode(), OrderMode::Access);
    }

    #[test]
    #[timeout(1000)]
    fn test_debug_format() {
        let map: OrderedMap<_, _> = [(2, "b"), (1, "a")].into_iter().collect();
        assert_eq!(format!("{map:?}"), r#"{2: "b", 1: "a"}"#);
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn test_index_missing_key_panics() {
        let map = OrderedMap::<u32, u32>::new();
        let _value: u32 = map[&1];
    }

    #[test]
    #[timeout(1000)]
    fn test_borrowed_lookups() {
        let mut map = OrderedMap::new();
        map.insert(String::from("key"), 1);
        assert_eq!(map.peek("key"), Some(&1));
        assert_eq!(map.get("key"), Some(&1));
        assert!(map.contains_key("key"));
        assert_eq!(map["key"], 1);
        assert_eq!(map.remove("key"), Some(1));
    }

    #[test]
    #[timeout(1000)]
    fn test_lru_bound_does_not_reserve_storage() {
        let mut cache: LruMap<u32, u32> = OrderedMap::lru(NonZeroUsize::MAX);
        assert_eq!(cache.capacity(), 0);
        assert_eq!(cache.policy().max(), NonZeroUsize::MAX);

        for i in 0..100 {
            cache.insert(i, i);
        }
        assert_eq!(cache.len(), 100);
        assert_eq!(cache.first(), Some((&0, &0)));
    }

    #[test]
    #[timeout(1000)]
    fn test_every_map_has_its_own_id() {
        let a = OrderedMap::<u32, u32>::new();
        let b: OrderedMap<u32, u32> = Builder::new().build();
        let c = OrderedMap::<u32, u32>::default();
        let d = a.clone();
        let ids = [a.id, b.id, c.id, d.id];
        for (i, id) in ids.iter().enumerate() {
            assert!(!ids[i + 1..].contains(id), "Duplicate map id {id}");
        }
    }
}
