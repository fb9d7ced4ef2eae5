use std::{
    num::NonZeroU32,
    ops::{
        Index,
        IndexMut,
    },
};

/// Stable handle to an entry slot in the [`Arena`].
///
/// Handles are non-generational: once the entry behind a handle is freed the
/// slot may be handed out again for an unrelated entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub(crate) struct Ptr(NonZeroU32);

impl std::fmt::Debug for Ptr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "Ptr(null)")
        } else {
            write!(f, "Ptr({})", self.0.get() - 1)
        }
    }
}

impl Default for Ptr {
    fn default() -> Self {
        Ptr::null()
    }
}

impl Ptr {
    pub(crate) const fn null() -> Self {
        Ptr(NonZeroU32::MAX)
    }

    pub(crate) fn is_null(self) -> bool {
        self == Ptr::null()
    }

    pub(crate) fn unchecked_from(index: usize) -> Self {
        debug_assert!(
            index < u32::MAX as usize - 1,
            "Index too large to fit in Ptr: {index}"
        );
        match NonZeroU32::new((index as u32).wrapping_add(1)) {
            Some(raw) => Ptr(raw),
            None => Ptr::null(),
        }
    }

    pub(crate) fn unchecked_get(self) -> usize {
        self.0.get() as usize - 1
    }

    pub(crate) fn get(self) -> Option<usize> {
        if self.is_null() {
            None
        } else {
            Some(self.unchecked_get())
        }
    }

    pub(crate) fn optional(self) -> Option<Ptr> {
        if self.is_null() { None } else { Some(self) }
    }
}

/// A stored entry. The hash table indexes it by `hash`, the linked order
/// threads it through `before`/`after`.
#[derive(Debug, Clone)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: u64,
    pub(crate) before: Ptr,
    pub(crate) after: Ptr,
}

#[derive(Debug, Clone)]
pub(crate) enum Slot<K, V> {
    Occupied(Node<K, V>),
    Vacant { next_free: Ptr },
}

#[derive(Debug, Clone)]
pub(crate) struct Arena<K, V> {
    slots: Vec<Slot<K, V>>,
    free_head: Ptr,
    len: usize,
}

impl<K, V> Default for Arena<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Arena<K, V> {
    pub(crate) fn new() -> Self {
        Arena {
            slots: Vec::new(),
            free_head: Ptr::null(),
            len: 0,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        assert!(capacity < u32::MAX as usize - 1, "Capacity too large");
        Arena {
            slots: Vec::with_capacity(capacity),
            free_head: Ptr::null(),
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Number of slots, occupied or not.
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        let vacant = self.slots.len() - self.len;
        self.slots.reserve(additional.saturating_sub(vacant));
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free_head = Ptr::null();
        self.len = 0;
    }

    pub(crate) fn alloc(&mut self, key: K, value: V, hash: u64) -> Ptr {
        let node = Node {
            key,
            value,
            hash,
            before: Ptr::null(),
            after: Ptr::null(),
        };
        self.len += 1;

        if let Some(index) = self.free_head.get() {
            let ptr = self.free_head;
            let previous = std::mem::replace(&mut self.slots[index], Slot::Occupied(node));
            self.free_head = match previous {
                Slot::Vacant { next_free } => next_free,
                Slot::Occupied(_) => unreachable!("Free list points at an occupied slot: {ptr:?}"),
            };
            ptr
        } else {
            let ptr = Ptr::unchecked_from(self.slots.len());
            self.slots.push(Slot::Occupied(node));
            ptr
        }
    }

    pub(crate) fn is_occupied(&self, ptr: Ptr) -> bool {
        matches!(
            ptr.get().and_then(|index| self.slots.get(index)),
            Some(Slot::Occupied(_))
        )
    }

    pub(crate) fn get(&self, ptr: Ptr) -> Option<&Node<K, V>> {
        match self.slots.get(ptr.get()?)? {
            Slot::Occupied(node) => Some(node),
            Slot::Vacant { .. } => None,
        }
    }

    #[track_caller]
    pub(crate) fn free(&mut self, ptr: Ptr) -> Node<K, V> {
        assert!(self.is_occupied(ptr), "Pointer to free must be occupied");
        let previous = std::mem::replace(
            &mut self.slots[ptr.unchecked_get()],
            Slot::Vacant {
                next_free: self.free_head,
            },
        );
        self.free_head = ptr;
        self.len -= 1;

        match previous {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("Checked occupied above"),
        }
    }

    /// Moves the node at `from` into the vacant slot `to`.
    ///
    /// This leaves the free list stale. It may only be used by a compaction
    /// pass that finishes with [`Arena::finish_compaction`] before any other
    /// allocation happens.
    pub(crate) fn relocate(&mut self, from: Ptr, to: Ptr) {
        debug_assert!(self.is_occupied(from), "Relocation source must be occupied");
        debug_assert!(!self.is_occupied(to), "Relocation target must be vacant");
        let node = std::mem::replace(
            &mut self.slots[from.unchecked_get()],
            Slot::Vacant {
                next_free: Ptr::null(),
            },
        );
        self.slots[to.unchecked_get()] = node;
    }

    /// Drops the trailing vacant slots left behind by relocation. Every slot
    /// below `len` must be occupied.
    pub(crate) fn finish_compaction(&mut self) {
        debug_assert!(
            self.slots[..self.len]
                .iter()
                .all(|slot| matches!(slot, Slot::Occupied(_))),
            "Compaction left a hole below the live length"
        );
        self.slots.truncate(self.len);
        self.slots.shrink_to_fit();
        self.free_head = Ptr::null();
    }

    /// Raw access for [`crate::iter::IterMut`], which hands out disjoint
    /// `&mut` borrows into distinct slots.
    pub(crate) fn slots_ptr(&mut self) -> *mut Slot<K, V> {
        self.slots.as_mut_ptr()
    }
}

impl<K, V> Index<Ptr> for Arena<K, V> {
    type Output = Node<K, V>;

    #[track_caller]
    fn index(&self, index: Ptr) -> &Self::Output {
        match &self.slots[index.unchecked_get()] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("Attempted to access data of free slot"),
        }
    }
}

impl<K, V> IndexMut<Ptr> for Arena<K, V> {
    #[track_caller]
    fn index_mut(&mut self, index: Ptr) -> &mut Self::Output {
        match &mut self.slots[index.unchecked_get()] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("Attempted to access data of free slot"),
        }
    }
}
