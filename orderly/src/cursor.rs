use tracing::trace;

use crate::{
    Error,
    OrderedMap,
    Result,
    arena::Ptr,
};

/// Lifecycle of a [`Cursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorState {
    /// Created and not yet advanced.
    Fresh,
    /// At least one call to `has_next` or `next` succeeded and entries remain.
    Advancing,
    /// The walk reached the end of the order.
    Exhausted,
    /// A concurrent modification was detected. Every further call fails.
    Invalidated,
}

/// A fail-fast cursor over the entries of an [`OrderedMap`], in order.
///
/// Unlike [`Iter`](crate::Iter), a cursor does not borrow the map. It is
/// handed the map on every call, which lets the caller remove the entry most
/// recently returned through [`remove`](Self::remove) mid-walk. Every call
/// first compares the map's modification count against the one the cursor
/// last saw: a structural change made through any other path (insertion of a
/// new key, removal, access-order promotion, `clear`, `shrink_to_fit`) makes
/// the call fail with [`Error::ConcurrentModification`] and leaves the cursor
/// [`Invalidated`](CursorState::Invalidated). Replacing the value of an
/// existing entry in place is not structural.
///
/// The check is a diagnostic for misuse, not a synchronization mechanism.
/// Handing a cursor any map other than the one that created it (a clone
/// included) fails with [`Error::ForeignMap`] and leaves the cursor untouched.
///
/// # Examples
///
/// ```rust
/// use orderly::{
///     CursorState,
///     Error,
///     OrderedMap,
/// };
///
/// let mut map = OrderedMap::new();
/// map.insert("a", 1);
/// map.insert("b", 2);
///
/// let mut cursor = map.cursor();
/// assert_eq!(cursor.state(), CursorState::Fresh);
/// assert_eq!(cursor.remove(&mut map), Err(Error::InvalidState));
///
/// assert_eq!(cursor.next(&map)?, Some((&"a", &1)));
/// assert_eq!(cursor.remove(&mut map)?, ("a", 1));
/// assert_eq!(cursor.remove(&mut map), Err(Error::InvalidState));
///
/// assert!(cursor.has_next(&map)?);
/// assert_eq!(cursor.next(&map)?, Some((&"b", &2)));
/// assert_eq!(cursor.state(), CursorState::Exhausted);
/// assert_eq!(cursor.next(&map)?, None);
/// # Ok::<(), Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Cursor {
    map_id: u64,
    next: Ptr,
    last_returned: Ptr,
    expected: usize,
    state: CursorState,
}

impl Cursor {
    pub(crate) fn new(map_id: u64, head: Ptr, mod_count: usize) -> Self {
        Cursor {
            map_id,
            next: head,
            last_returned: Ptr::null(),
            expected: mod_count,
            state: CursorState::Fresh,
        }
    }

    /// The state observed by the most recent call.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Returns `true` if a call to [`next`](Self::next) would yield an entry.
    pub fn has_next<K, V, P, S>(&mut self, map: &OrderedMap<K, V, P, S>) -> Result<bool> {
        self.check(map.id, map.mod_count)?;
        if self.next.is_null() {
            self.state = CursorState::Exhausted;
            return Ok(false);
        }
        self.state = CursorState::Advancing;
        Ok(true)
    }

    /// Advances to the next entry and returns it, or `None` at the end.
    pub fn next<'m, K, V, P, S>(
        &mut self,
        map: &'m OrderedMap<K, V, P, S>,
    ) -> Result<Option<(&'m K, &'m V)>> {
        self.check(map.id, map.mod_count)?;
        if self.next.is_null() {
            self.state = CursorState::Exhausted;
            return Ok(None);
        }

        let Some(node) = map.table.nodes().get(self.next) else {
            return Err(self.invalidate(map.mod_count));
        };
        self.last_returned = self.next;
        self.next = node.after;
        self.state = if self.next.is_null() {
            CursorState::Exhausted
        } else {
            CursorState::Advancing
        };
        Ok(Some((&node.key, &node.value)))
    }

    /// Removes the entry most recently returned by [`next`](Self::next) from
    /// the map and returns it.
    ///
    /// Fails with [`Error::InvalidState`] if `next` has not returned an entry
    /// since the cursor was created or since the last removal.
    pub fn remove<K, V, P, S>(&mut self, map: &mut OrderedMap<K, V, P, S>) -> Result<(K, V)> {
        self.check(map.id, map.mod_count)?;
        if self.last_returned.is_null() {
            return Err(Error::InvalidState);
        }
        if !map.table.nodes().is_occupied(self.last_returned) {
            return Err(self.invalidate(map.mod_count));
        }

        let entry = map.remove_ptr(std::mem::take(&mut self.last_returned));
        self.expected = map.mod_count;
        Ok(entry)
    }

    fn check(&mut self, map_id: u64, found: usize) -> Result<()> {
        if map_id != self.map_id {
            return Err(Error::ForeignMap);
        }
        if self.state == CursorState::Invalidated || found != self.expected {
            return Err(self.invalidate(found));
        }
        Ok(())
    }

    fn invalidate(&mut self, found: usize) -> Error {
        if self.state != CursorState::Invalidated {
            trace!(
                expected = self.expected,
                found,
                "cursor detected concurrent modification"
            );
            self.state = CursorState::Invalidated;
        }
        Error::ConcurrentModification {
            expected: self.expected,
            found,
        }
    }
}
