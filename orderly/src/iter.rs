use std::{
    iter::FusedIterator,
    marker::PhantomData,
};

use crate::{
    arena::{
        Arena,
        Node,
        Ptr,
        Slot,
    },
    links::LinkedOrder,
};

/// An iterator over the entries of an [`OrderedMap`](crate::OrderedMap), in
/// order.
///
/// Created by [`OrderedMap::iter`](crate::OrderedMap::iter). Iteration never
/// reorders the map.
pub struct Iter<'a, K, V> {
    nodes: &'a Arena<K, V>,
    head: Ptr,
    tail: Ptr,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(nodes: &'a Arena<K, V>, order: LinkedOrder) -> Self {
        Iter {
            nodes,
            head: order.head(),
            tail: order.tail(),
            remaining: nodes.len(),
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            nodes: self.nodes,
            head: self.head,
            tail: self.tail,
            remaining: self.remaining,
        }
    }
}

impl<K: std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.nodes[self.head];
        self.head = node.after;
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.nodes[self.tail];
        self.tail = node.before;
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// A mutable iterator over the entries of an
/// [`OrderedMap`](crate::OrderedMap), in order.
///
/// Created by [`OrderedMap::iter_mut`](crate::OrderedMap::iter_mut).
///
/// # Examples
///
/// ```rust
/// use orderly::OrderedMap;
///
/// let mut map = OrderedMap::new();
/// map.insert("a", 1);
/// map.insert("b", 2);
///
/// for (_, value) in map.iter_mut() {
///     *value *= 10;
/// }
///
/// assert_eq!(map.peek(&"a"), Some(&10));
/// assert_eq!(map.peek(&"b"), Some(&20));
/// ```
pub struct IterMut<'a, K, V> {
    slots: *mut Slot<K, V>,
    head: Ptr,
    tail: Ptr,
    remaining: usize,
    _nodes: PhantomData<&'a mut Arena<K, V>>,
}

// SAFETY: IterMut behaves like `&'a mut Arena<K, V>`.
unsafe impl<K: Send, V: Send> Send for IterMut<'_, K, V> {}
// SAFETY: IterMut behaves like `&'a mut Arena<K, V>`.
unsafe impl<K: Sync, V: Sync> Sync for IterMut<'_, K, V> {}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(nodes: &'a mut Arena<K, V>, order: LinkedOrder) -> Self {
        IterMut {
            remaining: nodes.len(),
            slots: nodes.slots_ptr(),
            head: order.head(),
            tail: order.tail(),
            _nodes: PhantomData,
        }
    }

    /// # Safety
    ///
    /// `ptr` must be a linked entry that has not been yielded yet.
    unsafe fn node(&mut self, ptr: Ptr) -> &'a mut Node<K, V> {
        // SAFETY: The caller guarantees `ptr` is an occupied slot of the arena
        // we exclusively borrow for 'a. Each linked entry is yielded once, so no
        // two returned references alias.
        match unsafe { &mut *self.slots.add(ptr.unchecked_get()) } {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("Linked order refers to a free slot"),
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        // SAFETY: `remaining` counts the linked entries between `head` and
        // `tail` that have not been yielded from either end.
        let node = unsafe { self.node(self.head) };
        self.head = node.after;
        self.remaining -= 1;
        Some((&node.key, &mut node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        // SAFETY: See `next`.
        let node = unsafe { self.node(self.tail) };
        self.tail = node.before;
        self.remaining -= 1;
        Some((&node.key, &mut node.value))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

impl<K, V> std::fmt::Debug for IterMut<'_, K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IterMut")
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

/// An owning iterator over the entries of an
/// [`OrderedMap`](crate::OrderedMap), in order.
///
/// Created by the [`IntoIterator`] implementation of the map.
pub struct IntoIter<K, V> {
    nodes: Arena<K, V>,
    head: Ptr,
    tail: Ptr,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(nodes: Arena<K, V>, order: LinkedOrder) -> Self {
        IntoIter {
            nodes,
            head: order.head(),
            tail: order.tail(),
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.nodes.len() == 0 {
            return None;
        }
        let node = self.nodes.free(self.head);
        self.head = node.after;
        Some((node.key, node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.nodes.len(), Some(self.nodes.len()))
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.nodes.len() == 0 {
            return None;
        }
        let node = self.nodes.free(self.tail);
        self.tail = node.before;
        Some((node.key, node.value))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<K, V> std::fmt::Debug for IntoIter<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntoIter")
            .field("remaining", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

/// An iterator over the keys of an [`OrderedMap`](crate::OrderedMap), in
/// order.
#[derive(Debug)]
pub struct Keys<'a, K, V> {
    pub(crate) inner: Iter<'a, K, V>,
}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Keys {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(key, _)| key)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// An iterator over the values of an [`OrderedMap`](crate::OrderedMap), in
/// order.
#[derive(Debug)]
pub struct Values<'a, K, V> {
    pub(crate) inner: Iter<'a, K, V>,
}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Values {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, value)| value)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<K, V> FusedIterator for Values<'_, K, V> {}

/// A mutable iterator over the values of an
/// [`OrderedMap`](crate::OrderedMap), in order.
#[derive(Debug)]
pub struct ValuesMut<'a, K, V> {
    pub(crate) inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for ValuesMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, value)| value)
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}

impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

#[cfg(test)]
mod tests {
    use ntest::timeout;

    use crate::OrderedMap;

    fn sample() -> OrderedMap<u32, String> {
        (1..=5).map(|i| (i, i.to_string())).collect()
    }

    #[test]
    #[timeout(1000)]
    fn test_iter_forward_and_back() {
        let map = sample();
        let forward: Vec<_> = map.iter().map(|(k, _)| *k).collect();
        let backward: Vec<_> = map.iter().rev().map(|(k, _)| *k).collect();
        assert_eq!(forward, [1, 2, 3, 4, 5]);
        assert_eq!(backward, [5, 4, 3, 2, 1]);
    }

    #[test]
    #[timeout(1000)]
    fn test_iter_meets_in_the_middle() {
        let map = sample();
        let mut iter = map.iter();
        assert_eq!(iter.len(), 5);
        assert_eq!(iter.next().map(|(k, _)| *k), Some(1));
        assert_eq!(iter.next_back().map(|(k, _)| *k), Some(5));
        assert_eq!(iter.next().map(|(k, _)| *k), Some(2));
        assert_eq!(iter.next_back().map(|(k, _)| *k), Some(4));
        assert_eq!(iter.len(), 1);
        assert_eq!(iter.next().map(|(k, _)| *k), Some(3));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
        assert_eq!(iter.next(), None);
    }

    #[test]
    #[timeout(1000)]
    fn test_iter_mut_both_ends() {
        let mut map = sample();
        let mut iter = map.iter_mut();
        iter.next().unwrap().1.push('a');
        iter.next_back().unwrap().1.push('z');
        for (_, value) in iter {
            value.push('-');
        }

        assert_eq!(
            map.values().cloned().collect::<Vec<_>>(),
            ["1a", "2-", "3-", "4-", "5z"]
        );
    }

    #[test]
    #[timeout(1000)]
    fn test_into_iter_both_ends() {
        let mut iter = sample().into_iter();
        assert_eq!(iter.next(), Some((1, "1".to_string())));
        assert_eq!(iter.next_back(), Some((5, "5".to_string())));
        assert_eq!(iter.len(), 3);
        assert_eq!(
            iter.collect::<Vec<_>>(),
            [(2, "2".to_string()), (3, "3".to_string()), (4, "4".to_string())]
        );
    }

    #[test]
    #[timeout(1000)]
    fn test_into_iter_partial_drop() {
        let mut iter = sample().into_iter();
        iter.next();
        drop(iter);
    }

    #[test]
    #[timeout(1000)]
    fn test_keys_values() {
        let mut map = sample();
        map.remove(&3);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), [1, 2, 4, 5]);
        assert_eq!(map.keys().rev().copied().collect::<Vec<_>>(), [5, 4, 2, 1]);
        assert_eq!(map.values().len(), 4);

        for value in map.values_mut().rev() {
            value.insert(0, '#');
        }
        assert_eq!(
            map.values().cloned().collect::<Vec<_>>(),
            ["#1", "#2", "#4", "#5"]
        );
    }

    #[test]
    #[timeout(1000)]
    fn test_borrowing_into_iterator() {
        let mut map = sample();
        for (_, value) in &mut map {
            value.clear();
        }
        let mut count = 0;
        for (_, value) in &map {
            assert!(value.is_empty());
            count += 1;
        }
        assert_eq!(count, 5);
    }

    #[test]
    #[timeout(1000)]
    fn test_empty_iterators() {
        let mut map = OrderedMap::<u32, u32>::new();
        assert_eq!(map.iter().next(), None);
        assert_eq!(map.iter_mut().next_back(), None);
        assert_eq!(map.keys().next(), None);
        assert_eq!(map.into_iter().next(), None);
    }
}
