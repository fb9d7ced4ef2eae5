use crate::{
    arena::{
        Arena,
        Ptr,
    },
    table::TableHooks,
};

/// The iteration order of a map: a doubly linked list threaded through the
/// arena via each node's `before`/`after` links.
///
/// `head` is the eldest entry and `tail` the youngest. Both ends are
/// null-terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LinkedOrder {
    head: Ptr,
    tail: Ptr,
}

impl Default for LinkedOrder {
    fn default() -> Self {
        LinkedOrder {
            head: Ptr::null(),
            tail: Ptr::null(),
        }
    }
}

impl LinkedOrder {
    pub(crate) fn head(&self) -> Ptr {
        self.head
    }

    pub(crate) fn tail(&self) -> Ptr {
        self.tail
    }

    pub(crate) fn clear(&mut self) {
        self.head = Ptr::null();
        self.tail = Ptr::null();
    }

    pub(crate) fn link_last<K, V>(&mut self, nodes: &mut Arena<K, V>, ptr: Ptr) {
        let last = self.tail;
        let node = &mut nodes[ptr];
        node.before = last;
        node.after = Ptr::null();

        self.tail = ptr;
        if last.is_null() {
            self.head = ptr;
        } else {
            nodes[last].after = ptr;
        }
    }

    pub(crate) fn link_first<K, V>(&mut self, nodes: &mut Arena<K, V>, ptr: Ptr) {
        let first = self.head;
        let node = &mut nodes[ptr];
        node.before = Ptr::null();
        node.after = first;

        self.head = ptr;
        if first.is_null() {
            self.tail = ptr;
        } else {
            nodes[first].before = ptr;
        }
    }

    pub(crate) fn unlink<K, V>(&mut self, nodes: &mut Arena<K, V>, ptr: Ptr) {
        let node = &mut nodes[ptr];
        let before = std::mem::take(&mut node.before);
        let after = std::mem::take(&mut node.after);

        if before.is_null() {
            self.head = after;
        } else {
            nodes[before].after = after;
        }

        if after.is_null() {
            self.tail = before;
        } else {
            nodes[after].before = before;
        }
    }

    /// Splices `ptr` out and re-attaches it at the tail. Returns `false` if it
    /// already was the tail.
    pub(crate) fn move_to_last<K, V>(&mut self, nodes: &mut Arena<K, V>, ptr: Ptr) -> bool {
        if self.tail == ptr {
            return false;
        }
        self.unlink(nodes, ptr);
        self.link_last(nodes, ptr);
        true
    }

    /// Splices `ptr` out and re-attaches it at the head. Returns `false` if it
    /// already was the head.
    pub(crate) fn move_to_first<K, V>(&mut self, nodes: &mut Arena<K, V>, ptr: Ptr) -> bool {
        if self.head == ptr {
            return false;
        }
        self.unlink(nodes, ptr);
        self.link_first(nodes, ptr);
        true
    }

    /// Points the neighbors of a relocated node (and `head`/`tail`) at its new
    /// slot.
    pub(crate) fn transfer<K, V>(&mut self, nodes: &mut Arena<K, V>, from: Ptr, to: Ptr) {
        let (before, after) = {
            let node = &nodes[to];
            (node.before, node.after)
        };

        if before.is_null() {
            debug_assert_eq!(self.head, from);
            self.head = to;
        } else {
            nodes[before].after = to;
        }

        if after.is_null() {
            debug_assert_eq!(self.tail, from);
            self.tail = to;
        } else {
            nodes[after].before = to;
        }
    }

    #[cfg(all(debug_assertions, feature = "internal-debugging"))]
    pub(crate) fn debug_validate<K, V>(&self, nodes: &Arena<K, V>) {
        if nodes.len() == 0 {
            assert!(self.head.is_null(), "Head of an empty list must be null");
            assert!(self.tail.is_null(), "Tail of an empty list must be null");
            return;
        }

        assert!(nodes[self.head].before.is_null(), "Head has a predecessor");
        assert!(nodes[self.tail].after.is_null(), "Tail has a successor");

        let mut visited = 0;
        let mut previous = Ptr::null();
        let mut ptr = self.head;
        while !ptr.is_null() {
            assert!(nodes.is_occupied(ptr), "List links a vacant slot: {ptr:?}");
            assert_eq!(
                nodes[ptr].before, previous,
                "Broken back link at {ptr:?}"
            );
            visited += 1;
            assert!(visited <= nodes.len(), "Cycle detected in linked order");
            previous = ptr;
            ptr = nodes[ptr].after;
        }

        assert_eq!(previous, self.tail, "Forward walk did not end at the tail");
        assert_eq!(visited, nodes.len(), "List does not cover every entry");
    }
}

impl<K, V> TableHooks<K, V> for LinkedOrder {
    fn node_created(&mut self, nodes: &mut Arena<K, V>, ptr: Ptr) {
        self.link_last(nodes, ptr);
    }

    fn node_replaced(&mut self, nodes: &mut Arena<K, V>, from: Ptr, to: Ptr) {
        self.transfer(nodes, from, to);
    }

    fn node_removed(&mut self, nodes: &mut Arena<K, V>, ptr: Ptr) {
        self.unlink(nodes, ptr);
    }
}

/// Hooks that link newly created entries at the head instead of the tail.
pub(crate) struct LinkFirst<'a>(pub(crate) &'a mut LinkedOrder);

impl<K, V> TableHooks<K, V> for LinkFirst<'_> {
    fn node_created(&mut self, nodes: &mut Arena<K, V>, ptr: Ptr) {
        self.0.link_first(nodes, ptr);
    }

    fn node_replaced(&mut self, nodes: &mut Arena<K, V>, from: Ptr, to: Ptr) {
        self.0.transfer(nodes, from, to);
    }

    fn node_removed(&mut self, nodes: &mut Arena<K, V>, ptr: Ptr) {
        self.0.unlink(nodes, ptr);
    }
}
