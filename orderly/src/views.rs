use std::{
    borrow::Borrow,
    hash::{
        BuildHasher,
        Hash,
    },
};

use crate::{
    Cursor,
    Iter,
    Keys,
    OrderedMap,
    Values,
};

/// A live, read-only view of the keys of an [`OrderedMap`].
///
/// Views do not copy anything: they answer from the map itself, and iterate
/// in the map's current order without reordering it. They cannot insert. To
/// remove while walking, use the view's [`cursor`](Self::cursor) once the view
/// is dropped, or [`OrderedMap::retain`].
///
/// # Examples
///
/// ```rust
/// use orderly::OrderedMap;
///
/// let mut map = OrderedMap::new();
/// map.insert("x", 1);
/// map.insert("y", 2);
///
/// let keys = map.keys_view();
/// assert_eq!(keys.len(), 2);
/// assert!(keys.contains(&"x"));
/// assert_eq!(keys.iter().copied().collect::<Vec<_>>(), ["x", "y"]);
/// ```
pub struct KeysView<'a, K, V, P, S> {
    pub(crate) map: &'a OrderedMap<K, V, P, S>,
}

/// A live, read-only view of the values of an [`OrderedMap`].
///
/// See [`KeysView`] for the semantics shared by all views.
pub struct ValuesView<'a, K, V, P, S> {
    pub(crate) map: &'a OrderedMap<K, V, P, S>,
}

/// A live, read-only view of the entries of an [`OrderedMap`].
///
/// See [`KeysView`] for the semantics shared by all views.
pub struct EntriesView<'a, K, V, P, S> {
    pub(crate) map: &'a OrderedMap<K, V, P, S>,
}

macro_rules! view_common {
    ($view:ident, $iter:ty, $item:ty, $method:ident) => {
        impl<'a, K, V, P, S> $view<'a, K, V, P, S> {
            /// Number of entries in the underlying map.
            pub fn len(&self) -> usize {
                self.map.len()
            }

            /// Returns `true` if the underlying map is empty.
            pub fn is_empty(&self) -> bool {
                self.map.is_empty()
            }

            /// Iterates in the map's order without reordering it.
            pub fn iter(&self) -> $iter {
                self.map.$method()
            }

            /// Returns a fail-fast [`Cursor`] over the underlying map.
            pub fn cursor(&self) -> Cursor {
                self.map.cursor()
            }
        }

        impl<K, V, P, S> Clone for $view<'_, K, V, P, S> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<K, V, P, S> Copy for $view<'_, K, V, P, S> {}

        impl<'a, K, V, P, S> IntoIterator for $view<'a, K, V, P, S> {
            type IntoIter = $iter;
            type Item = $item;

            fn into_iter(self) -> Self::IntoIter {
                self.iter()
            }
        }

        impl<'a, K, V, P, S> IntoIterator for &$view<'a, K, V, P, S> {
            type IntoIter = $iter;
            type Item = $item;

            fn into_iter(self) -> Self::IntoIter {
                self.iter()
            }
        }

        impl<K: std::fmt::Debug, V: std::fmt::Debug, P, S> std::fmt::Debug
            for $view<'_, K, V, P, S>
        {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_list().entries(self.iter()).finish()
            }
        }
    };
}

view_common!(KeysView, Keys<'a, K, V>, &'a K, keys);
view_common!(ValuesView, Values<'a, K, V>, &'a V, values);
view_common!(EntriesView, Iter<'a, K, V>, (&'a K, &'a V), iter);

impl<K: Hash + Eq, V, P, S: BuildHasher> KeysView<'_, K, V, P, S> {
    /// Returns `true` if the map holds `key`.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }
}

impl<K, V: PartialEq, P, S> ValuesView<'_, K, V, P, S> {
    /// Returns `true` if any entry holds `value`.
    pub fn contains(&self, value: &V) -> bool {
        self.map.contains_value(value)
    }
}

impl<K: Hash + Eq, V: PartialEq, P, S: BuildHasher> EntriesView<'_, K, V, P, S> {
    /// Returns `true` if the map maps `key` to `value`.
    pub fn contains<Q>(&self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.peek(key) == Some(value)
    }
}
