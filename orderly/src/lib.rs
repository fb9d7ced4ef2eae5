#![doc = include_str!("../../README.md")]
#![deny(missing_docs)]
#![cfg_attr(all(doc, ENABLE_DOC_AUTO_CFG), feature(doc_auto_cfg))]

mod arena;
mod builder;
mod cursor;
mod error;
mod evict;
mod iter;
mod links;
mod map;
mod table;
mod views;

pub use builder::{
    Builder,
    OrderMode,
};
pub use cursor::{
    Cursor,
    CursorState,
};
pub use error::{
    Error,
    Result,
};
pub use evict::{
    Eldest,
    EvictFn,
    EvictionPolicy,
    MaxEntries,
    NeverEvict,
};
pub use iter::{
    IntoIter,
    Iter,
    IterMut,
    Keys,
    Values,
    ValuesMut,
};
pub use map::{
    LruMap,
    OrderedMap,
};
pub use views::{
    EntriesView,
    KeysView,
    ValuesView,
};

/// The hasher used when none is configured.
///
/// This is [`std::hash::RandomState`], or `ahash::RandomState` with the
/// `ahash` feature enabled.
#[cfg(not(feature = "ahash"))]
pub type RandomState = std::hash::RandomState;
/// The hasher used when none is configured.
///
/// This is [`std::hash::RandomState`], or `ahash::RandomState` with the
/// `ahash` feature enabled.
#[cfg(feature = "ahash")]
pub type RandomState = ahash::RandomState;
