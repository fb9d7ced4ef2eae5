#![no_main]
use std::num::NonZeroUsize;

use fuzz_lib::MapOperation;
use indexmap::IndexMap;
use libfuzzer_sys::fuzz_target;
use orderly::{
    LruMap,
    OrderMode,
    OrderedMap,
};

struct Model {
    entries: IndexMap<u8, u8>,
    access: bool,
    max: usize,
}

impl Model {
    fn touch(&mut self, k: u8) {
        if self.access {
            self.to_back(k);
        }
    }

    fn to_back(&mut self, k: u8) {
        if let Some(index) = self.entries.get_index_of(&k) {
            let last = self.entries.len() - 1;
            self.entries.move_index(index, last);
        }
    }

    fn to_front(&mut self, k: u8) {
        if let Some(index) = self.entries.get_index_of(&k) {
            self.entries.move_index(index, 0);
        }
    }

    fn evict(&mut self) {
        if self.entries.len() > self.max {
            self.entries.shift_remove_index(0);
        }
    }

    fn put(&mut self, k: u8, v: u8) -> Option<u8> {
        let previous = self.entries.insert(k, v);
        if previous.is_some() {
            self.touch(k);
        } else {
            self.evict();
        }
        previous
    }
}

fuzz_target!(|data: (u8, bool, Vec<MapOperation>)| {
    let (size, access, operations) = data;
    let size = size.max(1) as usize;

    let mut map: LruMap<u8, u8> = OrderedMap::builder()
        .order(if access {
            OrderMode::Access
        } else {
            OrderMode::Insertion
        })
        .max_entries(NonZeroUsize::new(size).unwrap())
        .build();
    let mut model = Model {
        entries: IndexMap::new(),
        access,
        max: size,
    };

    for operation in operations {
        match operation {
            MapOperation::Insert(k, v) => {
                assert_eq!(map.insert(k, v), model.put(k, v), "insert {k} {v}");
            }
            MapOperation::InsertFirst(k, v) => {
                let existed = model.entries.insert(k, v).is_some();
                model.to_front(k);
                if !existed {
                    model.evict();
                }
                map.insert_first(k, v);
            }
            MapOperation::InsertLast(k, v) => {
                let existed = model.entries.insert(k, v).is_some();
                model.to_back(k);
                if !existed {
                    model.evict();
                }
                map.insert_last(k, v);
            }
            MapOperation::InsertIfAbsent(k, v) => {
                let existing = model.entries.get(&k).copied();
                match existing {
                    Some(_) => model.touch(k),
                    None => {
                        model.put(k, v);
                    }
                }
                assert_eq!(map.insert_if_absent(k, v).copied(), existing);
            }
            MapOperation::Get(k) => {
                let expected = model.entries.get(&k).copied();
                model.touch(k);
                assert_eq!(map.get(&k).copied(), expected, "get {k}");
            }
            MapOperation::Peek(k) => {
                assert_eq!(map.peek(&k).copied(), model.entries.get(&k).copied());
            }
            MapOperation::Remove(k) => {
                assert_eq!(map.remove(&k), model.entries.shift_remove(&k));
            }
            MapOperation::RemoveIfEq(k, v) => {
                let matches = model.entries.get(&k) == Some(&v);
                if matches {
                    model.entries.shift_remove(&k);
                }
                assert_eq!(map.remove_if_eq(&k, &v), matches);
            }
            MapOperation::Compute(k, v) => {
                let remap = |old: Option<u8>| match old {
                    Some(old) if old == v => None,
                    _ => Some(v),
                };
                match model.entries.get(&k).copied() {
                    Some(old) => match remap(Some(old)) {
                        Some(new) => {
                            model.put(k, new);
                        }
                        None => {
                            model.entries.shift_remove(&k);
                        }
                    },
                    None => {
                        model.put(k, v);
                    }
                }
                let computed = map.compute(k, |_, old| remap(old.copied())).copied();
                assert_eq!(computed, model.entries.get(&k).copied(), "compute {k} {v}");
            }
            MapOperation::Merge(k, v) => {
                let combine = |old: u8, new: u8| {
                    let sum = old.wrapping_add(new);
                    (sum % 5 != 0).then_some(sum)
                };
                match model.entries.get(&k).copied() {
                    Some(old) => match combine(old, v) {
                        Some(sum) => {
                            model.put(k, sum);
                        }
                        None => {
                            model.entries.shift_remove(&k);
                        }
                    },
                    None => {
                        model.put(k, v);
                    }
                }
                let merged = map.merge(k, v, |old, new| combine(*old, new)).copied();
                assert_eq!(merged, model.entries.get(&k).copied(), "merge {k} {v}");
            }
            MapOperation::PopFirst => {
                assert_eq!(map.pop_first(), model.entries.shift_remove_index(0));
            }
            MapOperation::PopLast => {
                assert_eq!(map.pop_last(), model.entries.pop());
            }
            MapOperation::Clear => {
                map.clear();
                model.entries.clear();
            }
            MapOperation::Retain(modulus) => {
                let modulus = modulus.max(1);
                map.retain(|k, _| k % modulus != 0);
                model.entries.retain(|k, _| k % modulus != 0);
            }
            MapOperation::ShrinkToFit => {
                let before = map.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>();
                map.shrink_to_fit();
                assert!(map.iter().map(|(k, v)| (*k, *v)).eq(before));
            }
            MapOperation::CursorRemove(modulus) => {
                let modulus = modulus.max(1);
                let mut cursor = map.cursor();
                while let Some((k, _)) = cursor.next(&map).unwrap() {
                    if *k % modulus == 0 {
                        cursor.remove(&mut map).unwrap();
                    }
                }
                model.entries.retain(|k, _| k % modulus != 0);
            }
        }

        map.debug_validate();
        assert!(map.len() <= size, "Map bound exceeded: {map:#?}");
        assert!(
            map.iter().eq(model.entries.iter()),
            "Order diverged: {map:#?} vs {:#?}",
            model.entries
        );
    }
});
