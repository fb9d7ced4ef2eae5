use orderly::{
    OrderMode,
    OrderedMap,
};

fn keys<K: Copy, V, P, S>(map: &OrderedMap<K, V, P, S>) -> Vec<K> {
    map.keys().copied().collect()
}

fn abc() -> OrderedMap<&'static str, i32> {
    let mut map = OrderedMap::access_ordered();
    map.insert("A", 1);
    map.insert("B", 2);
    map.insert("C", 3);
    map
}

#[test]
fn test_access_get_moves_to_back() {
    let mut map = abc();
    assert_eq!(map.get(&"A"), Some(&1));
    assert_eq!(keys(&map), vec!["B", "C", "A"]);
}

#[test]
fn test_access_most_recent_is_last() {
    let mut map = abc();
    for key in ["B", "A", "C", "B", "B", "A"] {
        map.get(&key);
        assert_eq!(map.last().map(|(k, _)| *k), Some(key));
    }
    assert_eq!(keys(&map), vec!["C", "B", "A"]);
}

#[test]
fn test_access_missing_key_does_not_reorder() {
    let mut map = abc();
    assert_eq!(map.get(&"Z"), None);
    assert_eq!(map.get_mut(&"Z"), None);
    assert_eq!(*map.get_or(&"Z", &0), 0);
    assert_eq!(keys(&map), vec!["A", "B", "C"]);
}

#[test]
fn test_access_insert_existing_moves() {
    let mut map = abc();
    assert_eq!(map.insert("A", 10), Some(1));
    assert_eq!(keys(&map), vec!["B", "C", "A"]);

    assert_eq!(map.insert_if_absent("B", 99), Some(&2));
    assert_eq!(keys(&map), vec!["C", "A", "B"]);
}

#[test]
fn test_access_new_key_appends() {
    let mut map = abc();
    map.get(&"A");
    map.insert("D", 4);
    assert_eq!(keys(&map), vec!["B", "C", "A", "D"]);
}

#[test]
fn test_access_get_mut_and_get_or() {
    let mut map = abc();
    *map.get_mut(&"B").unwrap() += 100;
    assert_eq!(keys(&map), vec!["A", "C", "B"]);
    assert_eq!(*map.get_or(&"A", &0), 1);
    assert_eq!(keys(&map), vec!["C", "B", "A"]);
    assert_eq!(map.peek(&"B"), Some(&102));
}

#[test]
fn test_access_replace_rules() {
    let mut map = abc();

    assert_eq!(map.replace(&"A", 11), Some(1));
    assert_eq!(keys(&map), vec!["B", "C", "A"]);

    assert!(!map.replace_if_eq(&"B", &0, 22));
    assert_eq!(keys(&map), vec!["B", "C", "A"]);

    assert!(map.replace_if_eq(&"B", &2, 22));
    assert_eq!(keys(&map), vec!["C", "A", "B"]);
}

#[test]
fn test_access_compute_family() {
    let mut map = abc();

    map.compute("A", |_, v| v.map(|v| v + 1));
    assert_eq!(keys(&map), vec!["B", "C", "A"]);

    map.compute_if_absent("B", |_| Some(0));
    assert_eq!(keys(&map), vec!["C", "A", "B"]);

    map.compute_if_present(&"C", |_, v| Some(v * 2));
    assert_eq!(keys(&map), vec!["A", "B", "C"]);

    map.merge("A", 5, |old, new| Some(old + new));
    assert_eq!(keys(&map), vec!["B", "C", "A"]);
    assert_eq!(map.peek(&"A"), Some(&7));

    map.merge("B", 0, |_, _| None);
    assert_eq!(keys(&map), vec!["C", "A"]);
}

#[test]
fn test_access_peek_and_views_do_not_reorder() {
    let mut map = abc();
    map.peek(&"A");
    map.peek_key_value(&"A");
    assert!(map.contains_key(&"A"));
    assert!(map.contains_value(&1));
    assert_eq!(map[&"A"], 1);
    assert_eq!(map.keys_view().len(), 3);
    assert!(map.entries_view().contains(&"A", &1));
    for _ in map.values_view() {}
    for _ in map.iter_mut() {}

    assert_eq!(keys(&map), vec!["A", "B", "C"]);
}

#[test]
fn test_access_insert_first_and_last_move_in_either_mode() {
    for mode in [OrderMode::Insertion, OrderMode::Access] {
        let mut map = OrderedMap::with_order(mode);
        map.insert(1, ());
        map.insert(2, ());
        map.insert(3, ());

        map.insert_first(3, ());
        assert_eq!(keys(&map), vec![3, 1, 2]);
        map.insert_last(3, ());
        assert_eq!(keys(&map), vec![1, 2, 3]);
        map.insert_first(0, ());
        assert_eq!(keys(&map), vec![0, 1, 2, 3]);
    }
}

#[test]
fn test_access_clone_keeps_mode_and_order() {
    let mut map = abc();
    map.get(&"B");
    let copy = map.clone();
    assert_eq!(copy.order_mode(), OrderMode::Access);
    assert_eq!(keys(&copy), vec!["A", "C", "B"]);
    assert_eq!(copy, map);
}
