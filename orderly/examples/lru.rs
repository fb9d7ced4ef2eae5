use std::num::NonZeroUsize;

use orderly::OrderedMap;

fn main() {
    let mut cache = OrderedMap::lru(NonZeroUsize::new(300000).unwrap());
    for _ in 0..300 {
        for i in 0..100000 {
            cache.insert(i, i);
        }
        for i in (0..100000).step_by(3) {
            std::hint::black_box(cache.get(std::hint::black_box(&i)));
        }
        for i in 0..100000 {
            std::hint::black_box(cache.remove(std::hint::black_box(&i)));
        }
        cache.shrink_to_fit();
    }
    std::hint::black_box(cache);
}
