//! Union-find over "these two are the same thing" pairs.
//!
//! Used to collapse connections between signals and bridges between wires.

use std::collections::BTreeMap;

/// Map every merged item to the best item of its equivalence class.
///
/// `prefer(a, b)` returns true when `a` should win over `b`. Items that are
/// already the best of their class do not appear as keys.
pub fn canonicalize<T, I, F>(pairs: I, mut prefer: F) -> BTreeMap<T, T>
where
    T: Copy + Ord,
    I: IntoIterator<Item = (T, T)>,
    F: FnMut(&T, &T) -> bool,
{
    let mut better: BTreeMap<T, T> = BTreeMap::new();

    for (a, b) in pairs {
        let ra = find(&better, a);
        let rb = find(&better, b);
        if ra == rb {
            continue;
        }
        if prefer(&ra, &rb) {
            better.insert(rb, ra);
        } else {
            better.insert(ra, rb);
        }
    }

    better
        .keys()
        .map(|&k| (k, find(&better, k)))
        .collect()
}

fn find<T: Copy + Ord>(better: &BTreeMap<T, T>, mut x: T) -> T {
    while let Some(&next) = better.get(&x) {
        x = next;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn chain_collapses_to_smallest() {
        let best = canonicalize([(3, 4), (4, 5), (2, 5)], |a, b| a < b);
        assert_eq!(best.get(&3), Some(&2));
        assert_eq!(best.get(&4), Some(&2));
        assert_eq!(best.get(&5), Some(&2));
        assert_eq!(best.get(&2), None);
    }

    #[test]
    fn cycles_and_self_pairs_are_harmless() {
        let best = canonicalize([(1, 1), (1, 2), (2, 1)], |a, b| a < b);
        assert_eq!(best.len(), 1);
        assert_eq!(best.get(&2), Some(&1));
    }

    proptest! {
        #[test]
        fn representative_is_class_minimum(pairs in prop::collection::vec((0u8..24, 0u8..24), 0..40)) {
            let best = canonicalize(pairs.iter().copied(), |a, b| a < b);
            for (a, b) in &pairs {
                let ra = best.get(a).copied().unwrap_or(*a);
                let rb = best.get(b).copied().unwrap_or(*b);
                prop_assert_eq!(ra, rb);
                prop_assert!(ra <= *a && ra <= *b);
            }
            for (k, v) in &best {
                prop_assert!(!best.contains_key(v));
                prop_assert!(v < k);
            }
        }
    }
}
