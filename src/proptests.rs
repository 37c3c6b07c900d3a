use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeSet;

const UNIVERSE: u64 = 1 << 10;

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 5)]
    Insert(#[proptest(strategy = "0..UNIVERSE")] u64),
    #[proptest(weight = 3)]
    Delete(#[proptest(strategy = "0..UNIVERSE")] u64),
    Member(#[proptest(strategy = "0..UNIVERSE")] u64),
    Successor(#[proptest(strategy = "0..UNIVERSE")] u64),
    Predecessor(#[proptest(strategy = "0..UNIVERSE")] u64),
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=1500), seed in any::<u64>()) {
        let mut s = VebSet::with_config(UNIVERSE, Config::default().with_seed(seed)).unwrap();
        let mut m: BTreeSet<u64> = BTreeSet::new();

        for op in ops {
            match op {
                Op::Insert(x) => {
                    prop_assert_eq!(s.insert(x).unwrap(), m.insert(x));
                }
                Op::Delete(x) => {
                    prop_assert_eq!(s.delete(x).unwrap(), m.remove(&x));
                }
                Op::Member(x) => {
                    prop_assert_eq!(s.member(x).unwrap(), m.contains(&x));
                }
                Op::Successor(x) => {
                    prop_assert_eq!(s.successor(x).unwrap(), m.range(x + 1..).next().copied());
                }
                Op::Predecessor(x) => {
                    prop_assert_eq!(s.predecessor(x).unwrap(), m.range(..x).next_back().copied());
                }
            }
            prop_assert_eq!(s.len(), m.len());
            prop_assert_eq!(s.minimum(), m.first().copied());
            prop_assert_eq!(s.maximum(), m.last().copied());
        }

        prop_assert_eq!(s.root.validate(), m.len());
        let expected: Vec<u64> = m.into_iter().collect();
        prop_assert_eq!(s.enumerate(), expected.clone());
        prop_assert_eq!(s.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn prop_any_universe(
        bits in 1u32..=40,
        raw in prop::collection::vec(any::<u64>(), 0..200),
        drop_every in 2usize..5,
    ) {
        let universe = 1u64 << bits;
        let mut s = VebSet::new(universe).unwrap();
        let mut m: BTreeSet<u64> = BTreeSet::new();

        for &r in &raw {
            let x = r % universe;
            prop_assert_eq!(s.insert(x).unwrap(), m.insert(x));
        }
        for &r in raw.iter().step_by(drop_every) {
            let x = r % universe;
            prop_assert_eq!(s.delete(x).unwrap(), m.remove(&x));
        }

        s.root.validate();
        let expected: Vec<u64> = m.iter().copied().collect();
        prop_assert_eq!(s.enumerate(), expected.clone());

        // Adjacent stored values link to each other in both directions.
        for pair in expected.windows(2) {
            prop_assert_eq!(s.successor(pair[0]).unwrap(), Some(pair[1]));
            prop_assert_eq!(s.predecessor(pair[1]).unwrap(), Some(pair[0]));
        }
        if let (Some(&first), Some(&last)) = (expected.first(), expected.last()) {
            prop_assert_eq!(s.predecessor(first).unwrap(), None);
            prop_assert_eq!(s.successor(last).unwrap(), None);
        }
    }

    #[test]
    fn prop_cluster_map_matches_btreemap(
        ops in prop::collection::vec((any::<bool>(), 0u64..64, any::<u64>()), 0..=2000),
        a in 1u64..cluster_map::HASH_PRIME,
        b in 0u64..cluster_map::HASH_PRIME,
    ) {
        use std::collections::BTreeMap;

        let mut map: ClusterMap<u64> = ClusterMap::with_params(4, HashParams { a, b }).unwrap();
        let mut reference: BTreeMap<u64, u64> = BTreeMap::new();
        for (is_insert, key, value) in ops {
            if is_insert {
                prop_assert_eq!(map.insert(key, value).unwrap(), reference.insert(key, value));
            } else {
                prop_assert_eq!(map.remove(key).unwrap(), reference.remove(&key));
            }
            prop_assert_eq!(map.len(), reference.len());
            prop_assert!(map.len() * 4 <= map.capacity() * 3);
        }
        for (key, value) in &reference {
            prop_assert_eq!(map.get(*key), Some(value));
        }
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let values: Vec<u64> = vec![0, 1, 6, 7, 9, 15];

    for_each_permutation(&values, |perm| {
        let mut s = VebSet::new(16).unwrap();
        for x in perm {
            assert!(s.insert(x).unwrap());
            s.root.validate();
        }
        assert_eq!(s.enumerate(), values);
        assert_eq!(s.to_string(), "Min: 0, C[0]: 1, C[1]: 6, 7, C[2]: 9, C[3]: 15");
    });
}

#[test]
fn exhaustive_delete_order_small_set() {
    let values: Vec<u64> = vec![0, 1, 6, 7, 9, 15];

    let mut base = VebSet::new(16).unwrap();
    for &x in &values {
        base.insert(x).unwrap();
    }

    for_each_permutation(&values, |perm| {
        let mut s = base.clone();
        let mut m: BTreeSet<u64> = values.iter().copied().collect();

        for x in perm {
            assert_eq!(s.delete(x).unwrap(), m.remove(&x));
            assert_eq!(s.root.validate(), m.len());
            assert_eq!(s.enumerate(), m.iter().copied().collect::<Vec<_>>());
        }
        assert!(s.is_empty());
        assert_eq!(s.node_count(), 1);
    });
}

#[test]
fn exhaustive_small_universe_subsets() {
    // Every subset of a 16-element universe, built and then drained.
    for mask in 0u32..(1 << 16) {
        let members: Vec<u64> = (0..16u64).filter(|&i| mask & (1u32 << i) != 0).collect();
        let mut s = VebSet::new(16).unwrap();
        for &x in &members {
            s.insert(x).unwrap();
        }
        for x in 0..16u64 {
            assert_eq!(s.member(x).unwrap(), members.contains(&x));
            let succ = members.iter().copied().find(|&v| v > x);
            let pred = members.iter().rev().copied().find(|&v| v < x);
            assert_eq!(s.successor(x).unwrap(), succ, "successor({x}) of {members:?}");
            assert_eq!(s.predecessor(x).unwrap(), pred, "predecessor({x}) of {members:?}");
        }
        for &x in members.iter().rev() {
            s.delete(x).unwrap();
        }
        assert_eq!(s.node_count(), 1);
    }
}
