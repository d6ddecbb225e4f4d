use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;
use std::fmt;

/// Recompute every height from scratch and compare against the cached one,
/// and check balance and ordering, independently of [`node::validate`].
fn validate_tree<K: Ord + Copy + fmt::Debug, V>(t: &AvlTree<K, V>) {
    fn walk<K: Ord + Copy + fmt::Debug, V>(node: Option<&Node<K, V>>, keys: &mut Vec<K>) -> u8 {
        let Some(node) = node else {
            return 0;
        };
        let lh = walk(node.left(), keys);
        keys.push(*node.key());
        let rh = walk(node.right(), keys);

        assert_eq!(
            node.height(),
            lh.max(rh) + 1,
            "stored height of {:?} must match children",
            node.key()
        );
        assert_eq!(node.balance_factor(), i16::from(lh) - i16::from(rh));
        assert!(
            (-1..=1).contains(&node.balance_factor()),
            "node {:?} out of balance",
            node.key()
        );
        node.height()
    }

    let mut keys = Vec::with_capacity(t.len());
    walk(t.root(), &mut keys);
    assert!(
        keys.windows(2).all(|w| w[0] < w[1]),
        "in-order keys must be strictly increasing"
    );
    assert_eq!(keys.len(), t.len(), "reachable node count must match len");
    assert_eq!(t.validate(), Ok(()));
}

#[derive(Arbitrary, Clone, Debug)]
enum Op {
    #[proptest(weight = 50)]
    Insert(#[proptest(strategy = "-256i32..256")] i32, u64),
    #[proptest(weight = 25)]
    Remove(#[proptest(strategy = "-256i32..256")] i32),
    #[proptest(weight = 24)]
    Get(#[proptest(strategy = "-256i32..256")] i32),
    #[proptest(weight = 1)]
    Clear,
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=2000)) {
        let mut t: AvlTree<i32, u64> = AvlTree::new();
        let mut m: BTreeMap<i32, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let old_t = t.insert(key, value);
                    let old_m = m.insert(key, value);
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Remove(key) => {
                    let old_t = t.remove(&key);
                    let old_m = m.remove(&key);
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(&key), m.get(&key));
                }
                Op::Clear => {
                    t.clear();
                    m.clear();
                }
            }

            prop_assert_eq!(t.len(), m.len());
            prop_assert_eq!(t.validate(), Ok(()));
        }

        validate_tree(&t);
        let got: Vec<(i32, u64)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(i32, u64)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_insert_then_search(keys in prop::collection::vec(any::<i32>(), 0..200), k in any::<i32>(), v in any::<u64>()) {
        let mut t: AvlTree<i32, u64> = keys.iter().map(|&k| (k, 0)).collect();
        t.insert(k, v);
        prop_assert_eq!(t.get(&k), Some(&v));
        validate_tree(&t);
    }

    #[test]
    fn prop_reinsert_keeps_count(keys in prop::collection::btree_set(-1000i32..1000, 1..200), v in any::<u64>()) {
        let mut t: AvlTree<i32, u64> = keys.iter().map(|&k| (k, 0)).collect();
        let len = t.len();
        let height = t.height();
        for &k in &keys {
            prop_assert_eq!(t.insert(k, v), Some(0));
        }
        prop_assert_eq!(t.len(), len);
        prop_assert_eq!(t.height(), height);
        prop_assert!(t.values().all(|x| *x == v));
    }

    #[test]
    fn prop_remove_absent_is_noop(keys in prop::collection::btree_set(0i32..500, 0..200), probe in 500i32..1000) {
        let mut t: AvlTree<i32, ()> = keys.iter().map(|&k| (k, ())).collect();
        let before = t.to_string();
        prop_assert_eq!(t.remove(&probe), None);
        prop_assert_eq!(t.to_string(), before);
        prop_assert_eq!(t.len(), keys.len());
    }

    #[test]
    fn prop_remove_then_search(keys in prop::collection::btree_set(any::<i16>(), 1..200), pick in any::<prop::sample::Index>()) {
        let keys: Vec<i16> = keys.into_iter().collect();
        let victim = keys[pick.index(keys.len())];
        let mut t: AvlTree<i16, i16> = keys.iter().map(|&k| (k, k)).collect();
        prop_assert_eq!(t.remove(&victim), Some(victim));
        prop_assert!(t.get(&victim).is_none());
        prop_assert_eq!(t.len(), keys.len() - 1);
        validate_tree(&t);
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
    let keys: Vec<u8> = vec![1, 2, 3, 4, 5, 6, 7];

    for_each_permutation(&keys, |perm| {
        let mut t: AvlTree<u8, u64> = AvlTree::new();
        let mut m: BTreeMap<u8, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            assert_eq!(t.insert(k, v), m.insert(k, v));
            validate_tree(&t);
        }

        // Seven keys never need more than four levels.
        assert!(t.height() <= 4);
        let got: Vec<(u8, u64)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(u8, u64)> = m.into_iter().collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys: Vec<u8> = vec![1, 2, 3, 4, 5, 6, 7];

    // Insert in a fixed order, then remove in all permutations.
    let mut base_tree: AvlTree<u8, u64> = AvlTree::new();
    let mut base_map: BTreeMap<u8, u64> = BTreeMap::new();
    for (i, &k) in keys.iter().enumerate() {
        let v = i as u64;
        assert_eq!(base_tree.insert(k, v), base_map.insert(k, v));
    }

    for_each_permutation(&keys, |perm| {
        let mut t = base_tree.clone();
        let mut m = base_map.clone();

        for k in perm {
            assert_eq!(t.remove(&k), m.remove(&k));
            assert_eq!(t.len(), m.len());
            validate_tree(&t);
        }
        assert_eq!(t.len(), 0);
        assert!(t.root().is_none());
    });
}
