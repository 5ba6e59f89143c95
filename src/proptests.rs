use super::*;

use crate::node::Ptr;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

/// Check ordering, terminal and accounting invariants of `t`.
fn validate_tree(t: &TernaryTree<'_>) {
    // (node, exclusive lower bound, exclusive upper bound) for the byte at
    // this depth; `equal` links reset the bounds.
    let mut stack: Vec<(Ptr, Option<u8>, Option<u8>)> = Vec::new();
    if !t.root.is_null() {
        stack.push((t.root, None, None));
    }

    let mut reachable = 0usize;
    let mut terminals = 0usize;
    while let Some((ptr, lo, hi)) = stack.pop() {
        assert!(!ptr.is_null(), "NULL pointer inside tree");
        reachable += 1;

        let node = t.nodes.get(ptr);
        if let Some(lo) = lo {
            assert!(node.byte > lo, "byte {} not above bound {lo}", node.byte);
        }
        if let Some(hi) = hi {
            assert!(node.byte < hi, "byte {} not below bound {hi}", node.byte);
        }
        assert!(!node.is_dead(), "dead node must have been freed");

        if node.is_terminal() {
            assert!(node.less.is_null(), "nothing sorts below a terminal");
            assert!(
                t.values.get(node.data_slot()).is_some(),
                "reachable terminal must hold a payload"
            );
            terminals += 1;
        } else if node.equal.is_null() {
            assert!(
                !node.less.is_null() && !node.greater.is_null(),
                "sentinel must keep both siblings"
            );
        } else {
            stack.push((node.equal, None, None));
        }

        if !node.less.is_null() {
            stack.push((node.less, lo, Some(node.byte)));
        }
        if !node.greater.is_null() {
            stack.push((node.greater, Some(node.byte), hi));
        }
    }

    assert_eq!(reachable, t.node_count(), "unreachable live nodes");
    assert_eq!(terminals, t.len(), "terminal count must match len");
    assert_eq!(t.values.values().count(), t.len(), "payload count must match len");
}

fn model_prefix(m: &BTreeSet<Vec<u8>>, prefix: &[u8], max: usize) -> Vec<Vec<u8>> {
    m.range(prefix.to_vec()..)
        .take_while(|k| k.starts_with(prefix))
        .take(max)
        .cloned()
        .collect()
}

#[derive(Clone, Debug)]
enum Op {
    Insert(Vec<u8>, StoreMode),
    Remove(Vec<u8>),
    Get(Vec<u8>),
    Prefix(Vec<u8>, usize),
    Clear,
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A small alphabet makes shared prefixes and sibling chains common.
    prop::collection::vec(b'a'..=b'e', 0..=5)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        40 => (key.clone(), any::<StoreMode>()).prop_map(|(k, m)| Op::Insert(k, m)),
        30 => key.clone().prop_map(Op::Remove),
        15 => key.clone().prop_map(Op::Get),
        14 => (prop::collection::vec(b'a'..=b'e', 0..=3), 0usize..8)
            .prop_map(|(p, n)| Op::Prefix(p, n)),
        1 => Just(Op::Clear),
    ];
    prop::collection::vec(op, 0..=400)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let mut t = TernaryTree::new();
        let mut m: BTreeSet<Vec<u8>> = BTreeSet::new();

        for op in &ops {
            match op {
                Op::Insert(key, mode) => {
                    let nodes = t.node_count();
                    let existed = m.contains(key);
                    let got = t.insert(key, *mode).unwrap().to_vec();
                    prop_assert_eq!(&got, key);
                    if existed {
                        prop_assert_eq!(t.node_count(), nodes);
                    } else {
                        m.insert(key.clone());
                    }
                }
                Op::Remove(key) => {
                    if m.remove(key) {
                        prop_assert!(t.remove(key));
                    } else {
                        let before = t.nodes.clone();
                        let root = t.root;
                        prop_assert!(!t.remove(key));
                        prop_assert!(t.nodes == before, "absent removal changed the tree");
                        prop_assert_eq!(t.root, root);
                    }
                }
                Op::Get(key) => {
                    let got = t.get(key).map(|p| p.to_vec());
                    prop_assert_eq!(got.as_ref(), m.get(key));
                }
                Op::Prefix(prefix, max) => {
                    let got: Vec<Vec<u8>> =
                        t.prefix_search(prefix, *max).map(|p| p.to_vec()).collect();
                    prop_assert_eq!(got, model_prefix(&m, prefix, *max));
                }
                Op::Clear => {
                    t.clear();
                    m.clear();
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t);
        let got: Vec<Vec<u8>> = t.iter().map(|p| p.to_vec()).collect();
        let expected: Vec<Vec<u8>> = m.iter().cloned().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_remove_spares_prefixes_and_extensions(
        keys in prop::collection::btree_set(key_strategy(), 1..40),
        pick in any::<prop::sample::Index>(),
    ) {
        let keys: Vec<Vec<u8>> = keys.into_iter().collect();
        let victim = pick.get(&keys).clone();

        let mut t = TernaryTree::new();
        for k in &keys {
            t.insert_owned(k).unwrap();
        }
        prop_assert!(t.remove(&victim));
        prop_assert!(!t.contains_key(&victim));
        for k in keys.iter().filter(|k| **k != victim) {
            prop_assert!(t.contains_key(k), "lost {:?} removing {:?}", k, victim);
        }
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

const SMALL_SET: [&[u8]; 7] = [b"", b"a", b"b", b"c", b"aa", b"ab", b"ba"];

#[test]
fn exhaustive_insert_order_small_set() {
    let expected: Vec<Vec<u8>> = {
        let m: BTreeSet<Vec<u8>> = SMALL_SET.iter().map(|k| k.to_vec()).collect();
        m.into_iter().collect()
    };

    for_each_permutation(&SMALL_SET, |perm| {
        let mut t = TernaryTree::new();
        for k in perm {
            t.insert(k, StoreMode::Reference).unwrap();
        }

        validate_tree(&t);
        let got: Vec<Vec<u8>> = t.iter().map(|p| p.to_vec()).collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    // Insert in a fixed order, then remove in all permutations.
    let mut base = TernaryTree::new();
    for k in SMALL_SET {
        base.insert(k, StoreMode::Copy).unwrap();
    }

    for_each_permutation(&SMALL_SET, |perm| {
        let mut t = base.clone();
        let mut m: BTreeSet<&[u8]> = SMALL_SET.iter().copied().collect();

        for k in perm {
            assert!(t.remove(k), "failed to remove {k:?}");
            m.remove(k);
            assert_eq!(t.len(), m.len());
            for rest in &m {
                assert!(t.contains_key(rest), "lost {rest:?} after removing {k:?}");
            }
            validate_tree(&t);
        }
        assert!(t.is_empty());
        assert!(t.root.is_null());
        assert_eq!(t.node_count(), 0);
    });
}

#[test]
fn randomized_words_with_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let mut rng = StdRng::seed_from_u64(0x7357);
    let words: Vec<Vec<u8>> = (0..2_000)
        .map(|_| {
            let len = rng.gen_range(1..=10);
            (0..len).map(|_| rng.gen_range(b'a'..=b'h')).collect()
        })
        .collect();

    let mut t = TernaryTree::new();
    let mut m: BTreeSet<Vec<u8>> = BTreeSet::new();
    for w in &words {
        t.insert(w, StoreMode::Reference).unwrap();
        m.insert(w.clone());
    }
    validate_tree(&t);
    assert_eq!(t.len(), m.len());

    for w in words.iter().step_by(3) {
        assert_eq!(t.remove(w), m.remove(w));
    }
    validate_tree(&t);

    for prefix in [&b""[..], b"a", b"bc", b"hhh"] {
        let got: Vec<Vec<u8>> = t.prefix_search(prefix, 25).map(|p| p.to_vec()).collect();
        assert_eq!(got, model_prefix(&m, prefix, 25));
    }

    let nodes = t.node_count();
    assert_eq!(t.clear(), nodes);
    assert!(t.is_empty());
}
