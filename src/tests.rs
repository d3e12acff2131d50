//! Cross-engine property-based tests: randomised mixes of insert/extract/merge/
//! remove/promote/demote, checked against a plain sorted-vec oracle after every
//! step. Seeded with `Xoshiro256PlusPlus` per the teacher's convention.
//!
//! Engine-local concrete-scenario tests (spec §8 Scenarios A-F) live next to each
//! engine in its own `#[cfg(test)] mod tests`; this module covers the
//! randomised-op-sequence and amortised-cost properties that need to range over
//! many seeds and, for the cost property, many engines at once.

#![cfg(test)]

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::cmp::Ordering;
use std::ptr::NonNull;

macro_rules! property_suite {
    ($mod_name:ident, $engine:ty, $link:ty) => {
        mod $mod_name {
            use super::*;
            use crate::heap::HeapEngine;
            use crate::stroll_intrusive_node;

            struct IntNode {
                link: $link,
                key: i32,
            }

            stroll_intrusive_node!(IntNode, $link, link);

            fn cmp(a: &IntNode, b: &IntNode) -> Ordering {
                a.key.cmp(&b.key)
            }

            fn leak(key: i32) -> NonNull<IntNode> {
                NonNull::from(Box::leak(Box::new(IntNode {
                    link: <$link>::default(),
                    key,
                })))
            }

            #[test]
            fn insert_then_extract_is_sorted_over_many_seeds() {
                for seed in 0..8u64 {
                    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
                    let mut heap: $engine = Default::default();
                    heap.setup();
                    let mut keys = Vec::new();
                    for _ in 0..64 {
                        let k: i32 = rng.gen_range(-1000..1000);
                        keys.push(k);
                        unsafe { heap.insert(leak(k), &mut cmp) };
                    }
                    let mut out = Vec::new();
                    while !heap.is_empty() {
                        out.push(unsafe { heap.extract(&mut cmp).as_ref().key });
                    }
                    keys.sort();
                    assert_eq!(out, keys, "seed {seed}");
                }
            }

            #[test]
            fn merge_then_extract_is_sorted_over_many_seeds() {
                for seed in 0..8u64 {
                    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
                    let mut a: $engine = Default::default();
                    let mut b: $engine = Default::default();
                    a.setup();
                    b.setup();
                    let mut keys = Vec::new();
                    for _ in 0..32 {
                        let k: i32 = rng.gen_range(-1000..1000);
                        keys.push(k);
                        unsafe { a.insert(leak(k), &mut cmp) };
                    }
                    for _ in 0..32 {
                        let k: i32 = rng.gen_range(-1000..1000);
                        keys.push(k);
                        unsafe { b.insert(leak(k), &mut cmp) };
                    }
                    a.merge(&mut b, &mut cmp);
                    assert!(b.is_empty());
                    let mut out = Vec::new();
                    while !a.is_empty() {
                        out.push(unsafe { a.extract(&mut cmp).as_ref().key });
                    }
                    keys.sort();
                    assert_eq!(out, keys, "seed {seed}");
                }
            }
        }
    };
}

macro_rules! addressable_property_suite {
    ($mod_name:ident, $engine:ty, $link:ty) => {
        mod $mod_name {
            use super::*;
            use crate::heap::{AddressableHeapEngine, HeapEngine};
            use crate::stroll_intrusive_node;

            struct IntNode {
                link: $link,
                key: i32,
            }

            stroll_intrusive_node!(IntNode, $link, link);

            fn cmp(a: &IntNode, b: &IntNode) -> Ordering {
                a.key.cmp(&b.key)
            }

            fn leak(key: i32) -> NonNull<IntNode> {
                NonNull::from(Box::leak(Box::new(IntNode {
                    link: <$link>::default(),
                    key,
                })))
            }

            #[test]
            fn random_mixed_ops_match_oracle() {
                for seed in 0..8u64 {
                    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
                    let mut heap: $engine = Default::default();
                    heap.setup();
                    let mut live: Vec<NonNull<IntNode>> = Vec::new();

                    for _ in 0..200 {
                        match rng.gen_range(0..5) {
                            0 | 1 => {
                                let k: i32 = rng.gen_range(-1000..1000);
                                let node = leak(k);
                                unsafe { heap.insert(node, &mut cmp) };
                                live.push(node);
                            }
                            2 if !live.is_empty() => {
                                let idx = rng.gen_range(0..live.len());
                                let node = live.remove(idx);
                                unsafe { heap.remove(node, &mut cmp) };
                            }
                            3 if !live.is_empty() => {
                                let idx = rng.gen_range(0..live.len());
                                let node = live[idx];
                                let delta = rng.gen_range(1..50);
                                unsafe {
                                    (*node.as_ptr()).key -= delta;
                                    heap.promote(node, &mut cmp);
                                }
                            }
                            4 if !live.is_empty() => {
                                let idx = rng.gen_range(0..live.len());
                                let node = live[idx];
                                let delta = rng.gen_range(1..50);
                                unsafe {
                                    (*node.as_ptr()).key += delta;
                                    heap.demote(node, &mut cmp);
                                }
                            }
                            _ => continue,
                        }

                        let mut expected: Vec<i32> =
                            live.iter().map(|n| unsafe { n.as_ref().key }).collect();
                        if expected.is_empty() {
                            assert!(heap.is_empty());
                            continue;
                        }
                        expected.sort();
                        let min_key = unsafe { heap.peek().as_ref().key };
                        assert_eq!(min_key, expected[0], "seed {seed}");
                    }

                    let mut out: Vec<i32> = Vec::new();
                    while !heap.is_empty() {
                        out.push(unsafe { heap.extract(&mut cmp).as_ref().key });
                    }
                    let mut expected: Vec<i32> =
                        live.iter().map(|n| unsafe { n.as_ref().key }).collect();
                    expected.sort();
                    assert_eq!(out, expected, "seed {seed}");
                }
            }
        }
    };
}

#[cfg(feature = "hpr")]
property_suite!(hpr_properties, crate::hpr::Hpr<IntNode>, crate::hpr::HprLink);
#[cfg(feature = "ppr")]
property_suite!(ppr_properties, crate::ppr::Ppr<IntNode>, crate::ppr::PprLink);
#[cfg(feature = "dpr")]
property_suite!(dpr_properties, crate::dpr::Dpr<IntNode>, crate::dpr::DprLink);
#[cfg(feature = "drp")]
property_suite!(drp_properties, crate::drp::Drp<IntNode>, crate::drp::DrpLink);
#[cfg(feature = "dbn")]
property_suite!(dbn_properties, crate::dbn::Dbn<IntNode>, crate::dbn::DbnLink);

#[cfg(feature = "ppr")]
addressable_property_suite!(ppr_addressable, crate::ppr::Ppr<IntNode>, crate::ppr::PprLink);
#[cfg(feature = "dpr")]
addressable_property_suite!(dpr_addressable, crate::dpr::Dpr<IntNode>, crate::dpr::DprLink);
#[cfg(feature = "drp")]
addressable_property_suite!(drp_addressable, crate::drp::Drp<IntNode>, crate::drp::DrpLink);
#[cfg(feature = "dbn")]
addressable_property_suite!(dbn_addressable, crate::dbn::Dbn<IntNode>, crate::dbn::DbnLink);

/// DRP's amortised-cost property (spec §8, last bullet): over any tested op
/// sequence of length N, the observed link/join operation count stays within a
/// constant factor of `N * log2(N)`.
#[cfg(all(feature = "drp", debug_assertions))]
#[test]
fn drp_amortised_cost_stays_bounded() {
    use crate::drp::{Drp, DrpLink};
    use crate::heap::{AddressableHeapEngine, HeapEngine};
    use crate::stroll_intrusive_node;

    struct IntNode {
        link: DrpLink,
        key: i32,
    }
    stroll_intrusive_node!(IntNode, DrpLink, link);

    fn cmp(a: &IntNode, b: &IntNode) -> Ordering {
        a.key.cmp(&b.key)
    }
    fn leak(key: i32) -> NonNull<IntNode> {
        NonNull::from(Box::leak(Box::new(IntNode {
            link: DrpLink::new(),
            key,
        })))
    }

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0xDEAD_BEEF);
    let mut heap: Drp<IntNode> = Drp::default();
    heap.setup();
    let mut live: Vec<NonNull<IntNode>> = Vec::new();

    let start = crate::op_count::current();
    let n = 2000usize;
    for _ in 0..n {
        match rng.gen_range(0..3) {
            0 => {
                let node = leak(rng.gen_range(-10000..10000));
                unsafe { heap.insert(node, &mut cmp) };
                live.push(node);
            }
            1 if !live.is_empty() => {
                let idx = rng.gen_range(0..live.len());
                let node = live[idx];
                unsafe {
                    (*node.as_ptr()).key -= rng.gen_range(1..100);
                    heap.promote(node, &mut cmp);
                }
            }
            _ if !live.is_empty() => {
                let idx = rng.gen_range(0..live.len());
                let node = live.remove(idx);
                unsafe { heap.remove(node, &mut cmp) };
            }
            _ => continue,
        }
    }

    let observed = (crate::op_count::current() - start) as f64;
    let log2_n = (n as f64).log2().max(1.0);
    let bound = 64.0 * n as f64 * log2_n;
    assert!(
        observed <= bound,
        "observed {observed} link/join operations over {n} ops exceeds {bound}"
    );
}

/// Exercises spec §8 Scenario F directly: inserting 1..=64 in ascending order
/// drives DRP's rank-bucket machinery through every bucket at least once.
#[cfg(feature = "drp")]
#[test]
fn drp_ascending_inserts_exercise_every_rank_bucket() {
    use crate::drp::{Drp, DrpLink};
    use crate::heap::HeapEngine;
    use crate::stroll_intrusive_node;

    struct IntNode {
        link: DrpLink,
        key: i32,
    }
    stroll_intrusive_node!(IntNode, DrpLink, link);

    fn cmp(a: &IntNode, b: &IntNode) -> Ordering {
        a.key.cmp(&b.key)
    }
    fn leak(key: i32) -> NonNull<IntNode> {
        NonNull::from(Box::leak(Box::new(IntNode {
            link: DrpLink::new(),
            key,
        })))
    }

    let mut heap: Drp<IntNode> = Drp::default();
    heap.setup();
    for k in 1..=64 {
        unsafe { heap.insert(leak(k), &mut cmp) };
    }
    let mut out = Vec::new();
    while !heap.is_empty() {
        out.push(unsafe { heap.extract(&mut cmp).as_ref().key });
    }
    assert_eq!(out, (1..=64).collect::<Vec<_>>());
}
