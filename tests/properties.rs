#![allow(missing_docs)]
#![cfg(not(feature = "loom"))]

//! Property-based tests for fence merging.
//!
//! Uses proptest to generate insertion sequences and verify that the occupied
//! set does not depend on how timepoints arrive.

mod common;

use common::{CountingAllocator, Fence, semaphores, timepoints};
use proptest::prelude::*;
use std::collections::BTreeMap;

const SEMAPHORES: u32 = 6;

/// Strategy for `(semaphore index, value)` insertion sequences.
fn insertions() -> impl Strategy<Value = Vec<(usize, u64)>> {
    prop::collection::vec((0..SEMAPHORES as usize, any::<u64>()), 0..32)
}

/// Expected contents: maximum value per semaphore id.
fn expected(sequence: &[(usize, u64)]) -> BTreeMap<u32, u64> {
    let mut expected = BTreeMap::new();
    for &(idx, value) in sequence {
        let id = u32::try_from(idx).unwrap() + 1;
        let slot = expected.entry(id).or_insert(value);
        *slot = (*slot).max(value);
    }
    expected
}

fn build(sequence: &[(usize, u64)]) -> (Vec<common::TestSemaphore>, Fence) {
    let (_, sems) = semaphores(SEMAPHORES);
    let mut fence = Fence::create(SEMAPHORES as usize, CountingAllocator::default()).unwrap();
    for &(idx, value) in sequence {
        fence.insert(&sems[idx], value).unwrap();
    }
    (sems, fence)
}

proptest! {
    /// Each distinct semaphore appears once, holding the maximum inserted value.
    #[test]
    fn insert_keeps_maximum_per_semaphore(sequence in insertions()) {
        let (_, fence) = build(&sequence);
        let actual: BTreeMap<_, _> = timepoints(&fence).into_iter().collect();
        prop_assert_eq!(fence.len(), actual.len());
        prop_assert_eq!(actual, expected(&sequence));
    }

    /// Reordering insertions changes at most the occupancy order.
    #[test]
    fn insert_is_commutative(sequence in insertions(), seed in any::<u64>()) {
        let mut shuffled = sequence.clone();
        // Deterministic rotation plus reversal gives a distinct permutation.
        if !shuffled.is_empty() {
            let len = shuffled.len();
            shuffled.rotate_left(usize::try_from(seed % len as u64).unwrap());
            shuffled.reverse();
        }
        let (_, lhs) = build(&sequence);
        let (_, rhs) = build(&shuffled);
        let lhs: BTreeMap<_, _> = timepoints(&lhs).into_iter().collect();
        let rhs: BTreeMap<_, _> = timepoints(&rhs).into_iter().collect();
        prop_assert_eq!(lhs, rhs);
    }

    /// Occupancy order is the order of first appearance.
    #[test]
    fn occupancy_follows_first_appearance(sequence in insertions()) {
        let (_, fence) = build(&sequence);
        let mut first_seen = Vec::new();
        for &(idx, _) in &sequence {
            let id = u32::try_from(idx).unwrap() + 1;
            if !first_seen.contains(&id) {
                first_seen.push(id);
            }
        }
        let order: Vec<_> = timepoints(&fence).into_iter().map(|(id, _)| id).collect();
        prop_assert_eq!(order, first_seen);
    }

    /// Joining split halves equals inserting the whole sequence.
    #[test]
    fn join_matches_sequential_insert(sequence in insertions(), split in 0usize..32) {
        let (_, sems) = semaphores(SEMAPHORES);
        let split = split.min(sequence.len());
        let allocator = CountingAllocator::default();
        let mut halves = Vec::new();
        for part in [&sequence[..split], &sequence[split..]] {
            let mut fence = Fence::create(SEMAPHORES as usize, allocator.clone()).unwrap();
            for &(idx, value) in part {
                fence.insert(&sems[idx], value).unwrap();
            }
            halves.push(fence);
        }
        let joined = Fence::join(halves.iter().map(Some), allocator.clone()).unwrap();
        let mut whole = Fence::create(SEMAPHORES as usize, allocator.clone()).unwrap();
        for &(idx, value) in &sequence {
            whole.insert(&sems[idx], value).unwrap();
        }
        match joined {
            None => prop_assert!(sequence.is_empty()),
            Some(joined) => prop_assert_eq!(timepoints(&joined), timepoints(&whole)),
        }
        drop(halves);
        drop(whole);
        prop_assert_eq!(allocator.live(), 0);
        prop_assert!(sems.iter().all(|s| s.references() == 1));
    }
}
