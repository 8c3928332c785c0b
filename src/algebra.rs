//! Equivalence-preserving rewrites over fence-producing graph nodes.
//!
//! The rules mirror the run-time behavior of [`crate::fence::Fence`]: an empty
//! fence is the null fence, duplicate timepoints merge by maximum, and joining
//! or awaiting a fence twice is the same as doing it once.

mod await_op;
mod create;
mod join;

pub use crate::algebra::{
    await_op::{DeduplicateFenceAwaitFences, ElideEmptyFenceAwait},
    create::{DeduplicateFenceCreateTimepoints, ElideEmptyFenceCreate},
    join::{DeduplicateFenceJoinFences, ElideEmptyFenceJoin},
};
use crate::{
    graph::{Graph, ValueId},
    rewrite::RewritePatternSet,
    types::IndexSet,
};
use rustc_hash::FxBuildHasher;

/// The fence rule set, in application order.
///
/// Pure: every call builds a fresh set and nothing is registered globally.
#[must_use]
pub fn fence_patterns() -> RewritePatternSet {
    let mut patterns = RewritePatternSet::new();
    patterns
        .add(ElideEmptyFenceCreate)
        .add(DeduplicateFenceCreateTimepoints)
        .add(ElideEmptyFenceJoin)
        .add(DeduplicateFenceJoinFences)
        .add(ElideEmptyFenceAwait)
        .add(DeduplicateFenceAwaitFences);
    patterns
}

/// Deduplicated fence operands with statically-null ones removed, keeping
/// first-seen order. `None` if nothing would change.
fn deduplicate_fence_operands(graph: &Graph, operands: &[ValueId]) -> Option<Vec<ValueId>> {
    let mut unique = IndexSet::with_capacity_and_hasher(operands.len(), FxBuildHasher);
    unique.extend(operands.iter().copied().filter(|&v| !graph.is_null(v)));
    (unique.len() != operands.len()).then(|| unique.into_iter().collect())
}
