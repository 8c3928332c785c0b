use crate::{
    graph::{Op, OpKind, TimepointOperand, ValueId},
    rewrite::{PatternRewriter, Rewrite, RewritePattern},
    types::{IndexMap, IndexSet},
};
use rustc_hash::FxBuildHasher;

/// Replaces a fence creation with no timepoints by the null fence.
#[derive(Debug, Default, Copy, Clone)]
pub struct ElideEmptyFenceCreate;

impl RewritePattern for ElideEmptyFenceCreate {
    fn name(&self) -> &'static str {
        "elide-empty-fence-create"
    }

    fn root_kind(&self) -> OpKind {
        OpKind::FenceCreate
    }

    fn match_and_rewrite(&self, root: ValueId, rewriter: &mut PatternRewriter<'_>) -> Rewrite {
        let Some(Op::FenceCreate(timepoints)) = rewriter.graph().op(root) else {
            return Rewrite::NoMatch;
        };
        if !timepoints.is_empty() {
            return Rewrite::NoMatch;
        }
        rewriter.replace_op(root, Op::Null);
        Rewrite::Applied
    }
}

/// Merges timepoints sharing a semaphore, keeping the maximum value.
///
/// Distinct semaphores keep the relative order of their first appearance.
#[derive(Debug, Default, Copy, Clone)]
pub struct DeduplicateFenceCreateTimepoints;

impl RewritePattern for DeduplicateFenceCreateTimepoints {
    fn name(&self) -> &'static str {
        "deduplicate-fence-create-timepoints"
    }

    fn root_kind(&self) -> OpKind {
        OpKind::FenceCreate
    }

    fn match_and_rewrite(&self, root: ValueId, rewriter: &mut PatternRewriter<'_>) -> Rewrite {
        let Some(Op::FenceCreate(timepoints)) = rewriter.graph().op(root) else {
            return Rewrite::NoMatch;
        };
        if timepoints.len() <= 1 {
            return Rewrite::NoMatch;
        }

        // Keyed on semaphore; identical value operands collapse as well.
        let mut by_semaphore: IndexMap<ValueId, IndexSet<ValueId>> =
            IndexMap::with_capacity_and_hasher(timepoints.len(), FxBuildHasher);
        for &TimepointOperand {
            semaphore,
            min_value,
        } in timepoints
        {
            by_semaphore
                .entry(semaphore)
                .or_default()
                .insert(min_value);
        }
        if by_semaphore.len() == timepoints.len() {
            return Rewrite::NoMatch;
        }

        let merged = by_semaphore
            .into_iter()
            .map(|(semaphore, values)| {
                let min_value = match values.len() {
                    1 => values[0],
                    _ => rewriter.create_or_fold_range_max(values.into_iter().collect()),
                };
                TimepointOperand {
                    semaphore,
                    min_value,
                }
            })
            .collect();
        rewriter.replace_op(root, Op::FenceCreate(merged));
        Rewrite::Applied
    }
}
