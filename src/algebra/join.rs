use crate::{
    algebra::deduplicate_fence_operands,
    graph::{Op, OpKind, ValueId},
    rewrite::{PatternRewriter, Rewrite, RewritePattern},
};

/// Replaces a join of no fences by the null fence.
#[derive(Debug, Default, Copy, Clone)]
pub struct ElideEmptyFenceJoin;

impl RewritePattern for ElideEmptyFenceJoin {
    fn name(&self) -> &'static str {
        "elide-empty-fence-join"
    }

    fn root_kind(&self) -> OpKind {
        OpKind::FenceJoin
    }

    fn match_and_rewrite(&self, root: ValueId, rewriter: &mut PatternRewriter<'_>) -> Rewrite {
        let Some(Op::FenceJoin(fences)) = rewriter.graph().op(root) else {
            return Rewrite::NoMatch;
        };
        if !fences.is_empty() {
            return Rewrite::NoMatch;
        }
        rewriter.replace_op(root, Op::Null);
        Rewrite::Applied
    }
}

/// Drops null and repeated operands of a join.
#[derive(Debug, Default, Copy, Clone)]
pub struct DeduplicateFenceJoinFences;

impl RewritePattern for DeduplicateFenceJoinFences {
    fn name(&self) -> &'static str {
        "deduplicate-fence-join-fences"
    }

    fn root_kind(&self) -> OpKind {
        OpKind::FenceJoin
    }

    fn match_and_rewrite(&self, root: ValueId, rewriter: &mut PatternRewriter<'_>) -> Rewrite {
        let graph = rewriter.graph();
        let Some(Op::FenceJoin(fences)) = graph.op(root) else {
            return Rewrite::NoMatch;
        };
        let Some(fences) = deduplicate_fence_operands(graph, fences) else {
            return Rewrite::NoMatch;
        };
        rewriter.replace_op(root, Op::FenceJoin(fences));
        Rewrite::Applied
    }
}
