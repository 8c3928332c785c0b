use crate::{
    algebra::deduplicate_fence_operands,
    graph::{Op, OpKind, ValueId},
    rewrite::{PatternRewriter, Rewrite, RewritePattern},
};

/// Replaces an await on no fences by a successful status.
#[derive(Debug, Default, Copy, Clone)]
pub struct ElideEmptyFenceAwait;

impl RewritePattern for ElideEmptyFenceAwait {
    fn name(&self) -> &'static str {
        "elide-empty-fence-await"
    }

    fn root_kind(&self) -> OpKind {
        OpKind::FenceAwait
    }

    fn match_and_rewrite(&self, root: ValueId, rewriter: &mut PatternRewriter<'_>) -> Rewrite {
        let Some(Op::FenceAwait { fences, .. }) = rewriter.graph().op(root) else {
            return Rewrite::NoMatch;
        };
        if !fences.is_empty() {
            return Rewrite::NoMatch;
        }
        rewriter.replace_op(root, Op::OkStatus);
        Rewrite::Applied
    }
}

/// Drops null and repeated operands of an await.
#[derive(Debug, Default, Copy, Clone)]
pub struct DeduplicateFenceAwaitFences;

impl RewritePattern for DeduplicateFenceAwaitFences {
    fn name(&self) -> &'static str {
        "deduplicate-fence-await-fences"
    }

    fn root_kind(&self) -> OpKind {
        OpKind::FenceAwait
    }

    fn match_and_rewrite(&self, root: ValueId, rewriter: &mut PatternRewriter<'_>) -> Rewrite {
        let graph = rewriter.graph();
        let Some(&Op::FenceAwait {
            timeout_millis,
            ref fences,
        }) = graph.op(root)
        else {
            return Rewrite::NoMatch;
        };
        let Some(fences) = deduplicate_fence_operands(graph, fences) else {
            return Rewrite::NoMatch;
        };
        rewriter.replace_op(
            root,
            Op::FenceAwait {
                timeout_millis,
                fences,
            },
        );
        Rewrite::Applied
    }
}
