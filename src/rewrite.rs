use crate::{
    graph::{Graph, Op, OpKind, ValueId},
    types::IndexMap,
};
use core::{fmt::Debug, ops::Add};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, trace_span};

/// Error returned by the greedy rewrite driver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RewriteError {
    /// Patterns were still applying after the configured number of sweeps.
    #[error("rewrites did not converge within {max_iterations} iterations")]
    DidNotConverge {
        /// Configured sweep limit.
        max_iterations: u32,
    },
}

/// Outcome of a single pattern application attempt.
#[must_use]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// The graph was changed.
    Applied,
    /// The pattern did not match; the graph is untouched.
    NoMatch,
}

/// A local rewrite rooted at one node.
///
/// A pattern must either leave the graph unchanged and return
/// [`Rewrite::NoMatch`], or change it and return [`Rewrite::Applied`].
/// Replacements must preserve the run-time meaning of the root value.
pub trait RewritePattern: Debug + Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str;
    /// Kind of node this pattern is rooted at.
    fn root_kind(&self) -> OpKind;
    /// Try to rewrite `root`, whose operation has kind [`Self::root_kind`].
    fn match_and_rewrite(&self, root: ValueId, rewriter: &mut PatternRewriter<'_>) -> Rewrite;
}

/// Ordered collection of patterns, grouped by root kind.
///
/// Patterns for the same kind are tried in insertion order.
#[derive(Debug, Default)]
pub struct RewritePatternSet {
    patterns: IndexMap<OpKind, Vec<Box<dyn RewritePattern>>>,
}

impl RewritePatternSet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pattern.
    pub fn add(&mut self, pattern: impl RewritePattern + 'static) -> &mut Self {
        self.patterns
            .entry(pattern.root_kind())
            .or_default()
            .push(Box::new(pattern));
        self
    }

    /// Append every pattern of `other`, keeping its order.
    pub fn merge(&mut self, other: Self) -> &mut Self {
        for (kind, patterns) in other.patterns {
            self.patterns.entry(kind).or_default().extend(patterns);
        }
        self
    }

    /// Patterns rooted at `kind`, in insertion order.
    pub fn for_kind(&self, kind: OpKind) -> impl Iterator<Item = &dyn RewritePattern> {
        self.patterns
            .get(&kind)
            .into_iter()
            .flatten()
            .map(Box::as_ref)
    }

    /// Total number of patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.values().map(Vec::len).sum()
    }

    /// `true` if the set holds no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutation surface handed to patterns.
#[derive(Debug)]
pub struct PatternRewriter<'g> {
    graph: &'g mut Graph,
}

impl<'g> PatternRewriter<'g> {
    pub(crate) fn new(graph: &'g mut Graph) -> Self {
        Self { graph }
    }

    /// Read access to the graph being rewritten.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// Replace the operation defining `root`; all users now see `op`.
    pub fn replace_op(&mut self, root: ValueId, op: Op) {
        self.graph.replace_op(root, op);
    }

    /// Value equal to the maximum of `values`, folding constants.
    ///
    /// Constant operands are combined into one constant. If a single value
    /// remains it is returned directly and no node is emitted for it.
    ///
    /// # Panics
    /// If `values` is empty.
    pub fn create_or_fold_range_max(&mut self, values: Vec<ValueId>) -> ValueId {
        assert!(!values.is_empty(), "PatternRewriter::create_or_fold_range_max: [1]");
        let (constants, mut dynamic): (Vec<_>, Vec<_>) = values
            .into_iter()
            .partition(|&v| self.graph.constant_value(v).is_some());
        let folded = constants
            .iter()
            .filter_map(|&v| self.graph.constant_value(v))
            .max();
        if let Some(max) = folded {
            let constant = match constants.as_slice() {
                [only] => *only,
                _ => self.graph.constant(max),
            };
            dynamic.push(constant);
        }
        match dynamic.as_slice() {
            [only] => *only,
            _ => self.graph.push(Op::RangeMax(dynamic)),
        }
    }
}

/// Configuration of the greedy rewrite driver.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GreedyRewriteConfig {
    /// Maximum number of sweeps over the graph before giving up.
    pub max_iterations: u32,
    /// Erase pure nodes left without users after each sweep.
    pub erase_dead: bool,
}

impl Default for GreedyRewriteConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            erase_dead: true,
        }
    }
}

/// Counters reported by a driver run.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct RewriteStats {
    /// Number of sweeps performed, including the final unchanged one.
    pub iterations: u32,
    /// Number of successful pattern applications.
    pub applied: usize,
    /// Number of nodes erased as dead.
    pub erased: usize,
}

impl Add for RewriteStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            iterations: self.iterations.max(rhs.iterations),
            applied: self.applied + rhs.applied,
            erased: self.erased + rhs.erased,
        }
    }
}

/// Apply `patterns` to every node until none matches.
///
/// Each sweep visits nodes in id order, including nodes created during the
/// sweep, and tries the node's patterns in order until one applies.
///
/// # Errors
/// [`RewriteError::DidNotConverge`] if the graph is still changing after
/// `config.max_iterations` sweeps.
pub fn apply_patterns_greedily(
    graph: &mut Graph,
    patterns: &RewritePatternSet,
    config: &GreedyRewriteConfig,
) -> Result<RewriteStats, RewriteError> {
    let _span = trace_span!("rewrite.greedy", nodes = graph.len()).entered();
    let mut stats = RewriteStats::default();
    while stats.iterations < config.max_iterations {
        stats.iterations += 1;
        let mut changed = false;
        let mut idx = 0;
        while idx < graph.id_bound() {
            let root = ValueId(idx.try_into().expect("apply_patterns_greedily: [1]"));
            idx += 1;
            let Some(kind) = graph.op(root).map(Op::kind) else {
                continue;
            };
            for pattern in patterns.for_kind(kind) {
                let mut rewriter = PatternRewriter::new(graph);
                if pattern.match_and_rewrite(root, &mut rewriter) == Rewrite::Applied {
                    debug!(pattern = pattern.name(), %root, "applied rewrite");
                    stats.applied += 1;
                    changed = true;
                    break;
                }
            }
        }
        if config.erase_dead {
            let erased = graph.erase_dead();
            stats.erased += erased;
            changed |= erased != 0;
        }
        if !changed {
            return Ok(stats);
        }
    }
    Err(RewriteError::DidNotConverge {
        max_iterations: config.max_iterations,
    })
}

/// Run [`apply_patterns_greedily`] over independent graphs in parallel.
///
/// # Errors
/// The first [`RewriteError`] reported by any graph.
pub fn canonicalize_functions(
    functions: &mut [Graph],
    patterns: &RewritePatternSet,
    config: &GreedyRewriteConfig,
) -> Result<RewriteStats, RewriteError> {
    functions
        .par_iter_mut()
        .map(|graph| apply_patterns_greedily(graph, patterns, config))
        .try_reduce(RewriteStats::default, |lhs, rhs| Ok(lhs + rhs))
}
