//! Minimal dataflow graph hosting fence operations at compile time.
//!
//! Every node defines exactly one value, identified by its [`ValueId`].
//! Replacing a node's operation in place keeps that id, so all users of the
//! original result keep referring to the replacement.

use derive_more::{Display, IsVariant};

/// Identifier of the value defined by a graph node.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display("%{_0}")]
#[repr(transparent)]
pub struct ValueId(pub(crate) u32);

impl ValueId {
    /// Position of the defining node in the graph.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A `(semaphore, minimum value)` operand pair of a fence creation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TimepointOperand {
    /// Value holding the semaphore reference.
    pub semaphore: ValueId,
    /// Value holding the target the semaphore must reach.
    pub min_value: ValueId,
}

/// Operation performed by a node.
#[derive(Debug, Clone, PartialEq, Eq, IsVariant)]
pub enum Op {
    /// Value supplied from outside the graph (semaphore, fence or timeout).
    Argument {
        /// Human-readable name used in diagnostics.
        name: String,
    },
    /// Integer constant.
    Constant(u64),
    /// The null fence handle.
    Null,
    /// A successful status code.
    OkStatus,
    /// Maximum of all operands.
    RangeMax(Vec<ValueId>),
    /// Builds a fence from timepoints.
    FenceCreate(Vec<TimepointOperand>),
    /// Joins fences into one.
    FenceJoin(Vec<ValueId>),
    /// Waits for all fences and yields a status.
    FenceAwait {
        /// Timeout in milliseconds, interpreted by the wait machinery.
        timeout_millis: ValueId,
        /// Fences to wait on.
        fences: Vec<ValueId>,
    },
    /// Consumes values outside the graph; keeps them alive.
    Yield(Vec<ValueId>),
}

/// Discriminant of [`Op`], used to dispatch rewrite patterns.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// [`Op::Argument`].
    #[display("argument")]
    Argument,
    /// [`Op::Constant`].
    #[display("constant")]
    Constant,
    /// [`Op::Null`].
    #[display("null")]
    Null,
    /// [`Op::OkStatus`].
    #[display("ok_status")]
    OkStatus,
    /// [`Op::RangeMax`].
    #[display("range.max")]
    RangeMax,
    /// [`Op::FenceCreate`].
    #[display("fence.create")]
    FenceCreate,
    /// [`Op::FenceJoin`].
    #[display("fence.join")]
    FenceJoin,
    /// [`Op::FenceAwait`].
    #[display("fence.await")]
    FenceAwait,
    /// [`Op::Yield`].
    #[display("yield")]
    Yield,
}

impl Op {
    /// Discriminant of this operation.
    #[must_use]
    pub const fn kind(&self) -> OpKind {
        match self {
            Self::Argument { .. } => OpKind::Argument,
            Self::Constant(_) => OpKind::Constant,
            Self::Null => OpKind::Null,
            Self::OkStatus => OpKind::OkStatus,
            Self::RangeMax(_) => OpKind::RangeMax,
            Self::FenceCreate(_) => OpKind::FenceCreate,
            Self::FenceJoin(_) => OpKind::FenceJoin,
            Self::FenceAwait { .. } => OpKind::FenceAwait,
            Self::Yield(_) => OpKind::Yield,
        }
    }

    /// All operand values, in order.
    #[must_use]
    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            Self::Argument { .. } | Self::Constant(_) | Self::Null | Self::OkStatus => vec![],
            Self::RangeMax(values) | Self::FenceJoin(values) | Self::Yield(values) => {
                values.clone()
            }
            Self::FenceCreate(timepoints) => timepoints
                .iter()
                .flat_map(|tp| [tp.semaphore, tp.min_value])
                .collect(),
            Self::FenceAwait {
                timeout_millis,
                fences,
            } => core::iter::once(*timeout_millis)
                .chain(fences.iter().copied())
                .collect(),
        }
    }

    /// `true` when removing an unused node cannot change observable behavior.
    ///
    /// Arguments and yields are the graph's interface and awaits block, so
    /// all three are always kept.
    #[must_use]
    pub const fn is_pure(&self) -> bool {
        !matches!(
            self,
            Self::Argument { .. } | Self::FenceAwait { .. } | Self::Yield(_)
        )
    }
}

/// Arena of nodes. Erased nodes leave a hole so ids stay stable.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Option<Op>>,
}

impl Graph {
    /// Empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return the value it defines.
    ///
    /// # Panics
    /// If an operand does not refer to a live node, or the graph outgrows
    /// `u32` ids.
    pub fn push(&mut self, op: Op) -> ValueId {
        for operand in op.operands() {
            assert!(self.contains(operand), "Graph::push: unknown operand {operand}");
        }
        let id = ValueId(self.nodes.len().try_into().expect("Graph::push: [1]"));
        self.nodes.push(Some(op));
        id
    }

    /// Add an external value.
    pub fn argument(&mut self, name: impl Into<String>) -> ValueId {
        self.push(Op::Argument { name: name.into() })
    }

    /// Add an integer constant.
    pub fn constant(&mut self, value: u64) -> ValueId {
        self.push(Op::Constant(value))
    }

    /// Add a null fence handle.
    pub fn null(&mut self) -> ValueId {
        self.push(Op::Null)
    }

    /// Add a fence creation from `(semaphore, min_value)` pairs.
    pub fn fence_create(&mut self, timepoints: &[(ValueId, ValueId)]) -> ValueId {
        self.push(Op::FenceCreate(
            timepoints
                .iter()
                .map(|&(semaphore, min_value)| TimepointOperand {
                    semaphore,
                    min_value,
                })
                .collect(),
        ))
    }

    /// Add a fence join.
    pub fn fence_join(&mut self, fences: &[ValueId]) -> ValueId {
        self.push(Op::FenceJoin(fences.to_vec()))
    }

    /// Add a fence await.
    pub fn fence_await(&mut self, timeout_millis: ValueId, fences: &[ValueId]) -> ValueId {
        self.push(Op::FenceAwait {
            timeout_millis,
            fences: fences.to_vec(),
        })
    }

    /// Add a sink consuming `values`.
    pub fn yield_values(&mut self, values: &[ValueId]) -> ValueId {
        self.push(Op::Yield(values.to_vec()))
    }

    /// Operation defining `value`, or `None` if it was erased.
    #[must_use]
    pub fn op(&self, value: ValueId) -> Option<&Op> {
        self.nodes.get(value.index()).and_then(Option::as_ref)
    }

    /// `true` if `value` refers to a live node.
    #[must_use]
    pub fn contains(&self, value: ValueId) -> bool {
        self.op(value).is_some()
    }

    /// `true` if `value` is statically the null fence.
    #[must_use]
    pub fn is_null(&self, value: ValueId) -> bool {
        self.op(value).is_some_and(Op::is_null)
    }

    /// Constant held by `value`, if it is a constant.
    #[must_use]
    pub fn constant_value(&self, value: ValueId) -> Option<u64> {
        match self.op(value)? {
            &Op::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// Live nodes using `value` as an operand, in id order.
    #[must_use]
    pub fn users(&self, value: ValueId) -> Vec<ValueId> {
        self.live()
            .filter(|(_, op)| op.operands().contains(&value))
            .map(|(id, _)| id)
            .collect()
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// `true` if the graph has no live nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate live nodes in id order.
    pub fn live(&self) -> impl Iterator<Item = (ValueId, &Op)> {
        self.nodes.iter().enumerate().filter_map(|(idx, op)| {
            let id = ValueId(idx.try_into().expect("Graph::live: [1]"));
            op.as_ref().map(|op| (id, op))
        })
    }

    /// Upper bound on ids handed out so far.
    pub(crate) fn id_bound(&self) -> usize {
        self.nodes.len()
    }

    /// Swap the operation of a live node, keeping its value id and users.
    ///
    /// # Panics
    /// If `value` is not live or an operand of `op` is not live.
    pub(crate) fn replace_op(&mut self, value: ValueId, op: Op) {
        for operand in op.operands() {
            assert!(self.contains(operand), "Graph::replace_op: unknown operand {operand}");
        }
        let slot = self
            .nodes
            .get_mut(value.index())
            .and_then(Option::as_mut)
            .expect("Graph::replace_op: [1]");
        *slot = op;
    }

    /// Erase pure nodes without users until none remain. Returns how many
    /// nodes were erased.
    pub fn erase_dead(&mut self) -> usize {
        let mut use_counts = vec![0usize; self.nodes.len()];
        for (_, op) in self.live() {
            for operand in op.operands() {
                use_counts[operand.index()] += 1;
            }
        }
        let mut worklist: Vec<usize> = (0..self.nodes.len())
            .filter(|&idx| use_counts[idx] == 0)
            .collect();
        let mut erased = 0;
        while let Some(idx) = worklist.pop() {
            let Some(op) = self.nodes[idx].take_if(|op| op.is_pure()) else {
                continue;
            };
            erased += 1;
            for operand in op.operands() {
                let count = &mut use_counts[operand.index()];
                *count = count.checked_sub(1).expect("Graph::erase_dead: [1]");
                if *count == 0 {
                    worklist.push(operand.index());
                }
            }
        }
        erased
    }
}
