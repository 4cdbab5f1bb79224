//! Wire-form kernel representation.
//!
//! A [`Kernel`] is an arena of [`Operation`]s connected by single-assignment
//! [`Wire`]s. Every qubit-consuming operation takes one wire per qubit
//! operand and, unless it is a sink, produces one fresh wire per operand.
//! Following the wires from an allocation therefore yields the total order
//! of operations on that qubit.
//!
//! Operations and wires are addressed by dense integer ids ([`OpId`],
//! [`WireId`]). Erased operations leave a hole in the arena so ids stay
//! stable for the lifetime of the kernel.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

use crate::error::{IrError, IrResult};
use crate::operation::{OpKind, Operation};

/// Identifier of an operation in the kernel arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OpId(pub u32);

impl OpId {
    /// Position in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op{}", self.0)
    }
}

/// Identifier of a wire in the kernel arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WireId(pub u32);

impl WireId {
    /// Position in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Identifier of a basic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl BlockId {
    /// The entry block of every kernel.
    pub const ENTRY: BlockId = BlockId(0);

    /// Position in the block list.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "^bb{}", self.0)
    }
}

/// A single-assignment qubit value between two operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire {
    /// The operation that defines this wire.
    producer: OpId,
    /// Result position within the producer.
    index: u32,
    /// Operations consuming this wire, in the order they started using it.
    users: Vec<OpId>,
}

impl Wire {
    /// The operation that defines this wire.
    #[inline]
    pub fn producer(&self) -> OpId {
        self.producer
    }

    /// Result position within the producer.
    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Operations consuming this wire.
    #[inline]
    pub fn users(&self) -> &[OpId] {
        &self.users
    }
}

/// The abstraction level of a kernel.
///
/// Kernels start at the `Logical` level and are lowered to the `Physical`
/// level by the mapping pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KernelLevel {
    /// Operands refer to virtual qubits.
    #[default]
    Logical,
    /// Operands refer to physical device qubits.
    Physical,
}

/// A quantum kernel in wire form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kernel {
    /// Kernel name.
    name: String,
    /// Operation arena. Erased operations are `None`.
    ops: Vec<Option<Operation>>,
    /// Wire arena.
    wires: Vec<Wire>,
    /// Ordered operation lists, entry block first.
    blocks: Vec<Vec<OpId>>,
    /// Abstraction level.
    level: KernelLevel,
    /// Final virtual-to-physical assignment, published by the mapping pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mapping_v2p: Option<Vec<u32>>,
}

impl Kernel {
    /// Create a kernel with a single empty entry block.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ops: vec![],
            wires: vec![],
            blocks: vec![vec![]],
            level: KernelLevel::Logical,
            mapping_v2p: None,
        }
    }

    /// Get the kernel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a new empty block. Builders append to the last block.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_block(&mut self) -> BlockId {
        self.blocks.push(vec![]);
        BlockId((self.blocks.len() - 1) as u32)
    }

    /// Number of blocks.
    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Operations of a block, in order.
    pub fn block(&self, block: BlockId) -> IrResult<&[OpId]> {
        self.blocks
            .get(block.index())
            .map(Vec::as_slice)
            .ok_or(IrError::BlockNotFound(block))
    }

    /// Operations of the entry block, in order.
    pub fn entry_block(&self) -> &[OpId] {
        self.blocks.first().map_or(&[], Vec::as_slice)
    }

    /// Iterate over blocks.
    #[allow(clippy::cast_possible_truncation)]
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &[OpId])> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, ops)| (BlockId(i as u32), ops.as_slice()))
    }

    /// Number of live operations.
    pub fn num_ops(&self) -> usize {
        self.ops.iter().flatten().count()
    }

    /// Number of wires ever created.
    #[inline]
    pub fn num_wires(&self) -> usize {
        self.wires.len()
    }

    /// Get an operation.
    #[inline]
    pub fn op(&self, id: OpId) -> Option<&Operation> {
        self.ops.get(id.index()).and_then(Option::as_ref)
    }

    /// Get a mutable operation.
    #[inline]
    pub fn op_mut(&mut self, id: OpId) -> Option<&mut Operation> {
        self.ops.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Get a wire.
    #[inline]
    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(id.index())
    }

    /// Consumers of an operation's results.
    ///
    /// Users are listed result by result, each wire's users in use order. An
    /// operation consuming two results of `op` appears twice.
    pub fn users(&self, op: OpId) -> Vec<OpId> {
        let Some(operation) = self.op(op) else {
            return vec![];
        };
        operation
            .results
            .iter()
            .flat_map(|w| self.wires[w.index()].users.iter().copied())
            .collect()
    }

    /// Abstraction level of this kernel.
    pub fn level(&self) -> KernelLevel {
        self.level
    }

    /// Set the abstraction level.
    pub fn set_level(&mut self, level: KernelLevel) {
        self.level = level;
    }

    /// Published virtual-to-physical map, if the kernel has been mapped.
    pub fn mapping_v2p(&self) -> Option<&[u32]> {
        self.mapping_v2p.as_deref()
    }

    /// Publish the virtual-to-physical map.
    pub fn set_mapping_v2p(&mut self, mapping: Vec<u32>) {
        self.mapping_v2p = Some(mapping);
    }

    /// Allocate a fresh qubit in the last block.
    #[allow(clippy::cast_possible_truncation)]
    pub fn alloc(&mut self) -> WireId {
        let id = OpId(self.ops.len() as u32);
        let wire = self.new_wire(id, 0);
        self.ops.push(Some(Operation {
            kind: OpKind::Alloc,
            operands: vec![],
            results: vec![wire],
            physical: vec![],
        }));
        self.last_block_mut().push(id);
        wire
    }

    /// Append an operation to the last block.
    ///
    /// Operands must exist, must not repeat and must not already be consumed.
    pub fn apply(&mut self, kind: OpKind, operands: &[WireId]) -> IrResult<Vec<WireId>> {
        let (id, results) = self.build_op(kind, operands, true)?;
        self.last_block_mut().push(id);
        Ok(results)
    }

    /// Append a gate.
    pub fn gate(&mut self, name: &str, operands: &[WireId]) -> IrResult<Vec<WireId>> {
        self.apply(OpKind::gate(name), operands)
    }

    /// Append a Hadamard gate.
    pub fn h(&mut self, qubit: WireId) -> IrResult<WireId> {
        Ok(self.gate("h", &[qubit])?[0])
    }

    /// Append a Pauli-X gate.
    pub fn x(&mut self, qubit: WireId) -> IrResult<WireId> {
        Ok(self.gate("x", &[qubit])?[0])
    }

    /// Append a CNOT gate.
    pub fn cx(&mut self, control: WireId, target: WireId) -> IrResult<(WireId, WireId)> {
        let results = self.gate("cx", &[control, target])?;
        Ok((results[0], results[1]))
    }

    /// Append a program-level SWAP gate.
    pub fn swap(&mut self, a: WireId, b: WireId) -> IrResult<(WireId, WireId)> {
        let results = self.gate("swap", &[a, b])?;
        Ok((results[0], results[1]))
    }

    /// Append a named measurement.
    pub fn measure(&mut self, qubit: WireId, register: impl Into<String>) -> IrResult<WireId> {
        Ok(self.apply(OpKind::measure(register), &[qubit])?[0])
    }

    /// Append a reset.
    pub fn reset(&mut self, qubit: WireId) -> IrResult<WireId> {
        Ok(self.apply(OpKind::Reset, &[qubit])?[0])
    }

    /// End the lifetime of a qubit.
    pub fn sink(&mut self, qubit: WireId) -> IrResult<()> {
        self.apply(OpKind::Sink, &[qubit])?;
        Ok(())
    }

    /// Create an operation that is not placed in any block yet.
    ///
    /// Unlike [`apply`](Self::apply), operands may already have users; the
    /// caller is responsible for rewiring those users before the kernel is
    /// expected to be in value semantics again.
    pub fn create_op(
        &mut self,
        kind: OpKind,
        operands: &[WireId],
    ) -> IrResult<(OpId, Vec<WireId>)> {
        self.build_op(kind, operands, false)
    }

    /// Create an operation and insert it at `position` in `block`.
    pub fn insert_op(
        &mut self,
        block: BlockId,
        position: usize,
        kind: OpKind,
        operands: &[WireId],
    ) -> IrResult<(OpId, Vec<WireId>)> {
        let len = self.block(block)?.len();
        if position > len {
            return Err(IrError::InvalidKernel(format!(
                "insertion point {position} past the end of {block} ({len} ops)"
            )));
        }
        let (id, results) = self.build_op(kind, operands, true)?;
        self.blocks[block.index()].insert(position, id);
        Ok((id, results))
    }

    /// Replace the operands of an operation, keeping use lists consistent.
    pub fn set_operands(&mut self, op: OpId, operands: Vec<WireId>) -> IrResult<()> {
        for &w in &operands {
            if self.wire(w).is_none() {
                return Err(IrError::WireNotFound(w));
            }
        }
        let operation = self
            .ops
            .get_mut(op.index())
            .and_then(Option::as_mut)
            .ok_or(IrError::OpNotFound(op))?;
        if operation.operands.len() != operands.len() {
            return Err(IrError::OperandCountMismatch {
                op_name: operation.name().to_string(),
                expected: operation.operands.len(),
                got: operands.len(),
            });
        }

        let old = std::mem::replace(&mut operation.operands, operands.clone());
        for w in old {
            let users = &mut self.wires[w.index()].users;
            if let Some(pos) = users.iter().position(|&u| u == op) {
                users.remove(pos);
            }
        }
        for w in operands {
            self.wires[w.index()].users.push(op);
        }
        Ok(())
    }

    /// Erase an operation whose results are unused.
    pub fn erase_op(&mut self, op: OpId) -> IrResult<Operation> {
        let operation = self.op(op).ok_or(IrError::OpNotFound(op))?;
        if operation
            .results
            .iter()
            .any(|w| !self.wires[w.index()].users.is_empty())
        {
            return Err(IrError::ResultsInUse(op));
        }

        let Some(operation) = self.ops[op.index()].take() else {
            return Err(IrError::OpNotFound(op));
        };
        for w in &operation.operands {
            let users = &mut self.wires[w.index()].users;
            if let Some(pos) = users.iter().position(|&u| u == op) {
                users.remove(pos);
            }
        }
        for block in &mut self.blocks {
            block.retain(|&id| id != op);
        }
        Ok(operation)
    }

    /// Replace the order of a block.
    ///
    /// `order` must list every operation currently in the block exactly once
    /// and may add detached operations (see [`create_op`](Self::create_op)).
    pub fn set_block_order(&mut self, block: BlockId, order: Vec<OpId>) -> IrResult<()> {
        let current: FxHashSet<OpId> = self.block(block)?.iter().copied().collect();
        let elsewhere: FxHashSet<OpId> = self
            .blocks
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != block.index())
            .flat_map(|(_, ops)| ops.iter().copied())
            .collect();

        let mut seen = FxHashSet::default();
        for &id in &order {
            if self.op(id).is_none() {
                return Err(IrError::OpNotFound(id));
            }
            if !seen.insert(id) {
                return Err(IrError::InvalidKernel(format!(
                    "{id} listed twice in order for {block}"
                )));
            }
            if elsewhere.contains(&id) {
                return Err(IrError::InvalidKernel(format!(
                    "{id} belongs to another block than {block}"
                )));
            }
        }
        if let Some(missing) = current.iter().find(|id| !seen.contains(id)) {
            return Err(IrError::InvalidKernel(format!(
                "new order for {block} drops {missing}"
            )));
        }

        self.blocks[block.index()] = order;
        Ok(())
    }

    /// Order a block so every operation follows the producers of its operands.
    ///
    /// The sort is stable: among ready operations the one appearing first in
    /// the current order is emitted first.
    pub fn sort_topologically(&mut self, block: BlockId) -> IrResult<()> {
        let order = self.block(block)?.to_vec();
        let n = order.len();

        let mut graph: DiGraph<OpId, ()> = DiGraph::with_capacity(n, 2 * n);
        let nodes: Vec<NodeIndex> = order.iter().map(|&id| graph.add_node(id)).collect();
        let position: FxHashMap<OpId, usize> =
            order.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        for (i, &id) in order.iter().enumerate() {
            let Some(operation) = self.op(id) else {
                continue;
            };
            for w in &operation.operands {
                let producer = self.wires[w.index()].producer;
                if let Some(&j) = position.get(&producer) {
                    graph.update_edge(nodes[j], nodes[i], ());
                }
            }
        }

        let mut indegree: Vec<usize> = nodes
            .iter()
            .map(|&node| graph.neighbors_directed(node, Direction::Incoming).count())
            .collect();
        let mut ready: BinaryHeap<Reverse<usize>> = indegree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut sorted = Vec::with_capacity(n);
        while let Some(Reverse(i)) = ready.pop() {
            sorted.push(order[i]);
            for succ in graph.neighbors_directed(nodes[i], Direction::Outgoing) {
                let j = succ.index();
                indegree[j] -= 1;
                if indegree[j] == 0 {
                    ready.push(Reverse(j));
                }
            }
        }

        if sorted.len() != n {
            return Err(IrError::Cycle(block));
        }
        self.blocks[block.index()] = sorted;
        Ok(())
    }

    /// Verify that the kernel is in value semantics.
    ///
    /// Checks that:
    /// - every operand refers to an existing wire defined by a live operation
    /// - every result wire points back at its producer
    /// - every wire has at most one user
    /// - every block lists only live operations, each at most once overall
    #[allow(clippy::cast_possible_truncation)]
    pub fn verify(&self) -> IrResult<()> {
        for (i, slot) in self.ops.iter().enumerate() {
            let Some(operation) = slot else {
                continue;
            };
            for &w in &operation.operands {
                let wire = self.wire(w).ok_or(IrError::WireNotFound(w))?;
                if self.op(wire.producer).is_none() {
                    return Err(IrError::InvalidKernel(format!(
                        "{w} is defined by erased {}",
                        wire.producer
                    )));
                }
            }
            for &w in &operation.results {
                let wire = self.wire(w).ok_or(IrError::WireNotFound(w))?;
                if wire.producer.index() != i {
                    return Err(IrError::InvalidKernel(format!(
                        "{w} does not point back at its producer"
                    )));
                }
            }
        }

        for (i, wire) in self.wires.iter().enumerate() {
            if wire.users.len() > 1 {
                return Err(IrError::WireAlreadyConsumed {
                    wire: WireId(i as u32),
                    user: wire.users[0],
                });
            }
        }

        let mut placed = FxHashSet::default();
        for (block, ops) in self.blocks() {
            for &id in ops {
                if self.op(id).is_none() {
                    return Err(IrError::OpNotFound(id));
                }
                if !placed.insert(id) {
                    return Err(IrError::InvalidKernel(format!(
                        "{id} appears more than once ({block})"
                    )));
                }
            }
        }

        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn build_op(
        &mut self,
        kind: OpKind,
        operands: &[WireId],
        require_unused: bool,
    ) -> IrResult<(OpId, Vec<WireId>)> {
        let op_name = Some(kind.name().to_string());

        if let Some(expected) = kind.fixed_arity() {
            if expected != operands.len() {
                return Err(IrError::OperandCountMismatch {
                    op_name: kind.name().to_string(),
                    expected,
                    got: operands.len(),
                });
            }
        }

        let mut seen = FxHashSet::default();
        for &w in operands {
            let wire = self.wire(w).ok_or(IrError::WireNotFound(w))?;
            if require_unused {
                if let Some(&user) = wire.users.first() {
                    return Err(IrError::WireAlreadyConsumed { wire: w, user });
                }
            }
            if !seen.insert(w) {
                return Err(IrError::DuplicateWire {
                    wire: w,
                    op_name: op_name.clone(),
                });
            }
        }

        let id = OpId(self.ops.len() as u32);
        let num_results = if kind.is_sink() {
            0
        } else if kind.is_alloc() {
            1
        } else {
            operands.len()
        };
        let results: Vec<WireId> = (0..num_results)
            .map(|i| self.new_wire(id, i as u32))
            .collect();
        for &w in operands {
            self.wires[w.index()].users.push(id);
        }

        self.ops.push(Some(Operation {
            kind,
            operands: operands.to_vec(),
            results: results.clone(),
            physical: vec![],
        }));
        Ok((id, results))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn new_wire(&mut self, producer: OpId, index: u32) -> WireId {
        let id = WireId(self.wires.len() as u32);
        self.wires.push(Wire {
            producer,
            index,
            users: vec![],
        });
        id
    }

    fn last_block_mut(&mut self) -> &mut Vec<OpId> {
        if self.blocks.is_empty() {
            self.blocks.push(vec![]);
        }
        let last = self.blocks.len() - 1;
        &mut self.blocks[last]
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "kernel @{} ({:?}) {{", self.name, self.level)?;
        for (block, ops) in self.blocks() {
            writeln!(f, "{block}:")?;
            for &id in ops {
                let Some(operation) = self.op(id) else {
                    continue;
                };
                write!(f, "  ")?;
                if !operation.results.is_empty() {
                    let results: Vec<String> =
                        operation.results.iter().map(ToString::to_string).collect();
                    write!(f, "{} = ", results.join(", "))?;
                }
                write!(f, "{}", operation.name())?;
                if let OpKind::Measure {
                    register: Some(register),
                } = &operation.kind
                {
                    write!(f, " \"{register}\"")?;
                }
                if !operation.operands.is_empty() {
                    let operands: Vec<String> =
                        operation.operands.iter().map(ToString::to_string).collect();
                    write!(f, " {}", operands.join(", "))?;
                }
                if !operation.physical.is_empty() {
                    let physical: Vec<String> =
                        operation.physical.iter().map(ToString::to_string).collect();
                    write!(f, " [{}]", physical.join(", "))?;
                }
                writeln!(f)?;
            }
        }
        if let Some(mapping) = &self.mapping_v2p {
            writeln!(f, "mapping_v2p = {mapping:?}")?;
        }
        write!(f, "}}")
    }
}
