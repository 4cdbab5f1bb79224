//! Readiness tracking for the router.
//!
//! An operation becomes ready once it has been reached through each of its
//! qubit operands, i.e. once its visit count equals its operand count.
//! Retiring an operation visits the consumers of its results; lookahead
//! exploration does the same but records every increment so it can be
//! undone. Operations the router does not understand become ready the same
//! way and are then placed wherever their qubits are.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use qroute_ir::{Kernel, OpId, VirtualQubit, WireId};

/// Virtual qubit carried by each wire of the input kernel.
pub type WireMap = FxHashMap<WireId, VirtualQubit>;

/// An operation waiting to be mapped, with the virtual qubits it acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualOp {
    /// The operation.
    pub op: OpId,
    /// Virtual qubit of each operand.
    pub qubits: Vec<VirtualQubit>,
}

/// Tracks visit counts and deferred measurements.
#[derive(Debug, Default)]
pub struct Frontier {
    /// Number of times each operation has been reached.
    visited: FxHashMap<OpId, usize>,
    /// Measurements held back until the measurement phase.
    measure_layer: Vec<VirtualOp>,
    /// Operations already in `measure_layer`.
    measure_set: FxHashSet<OpId>,
    /// Whether measurements go straight into the layer being built.
    allow_measurements: bool,
    /// Unsupported operations already reported.
    reported: FxHashSet<OpId>,
}

impl Frontier {
    /// Create an empty frontier outside the measurement phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether deferred measurements have been released.
    pub fn in_measurement_phase(&self) -> bool {
        self.allow_measurements
    }

    /// Number of measurements currently held back.
    pub fn pending_measurements(&self) -> usize {
        self.measure_layer.len()
    }

    /// Visit the consumers of a retired operation.
    ///
    /// Consumers that become ready are appended to `layer`, except
    /// measurements outside the measurement phase, which are deferred.
    pub fn visit_users(&mut self, kernel: &Kernel, wires: &WireMap, op: OpId, layer: &mut Vec<VirtualOp>) {
        self.visit(kernel, wires, op, layer, None);
    }

    /// Visit the consumers of an operation for lookahead.
    ///
    /// Every increment is recorded in `incremented` and must be undone with
    /// [`rollback`](Self::rollback). Measurements are never deferred here.
    pub fn explore_users(
        &mut self,
        kernel: &Kernel,
        wires: &WireMap,
        op: OpId,
        layer: &mut Vec<VirtualOp>,
        incremented: &mut Vec<OpId>,
    ) {
        self.visit(kernel, wires, op, layer, Some(incremented));
    }

    /// Undo lookahead increments.
    pub fn rollback(&mut self, incremented: &[OpId]) {
        for op in incremented {
            if let Some(count) = self.visited.get_mut(op) {
                *count -= 1;
            }
        }
    }

    /// Enter the measurement phase, returning the deferred measurements in
    /// discovery order.
    pub fn enter_measurement_phase(&mut self) -> Vec<VirtualOp> {
        self.allow_measurements = true;
        self.measure_set.clear();
        std::mem::take(&mut self.measure_layer)
    }

    fn visit(
        &mut self,
        kernel: &Kernel,
        wires: &WireMap,
        op: OpId,
        layer: &mut Vec<VirtualOp>,
        mut incremented: Option<&mut Vec<OpId>>,
    ) {
        for user in kernel.users(op) {
            let count = self.visited.entry(user).or_insert(0);
            *count += 1;
            let count = *count;
            if let Some(incremented) = incremented.as_deref_mut() {
                incremented.push(user);
            }

            let Some(operation) = kernel.op(user) else {
                continue;
            };
            if count != operation.num_qubits() {
                continue;
            }
            if !operation.kind.is_supported_for_mapping() && self.reported.insert(user) {
                warn!(
                    "Unsupported operation {} ('{}') placed without connectivity constraints",
                    user,
                    operation.name()
                );
            }

            let qubits: Option<Vec<VirtualQubit>> =
                operation.operands().iter().map(|w| wires.get(w).copied()).collect();
            let Some(qubits) = qubits else {
                warn!("Operation {} consumes a wire with no virtual qubit", user);
                continue;
            };
            let virt_op = VirtualOp { op: user, qubits };

            if self.allow_measurements || !operation.is_measure() {
                layer.push(virt_op);
            } else if incremented.is_none() && self.measure_set.insert(user) {
                self.measure_layer.push(virt_op);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds `cx(q0, q1); measure q0; h q1` and the matching wire map.
    fn fixture() -> (Kernel, WireMap, Vec<OpId>) {
        let mut kernel = Kernel::new("frontier");
        let q0 = kernel.alloc();
        let q1 = kernel.alloc();
        let (a, b) = kernel.cx(q0, q1).unwrap();
        let m = kernel.measure(a, "r0").unwrap();
        let h = kernel.h(b).unwrap();

        let mut wires = WireMap::default();
        for (w, v) in [(q0, 0), (q1, 1), (a, 0), (b, 1), (m, 0), (h, 1)] {
            wires.insert(w, VirtualQubit(v));
        }
        let ids = kernel.entry_block().to_vec();
        (kernel, wires, ids)
    }

    #[test]
    fn test_ready_after_all_operands() {
        let (kernel, wires, ids) = fixture();
        let mut frontier = Frontier::new();
        let mut layer = vec![];

        frontier.visit_users(&kernel, &wires, ids[0], &mut layer);
        assert!(layer.is_empty());
        frontier.visit_users(&kernel, &wires, ids[1], &mut layer);
        assert_eq!(
            layer,
            vec![VirtualOp {
                op: ids[2],
                qubits: vec![VirtualQubit(0), VirtualQubit(1)]
            }]
        );
    }

    #[test]
    fn test_measurements_deferred() {
        let (kernel, wires, ids) = fixture();
        let mut frontier = Frontier::new();
        let mut layer = vec![];

        frontier.visit_users(&kernel, &wires, ids[2], &mut layer);
        // The H is ready, the measurement is held back.
        assert_eq!(layer.len(), 1);
        assert_eq!(layer[0].op, ids[4]);
        assert_eq!(frontier.pending_measurements(), 1);

        let measurements = frontier.enter_measurement_phase();
        assert!(frontier.in_measurement_phase());
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].op, ids[3]);
    }

    #[test]
    fn test_rollback_restores_counts() {
        let (kernel, wires, ids) = fixture();
        let mut frontier = Frontier::new();

        let mut scratch = vec![];
        let mut incremented = vec![];
        frontier.explore_users(&kernel, &wires, ids[0], &mut scratch, &mut incremented);
        frontier.explore_users(&kernel, &wires, ids[1], &mut scratch, &mut incremented);
        assert_eq!(scratch.len(), 1);
        frontier.rollback(&incremented);

        // After rollback the CX needs both visits again.
        let mut layer = vec![];
        frontier.visit_users(&kernel, &wires, ids[0], &mut layer);
        assert!(layer.is_empty());
        frontier.visit_users(&kernel, &wires, ids[1], &mut layer);
        assert_eq!(layer.len(), 1);
    }

    #[test]
    fn test_exploration_does_not_defer_measurements() {
        let (kernel, wires, ids) = fixture();
        let mut frontier = Frontier::new();
        let mut scratch = vec![];
        let mut incremented = vec![];

        frontier.explore_users(&kernel, &wires, ids[2], &mut scratch, &mut incremented);
        assert_eq!(frontier.pending_measurements(), 0);
        frontier.rollback(&incremented);
    }

    #[test]
    fn test_unsupported_ops_become_ready() {
        let mut kernel = Kernel::new("opaque");
        let q = kernel.alloc();
        let r = kernel
            .apply(
                qroute_ir::OpKind::Opaque {
                    name: "loop".into(),
                },
                &[q],
            )
            .unwrap();
        let mut wires = WireMap::default();
        wires.insert(q, VirtualQubit(0));
        wires.insert(r[0], VirtualQubit(0));

        let mut frontier = Frontier::new();
        let mut layer = vec![];
        frontier.visit_users(&kernel, &wires, kernel.entry_block()[0], &mut layer);
        assert_eq!(
            layer,
            vec![VirtualOp {
                op: kernel.entry_block()[1],
                qubits: vec![VirtualQubit(0)]
            }]
        );
    }
}
