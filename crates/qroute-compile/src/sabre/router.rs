//! The SABRE swap-insertion loop.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

use qroute_ir::{Kernel, OpId, OpKind, PhysicalQubit, VirtualQubit, WireId};

use crate::config::SabreOptions;
use crate::device::Device;
use crate::error::{CompileError, CompileResult};
use crate::placement::Placement;

use super::frontier::{Frontier, VirtualOp, WireMap};

/// Counters collected during one routing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingStats {
    /// Swaps inserted, including release valve swaps.
    pub swaps: usize,
    /// Front layer mapping attempts.
    pub rounds: usize,
    /// Times the release valve forced progress.
    pub release_valve_activations: usize,
    /// Operations the router never reached.
    pub unmapped_ops: usize,
}

/// Routes a single-block kernel onto a device.
///
/// The router owns the front layer, decay weights and the table of wires
/// currently occupying each physical qubit. Retired operations are rewired
/// onto those wires in place; swaps (and allocations for vacated qubits) are
/// created detached and listed in emission order by [`route`](Self::route).
pub struct SabreRouter<'a> {
    kernel: &'a mut Kernel,
    device: &'a Device,
    wires: &'a WireMap,
    placement: &'a mut Placement,
    options: &'a SabreOptions,

    frontier: Frontier,
    front_layer: Vec<VirtualOp>,
    extended_layer: Vec<VirtualOp>,
    /// Physical qubits of blocked front layer operations, ascending.
    involved: BTreeSet<PhysicalQubit>,
    decay: Vec<f64>,
    /// Wire on each physical qubit; `None` once the qubit has been sunk.
    phy_to_wire: Vec<Option<WireId>>,
    /// Operations in the order they were retired or created.
    emitted: Vec<OpId>,
    stats: RoutingStats,
}

impl<'a> SabreRouter<'a> {
    /// Create a router. `placement` must already be a total bijection.
    pub fn new(
        kernel: &'a mut Kernel,
        device: &'a Device,
        wires: &'a WireMap,
        placement: &'a mut Placement,
        options: &'a SabreOptions,
    ) -> Self {
        let n = device.num_qubits() as usize;
        Self {
            kernel,
            device,
            wires,
            placement,
            options,
            frontier: Frontier::new(),
            front_layer: vec![],
            extended_layer: vec![],
            involved: BTreeSet::new(),
            decay: vec![1.0; n],
            phy_to_wire: vec![None; n],
            emitted: vec![],
            stats: RoutingStats::default(),
        }
    }

    /// Route the kernel starting from its allocation operations.
    ///
    /// Returns the emission order and run statistics.
    #[instrument(skip_all, fields(sources = sources.len()))]
    pub fn route(mut self, sources: &[OpId]) -> CompileResult<(Vec<OpId>, RoutingStats)> {
        for &source in sources {
            let wire = self
                .kernel
                .op(source)
                .and_then(|op| op.results().first().copied())
                .ok_or(qroute_ir::IrError::OpNotFound(source))?;
            let virt = self.virtual_of(wire)?;
            let phy = self.phys(virt);

            self.frontier
                .visit_users(self.kernel, self.wires, source, &mut self.front_layer);
            self.phy_to_wire[phy.index()] = Some(wire);
            if let Some(op) = self.kernel.op_mut(source) {
                op.physical = vec![phy];
            }
            self.emitted.push(source);
        }

        let mut swap_searches: u32 = 0;
        let mut stalled: u32 = 0;
        loop {
            if self.front_layer.is_empty() {
                if self.frontier.in_measurement_phase() {
                    break;
                }
                self.front_layer = self.frontier.enter_measurement_phase();
                debug!(
                    "Entering measurement phase with {} measurements",
                    self.front_layer.len()
                );
                continue;
            }

            self.stats.rounds += 1;
            if self.map_front_layer()? {
                stalled = 0;
                continue;
            }

            if stalled >= self.options.release_valve {
                self.release_valve()?;
                stalled = 0;
                continue;
            }

            swap_searches += 1;
            let (a, b) = self.choose_swap()?;
            self.add_swap(a, b)?;
            self.involved.clear();
            stalled += 1;
            self.update_decay(swap_searches, a, b);
        }

        self.stats.unmapped_ops = self
            .kernel
            .entry_block()
            .iter()
            .filter(|&&id| self.kernel.op(id).is_some_and(|op| !op.is_mapped()))
            .count();

        debug!(
            "Routing finished: {} swaps in {} rounds",
            self.stats.swaps, self.stats.rounds
        );
        Ok((self.emitted, self.stats))
    }

    /// Try to retire every front layer operation. Returns whether any was
    /// retired.
    fn map_front_layer(&mut self) -> CompileResult<bool> {
        let layer = std::mem::take(&mut self.front_layer);
        let mut next = Vec::with_capacity(layer.len());
        let mut mapped_any = false;

        debug!("Mapping front layer of {} operations", layer.len());
        for virt_op in layer {
            if self.map_operation(&virt_op)? {
                trace!("{} --> SUCCESS", virt_op.op);
                mapped_any = true;
                self.frontier
                    .visit_users(self.kernel, self.wires, virt_op.op, &mut next);
                continue;
            }

            let phys: Vec<PhysicalQubit> = virt_op.qubits.iter().map(|&v| self.phys(v)).collect();
            trace!(
                "{} --> FAILURE (virtual {:?}, device {:?})",
                virt_op.op, virt_op.qubits, phys
            );
            if let &[a, b] = phys.as_slice() {
                if self.device.distance(a, b).is_none() {
                    return Err(CompileError::Unroutable {
                        qubit1: a,
                        qubit2: b,
                    });
                }
            }
            self.involved.extend(phys);
            next.push(virt_op);
        }

        self.front_layer = next;
        Ok(mapped_any)
    }

    /// Retire one operation if its qubits allow it.
    fn map_operation(&mut self, virt_op: &VirtualOp) -> CompileResult<bool> {
        let phys: Vec<PhysicalQubit> = virt_op.qubits.iter().map(|&v| self.phys(v)).collect();
        let op = self
            .kernel
            .op(virt_op.op)
            .ok_or(qroute_ir::IrError::OpNotFound(virt_op.op))?;
        let constrained = op.kind.is_supported_for_mapping() && !op.is_measure();
        let is_sink = op.is_sink();

        if let &[a, b] = phys.as_slice() {
            if constrained && !self.device.are_adjacent(a, b) {
                return Ok(false);
            }
        }

        let mut operands = Vec::with_capacity(phys.len());
        for &p in &phys {
            operands.push(self.occupy(p)?);
        }
        self.kernel.set_operands(virt_op.op, operands)?;

        let results = match self.kernel.op_mut(virt_op.op) {
            Some(op) => {
                op.physical.clone_from(&phys);
                op.results().to_vec()
            }
            None => vec![],
        };
        self.emitted.push(virt_op.op);

        if is_sink {
            for p in phys {
                self.phy_to_wire[p.index()] = None;
            }
        } else {
            for (wire, p) in results.into_iter().zip(phys) {
                self.phy_to_wire[p.index()] = Some(wire);
            }
        }
        Ok(true)
    }

    /// Fill the lookahead layer with upcoming two-qubit operations.
    fn select_extended_layer(&mut self) {
        self.extended_layer.clear();
        let capacity = self.options.extended_layer_size;
        let mut incremented = vec![];
        let mut layer = self.front_layer.clone();

        while !layer.is_empty() && self.extended_layer.len() < capacity {
            let mut next = vec![];
            for virt_op in &layer {
                self.frontier.explore_users(
                    self.kernel,
                    self.wires,
                    virt_op.op,
                    &mut next,
                    &mut incremented,
                );
            }
            for virt_op in &next {
                if self.extended_layer.len() >= capacity {
                    break;
                }
                let constrains = self.kernel.op(virt_op.op).is_some_and(|op| {
                    op.kind.is_supported_for_mapping() && !op.is_measure() && op.num_qubits() == 2
                });
                if constrains {
                    self.extended_layer.push(virt_op.clone());
                }
            }
            layer = next;
        }

        self.frontier.rollback(&incremented);
    }

    /// Mean of `distance - 1` over a layer of two-qubit operations.
    ///
    /// Operations whose qubits cannot reach each other contribute nothing.
    #[allow(clippy::cast_precision_loss)]
    fn layer_cost(&self, layer: &[VirtualOp]) -> f64 {
        if layer.is_empty() {
            return 0.0;
        }
        let total: f64 = layer
            .iter()
            .filter_map(|virt_op| {
                let &[a, b] = virt_op.qubits.as_slice() else {
                    return None;
                };
                self.device
                    .distance(self.phys(a), self.phys(b))
                    .map(|d| f64::from(d) - 1.0)
            })
            .sum();
        total / layer.len() as f64
    }

    /// Pick the swap with the lowest decayed cost.
    ///
    /// Candidates are enumerated in ascending `(p, q)` order over the
    /// involved qubits and their neighbors; the first minimum wins.
    #[allow(clippy::cast_precision_loss)]
    fn choose_swap(&mut self) -> CompileResult<(PhysicalQubit, PhysicalQubit)> {
        let device = self.device;
        let candidates: Vec<(PhysicalQubit, PhysicalQubit)> = self
            .involved
            .iter()
            .flat_map(|&a| device.neighbors(a).iter().map(move |&b| (a, b)))
            .collect();

        if self.options.extended_layer_size > 0 {
            self.select_extended_layer();
        } else {
            self.extended_layer.clear();
        }

        let mut best: Option<((PhysicalQubit, PhysicalQubit), f64)> = None;
        for &(a, b) in &candidates {
            self.placement.swap(a, b);
            let mut cost = self.layer_cost(&self.front_layer);
            if !self.extended_layer.is_empty() {
                let extended =
                    self.layer_cost(&self.extended_layer) / self.extended_layer.len() as f64;
                cost /= self.front_layer.len() as f64;
                cost += self.options.extended_layer_weight * extended;
            }
            let cost = self.decay[a.index()].max(self.decay[b.index()]) * cost;
            self.placement.swap(a, b);

            trace!("Candidate {} <-> {}: cost = {}", a, b, cost);
            let better = match best {
                Some((_, lowest)) => cost < lowest,
                None => true,
            };
            if better {
                best = Some(((a, b), cost));
            }
        }

        let ((a, b), cost) = best.ok_or_else(|| CompileError::PassFailed {
            name: "sabre".into(),
            reason: "no swap candidates for a blocked front layer".into(),
        })?;
        debug!("Selected swap {} <-> {} (cost = {})", a, b, cost);
        Ok((a, b))
    }

    /// Penalise the swapped qubits, or reset all weights every
    /// `rounds_decay_reset` swap searches.
    fn update_decay(&mut self, swap_searches: u32, a: PhysicalQubit, b: PhysicalQubit) {
        if swap_searches % self.options.rounds_decay_reset == 0 {
            self.decay.fill(1.0);
        } else {
            self.decay[a.index()] += self.options.decay_delta;
            self.decay[b.index()] += self.options.decay_delta;
        }
    }

    /// Exchange two physical qubits and emit the swap.
    fn add_swap(&mut self, a: PhysicalQubit, b: PhysicalQubit) -> CompileResult<()> {
        let wa = self.occupy(a)?;
        let wb = self.occupy(b)?;
        self.placement.swap(a, b);

        let (id, results) = self.kernel.create_op(OpKind::Swap, &[wa, wb])?;
        if let Some(op) = self.kernel.op_mut(id) {
            op.physical = vec![a, b];
        }
        self.phy_to_wire[a.index()] = Some(results[0]);
        self.phy_to_wire[b.index()] = Some(results[1]);
        self.emitted.push(id);
        self.stats.swaps += 1;
        Ok(())
    }

    /// Walk the oldest blocked operation together along a shortest path.
    fn release_valve(&mut self) -> CompileResult<()> {
        let Some(&[va, vb]) = self.front_layer.first().map(|op| op.qubits.as_slice()) else {
            return Ok(());
        };
        let (a, b) = (self.phys(va), self.phys(vb));
        let path = self
            .device
            .shortest_path(a, b)
            .ok_or(CompileError::Unroutable {
                qubit1: a,
                qubit2: b,
            })?;

        warn!(
            "No progress after {} swaps; routing {} along a shortest path",
            self.options.release_valve, self.front_layer[0].op
        );
        for pair in path.windows(2).take(path.len().saturating_sub(2)) {
            self.add_swap(pair[0], pair[1])?;
        }

        self.decay.fill(1.0);
        self.involved.clear();
        self.stats.release_valve_activations += 1;
        Ok(())
    }

    /// Wire currently on `phy`, allocating a fresh one if the qubit was
    /// vacated by a sink.
    fn occupy(&mut self, phy: PhysicalQubit) -> CompileResult<WireId> {
        if let Some(wire) = self.phy_to_wire[phy.index()] {
            return Ok(wire);
        }
        let (id, results) = self.kernel.create_op(OpKind::Alloc, &[])?;
        if let Some(op) = self.kernel.op_mut(id) {
            op.physical = vec![phy];
        }
        self.emitted.push(id);
        let wire = results[0];
        self.phy_to_wire[phy.index()] = Some(wire);
        trace!("Reallocated vacant {}", phy);
        Ok(wire)
    }

    #[inline]
    fn phys(&self, virt: VirtualQubit) -> PhysicalQubit {
        PhysicalQubit(self.placement[virt])
    }

    fn virtual_of(&self, wire: WireId) -> CompileResult<VirtualQubit> {
        self.wires
            .get(&wire)
            .copied()
            .ok_or_else(|| CompileError::PassFailed {
                name: "sabre".into(),
                reason: format!("wire {wire} has no virtual qubit"),
            })
    }
}
