//! Qubit mapping pass.
//!
//! Places every allocated qubit on the device, routes the kernel with the
//! SABRE router and rewrites it at the physical level.

use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

use qroute_ir::{BlockId, Kernel, KernelLevel, OpId, OpKind, VirtualQubit};

use crate::config::{DeviceSpec, MappingConfig, SabreOptions};
use crate::device::Device;
use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::placement::Placement;
use crate::property::PropertySet;
use crate::sabre::{SabreRouter, WireMap};

/// Maps a logical kernel onto a device.
///
/// Program qubits start on an identity placement and the device's spare
/// qubits are filled with ancillas, so the router always works on a total
/// bijection. Ancillas at the end of the allocation order that routing
/// never touched are removed again.
///
/// On success the kernel is at [`KernelLevel::Physical`], every retired
/// operation lists its physical qubits and the final map is published on
/// the kernel and in the [`PropertySet`].
#[derive(Debug, Clone, Default)]
pub struct MappingPass {
    device: DeviceSpec,
    options: SabreOptions,
}

impl MappingPass {
    /// Create a mapping pass for `device` with default router parameters.
    pub fn new(device: DeviceSpec) -> Self {
        Self {
            device,
            options: SabreOptions::default(),
        }
    }

    /// Set the router parameters.
    #[must_use]
    pub fn with_options(mut self, options: SabreOptions) -> Self {
        self.options = options;
        self
    }

    /// Create a mapping pass from a configuration.
    pub fn from_config(config: &MappingConfig) -> CompileResult<Self> {
        config.validate()?;
        Ok(Self::new(config.device_spec()?).with_options(config.sabre.clone()))
    }

    /// The target device specification.
    pub fn device(&self) -> &DeviceSpec {
        &self.device
    }
}

impl Pass for MappingPass {
    fn name(&self) -> &'static str {
        "mapping"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, kernel: &mut Kernel, properties: &mut PropertySet) -> CompileResult<()> {
        self.options.validate()?;
        kernel.verify()?;
        if kernel.num_blocks() > 1 {
            return Err(CompileError::MultipleBlocks(kernel.num_blocks()));
        }

        let VirtualQubits {
            mut wires,
            mut sources,
        } = assign_virtual_qubits(kernel)?;
        let num_original = sources.len();

        let device = self.device.build(num_original)?;
        if device.num_qubits() == 0 {
            return Err(CompileError::EmptyDevice);
        }
        if (device.num_qubits() as usize) < num_original {
            return Err(CompileError::CircuitTooLarge {
                required: num_original,
                available: device.num_qubits(),
            });
        }
        debug!("Mapping {} qubits onto device:\n{}", num_original, device);

        insert_ancillas(kernel, &device, &mut wires, &mut sources)?;
        let mut placement = Placement::identity(device.num_qubits(), device.num_qubits())?;

        let (emitted, stats) =
            SabreRouter::new(kernel, &device, &wires, &mut placement, &self.options)
                .route(&sources)?;

        let retired: FxHashSet<OpId> = emitted.iter().copied().collect();
        let leftovers: Vec<OpId> = kernel
            .entry_block()
            .iter()
            .copied()
            .filter(|id| !retired.contains(id))
            .collect();
        if !leftovers.is_empty() {
            warn!(
                "{} operations could not be mapped and were left in place",
                leftovers.len()
            );
        }
        let mut order = emitted;
        order.extend(leftovers);
        kernel.set_block_order(BlockId::ENTRY, order)?;
        kernel.sort_topologically(BlockId::ENTRY)?;

        let mut pruned = 0;
        for &ancilla in sources[num_original..].iter().rev() {
            if !kernel.users(ancilla).is_empty() {
                break;
            }
            kernel.erase_op(ancilla)?;
            pruned += 1;
        }

        let mapping = placement.freeze(num_original);
        kernel.set_level(KernelLevel::Physical);
        kernel.set_mapping_v2p(mapping.to_u32_vec());

        info!(
            "Mapped {} qubits with {} swaps ({} ancillas kept)",
            num_original,
            stats.swaps,
            sources.len() - num_original - pruned
        );

        properties.mapping = Some(mapping);
        properties.placement = Some(placement);
        properties.device = Some(device);
        properties.insert(stats);
        Ok(())
    }

    fn should_run(&self, kernel: &Kernel, _properties: &PropertySet) -> bool {
        kernel.level() == KernelLevel::Logical
    }
}

/// Virtual qubit bookkeeping for the entry block.
pub(crate) struct VirtualQubits {
    /// Virtual qubit of every wire reachable from an allocation.
    pub(crate) wires: WireMap,
    /// Allocation operations, in virtual qubit order.
    pub(crate) sources: Vec<OpId>,
}

/// Number the allocations of the entry block and follow each qubit through
/// the operations that consume it.
///
/// Also rejects what the router cannot handle: unnamed measurements,
/// operations without qubits and supported operations on more than two
/// qubits.
pub(crate) fn assign_virtual_qubits(kernel: &Kernel) -> CompileResult<VirtualQubits> {
    let mut wires = WireMap::default();
    let mut sources = vec![];
    let mut next = 0u32;

    for &id in kernel.entry_block() {
        let op = kernel.op(id).ok_or(qroute_ir::IrError::OpNotFound(id))?;

        match &op.kind {
            OpKind::Measure { register } if register.as_deref().is_none_or(str::is_empty) => {
                return Err(CompileError::UnnamedMeasurement { op: id });
            }
            OpKind::Alloc => {
                if let Some(&result) = op.results().first() {
                    wires.insert(result, VirtualQubit(next));
                }
                sources.push(id);
                next += 1;
                continue;
            }
            _ if op.num_qubits() == 0 => {
                return Err(CompileError::NoQubits {
                    op: id,
                    name: op.name().to_string(),
                });
            }
            kind if kind.is_supported_for_mapping()
                && !kind.is_sink()
                && !kind.is_measure()
                && op.num_qubits() > 2 =>
            {
                return Err(CompileError::TooManyQubits {
                    op: id,
                    name: op.name().to_string(),
                    got: op.num_qubits(),
                });
            }
            _ => {}
        }

        for (operand, &result) in op.operands().iter().zip(op.results()) {
            if let Some(&virt) = wires.get(operand) {
                wires.insert(result, virt);
            }
        }
    }

    Ok(VirtualQubits { wires, sources })
}

/// Allocate one ancilla per spare device qubit, right after the last
/// allocation of the entry block.
fn insert_ancillas(
    kernel: &mut Kernel,
    device: &Device,
    wires: &mut WireMap,
    sources: &mut Vec<OpId>,
) -> CompileResult<()> {
    let mut position = kernel
        .entry_block()
        .iter()
        .rposition(|&id| kernel.op(id).is_some_and(|op| op.is_alloc()))
        .map_or(0, |last| last + 1);

    #[allow(clippy::cast_possible_truncation)]
    let first = sources.len() as u32;
    for virt in first..device.num_qubits() {
        let (id, results) = kernel.insert_op(BlockId::ENTRY, position, OpKind::Alloc, &[])?;
        wires.insert(results[0], VirtualQubit(virt));
        sources.push(id);
        position += 1;
    }
    if first < device.num_qubits() {
        debug!("Inserted {} ancillas", device.num_qubits() - first);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sabre::RoutingStats;
    use qroute_ir::{PhysicalQubit, Program};

    fn run(program: &Program, device: DeviceSpec) -> CompileResult<(Kernel, PropertySet)> {
        let mut kernel = program.clone().into_kernel()?;
        let mut props = PropertySet::new();
        MappingPass::new(device).run(&mut kernel, &mut props)?;
        Ok((kernel, props))
    }

    fn two_qubit_ops(kernel: &Kernel) -> Vec<(String, PhysicalQubit, PhysicalQubit)> {
        kernel
            .entry_block()
            .iter()
            .filter_map(|&id| kernel.op(id))
            .filter(|op| !op.is_measure())
            .filter_map(|op| match op.physical.as_slice() {
                &[a, b] => Some((op.name().to_string(), a, b)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_adjacent_cx_needs_no_swaps() {
        let mut program = Program::new("bell", 2);
        program.push(OpKind::gate("cx"), [0, 1]);

        let (kernel, props) = run(&program, DeviceSpec::Path(Some(2))).unwrap();
        assert_eq!(props.get::<RoutingStats>().unwrap().swaps, 0);
        assert_eq!(kernel.mapping_v2p(), Some(&[0, 1][..]));
        assert_eq!(kernel.level(), KernelLevel::Physical);
        assert!(kernel.verify().is_ok());
    }

    #[test]
    fn test_ring_needs_a_swap() {
        let mut program = Program::new("far", 4);
        program.push(OpKind::gate("cx"), [0, 2]);

        let (kernel, props) = run(&program, DeviceSpec::Ring(Some(4))).unwrap();
        assert!(props.get::<RoutingStats>().unwrap().swaps >= 1);

        let device = props.device.as_ref().unwrap();
        for (_, a, b) in two_qubit_ops(&kernel) {
            assert!(device.are_adjacent(a, b));
        }
        let cx = two_qubit_ops(&kernel)
            .into_iter()
            .find(|(name, _, _)| name == "cx")
            .unwrap();
        let mapping = props.mapping.as_ref().unwrap();
        assert_eq!(mapping.len(), 4);
        assert_eq!((cx.1, cx.2), (mapping.as_slice()[0], mapping.as_slice()[2]));
    }

    #[test]
    fn test_ancillas_pruned() {
        let mut program = Program::new("small", 2);
        program.push(OpKind::gate("h"), [0]);
        program.push(OpKind::gate("cx"), [0, 1]);

        let (kernel, props) = run(&program, DeviceSpec::Path(Some(5))).unwrap();
        let allocs = kernel
            .entry_block()
            .iter()
            .filter(|&&id| kernel.op(id).is_some_and(|op| op.is_alloc()))
            .count();
        assert_eq!(allocs, 2);
        assert_eq!(props.placement.as_ref().unwrap().num_physical(), 5);
        assert_eq!(props.mapping.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_grid_inferred_from_program() {
        let mut program = Program::new("five", 5);
        program.push(OpKind::gate("cx"), [0, 4]);

        let (_, props) = run(&program, DeviceSpec::Grid { width: None, height: None }).unwrap();
        assert_eq!(props.device.as_ref().unwrap().num_qubits(), 9);
    }

    #[test]
    fn test_preflight_errors() {
        let mut program = Program::new("big", 3);
        program.push(OpKind::gate("ccx"), [0, 1, 2]);
        assert!(matches!(
            run(&program, DeviceSpec::Path(None)),
            Err(CompileError::TooManyQubits { got: 3, .. })
        ));

        let mut program = Program::new("anon", 1);
        program.push(OpKind::Measure { register: None }, [0]);
        assert!(matches!(
            run(&program, DeviceSpec::Path(None)),
            Err(CompileError::UnnamedMeasurement { .. })
        ));

        let mut program = Program::new("phase", 2);
        program
            .push(OpKind::gate("gphase"), Vec::<u32>::new())
            .push(OpKind::gate("cx"), [0, 1]);
        assert!(matches!(
            run(&program, DeviceSpec::Path(Some(2))),
            Err(CompileError::NoQubits { name, .. }) if name == "gphase"
        ));

        let program = Program::new("wide", 4);
        assert!(matches!(
            run(&program, DeviceSpec::Path(Some(3))),
            Err(CompileError::CircuitTooLarge {
                required: 4,
                available: 3
            })
        ));

        let program = Program::new("empty", 0);
        assert!(matches!(
            run(&program, DeviceSpec::Path(None)),
            Err(CompileError::EmptyDevice)
        ));
    }

    #[test]
    fn test_multiple_blocks_rejected() {
        let mut kernel = Kernel::new("blocks");
        kernel.alloc();
        kernel.add_block();
        let mut props = PropertySet::new();
        let result = MappingPass::default().run(&mut kernel, &mut props);
        assert!(matches!(result, Err(CompileError::MultipleBlocks(2))));
    }

    #[test]
    fn test_skips_physical_kernels() {
        let mut program = Program::new("bell", 2);
        program.push(OpKind::gate("cx"), [0, 1]);
        let (kernel, props) = run(&program, DeviceSpec::Path(None)).unwrap();
        assert!(!MappingPass::default().should_run(&kernel, &props));
    }

    #[test]
    fn test_measurements_after_gates() {
        let mut program = Program::new("measure", 3);
        program
            .push(OpKind::gate("cx"), [0, 2])
            .push(OpKind::measure("c0"), [0])
            .push(OpKind::gate("cx"), [1, 2])
            .push(OpKind::measure("c1"), [1]);

        let (kernel, _) = run(&program, DeviceSpec::Path(None)).unwrap();
        let names: Vec<&str> = kernel
            .entry_block()
            .iter()
            .filter_map(|&id| kernel.op(id))
            .map(|op| op.name())
            .collect();
        let last_gate = names.iter().rposition(|&n| n == "cx").unwrap();
        let first_measure = names.iter().position(|&n| n == "measure").unwrap();
        assert!(last_gate < first_measure);
    }

    #[test]
    fn test_opaque_ops_placed_in_order() {
        let mut program = Program::new("loop", 3);
        program
            .push(OpKind::Opaque { name: "loop".into() }, [1])
            .push(OpKind::gate("cx"), [0, 2])
            .push(OpKind::measure("c1"), [1]);

        let mut kernel = program.into_kernel().unwrap();
        let (pm, mut props) = crate::manager::PassManagerBuilder::new()
            .with_device(DeviceSpec::Path(Some(3)))
            .build();
        pm.run(&mut kernel, &mut props).unwrap();

        assert!(kernel.verify().is_ok());
        let stats = props.get::<RoutingStats>().unwrap();
        assert_eq!(stats.unmapped_ops, 0);
        assert_eq!(stats.swaps, 1);

        let physical = kernel.to_physical_program().unwrap();
        let names: Vec<&str> = physical.instructions.iter().map(|i| i.kind.name()).collect();
        assert_eq!(names, ["loop", "swap", "cx", "measure"]);
        // v1 was moved by the swap; the loop ran before it, the measurement after.
        assert_eq!(physical.instructions[0].qubits, vec![1]);
        let v1 = props.mapping.as_ref().unwrap().as_slice()[1];
        assert_eq!(physical.instructions[3].qubits, vec![v1.0]);
    }

    #[test]
    fn test_disconnected_device_unroutable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("split.txt");
        std::fs::write(&path, "Number of nodes: 4\n0 1\n2 3\n").unwrap();

        let mut program = Program::new("split", 4);
        program.push(OpKind::gate("cx"), [0, 3]);
        assert!(matches!(
            run(&program, DeviceSpec::File(path)),
            Err(CompileError::Unroutable { .. })
        ));
    }
}
