//! Verification pass for mapped kernels.
//!
//! Checks the guarantees the mapping pass makes: every two-qubit operation
//! acts on coupled qubits, the placement is a bijection and the entry block
//! lists producers before their users.

use rustc_hash::FxHashMap;
use tracing::debug;

use qroute_ir::{Kernel, KernelLevel, OpId};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Result of connectivity verification.
#[derive(Debug, Clone, Default)]
pub struct VerificationResult {
    /// Whether the verification passed.
    pub passed: bool,
    /// Number of two-qubit operations checked against the device.
    pub two_qubit_ops_checked: usize,
    /// Number of routing swaps found.
    pub swaps_found: usize,
    /// Number of measurements found.
    pub measurements_found: usize,
}

/// Analysis pass that checks a mapped kernel against its device.
///
/// Reads the device and placement from the `PropertySet`, so it must run
/// after [`MappingPass`](crate::passes::MappingPass) or with both set by
/// hand.
pub struct ConnectivityVerification;

impl ConnectivityVerification {
    fn check_order(kernel: &Kernel) -> CompileResult<()> {
        let position: FxHashMap<OpId, usize> = kernel
            .entry_block()
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();

        for (i, &id) in kernel.entry_block().iter().enumerate() {
            let Some(op) = kernel.op(id) else {
                continue;
            };
            for &operand in op.operands() {
                let Some(producer) = kernel.wire(operand).map(|w| w.producer()) else {
                    continue;
                };
                if position.get(&producer).is_some_and(|&p| p > i) {
                    return Err(CompileError::PassFailed {
                        name: "connectivity_verification".into(),
                        reason: format!("{id} is listed before its producer {producer}"),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Pass for ConnectivityVerification {
    fn name(&self) -> &'static str {
        "connectivity_verification"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, kernel: &mut Kernel, properties: &mut PropertySet) -> CompileResult<()> {
        let device = properties
            .device
            .as_ref()
            .ok_or(CompileError::MissingDevice)?;
        let placement = properties
            .placement
            .as_ref()
            .ok_or(CompileError::MissingPlacement)?;

        if !placement.is_complete() || !placement.is_bijective() {
            return Err(CompileError::PassFailed {
                name: self.name().into(),
                reason: "final placement is not a bijection".into(),
            });
        }

        let mut result = VerificationResult::default();
        for &id in kernel.entry_block() {
            let Some(op) = kernel.op(id) else {
                continue;
            };
            if op.is_measure() {
                result.measurements_found += 1;
                continue;
            }
            if !op.kind.is_supported_for_mapping() {
                continue;
            }
            if let &[a, b] = op.physical.as_slice() {
                result.two_qubit_ops_checked += 1;
                if op.kind == qroute_ir::OpKind::Swap {
                    result.swaps_found += 1;
                }
                if !device.are_adjacent(a, b) {
                    return Err(CompileError::ConnectivityViolation {
                        op: id,
                        name: op.name().to_string(),
                        qubit1: a,
                        qubit2: b,
                    });
                }
            }
        }

        Self::check_order(kernel)?;
        result.passed = true;

        debug!(
            "Connectivity verification passed: {} two-qubit operations, {} swaps, {} measurements",
            result.two_qubit_ops_checked, result.swaps_found, result.measurements_found
        );

        properties.insert(result);
        Ok(())
    }

    fn should_run(&self, kernel: &Kernel, _properties: &PropertySet) -> bool {
        kernel.level() == KernelLevel::Physical
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;
    use crate::placement::Placement;
    use qroute_ir::PhysicalQubit;

    fn mapped_cx(a: u32, b: u32) -> Kernel {
        let mut kernel = Kernel::new("cx");
        let q0 = kernel.alloc();
        let q1 = kernel.alloc();
        kernel.cx(q0, q1).unwrap();
        let cx = kernel.entry_block()[2];
        kernel.op_mut(cx).unwrap().physical = vec![PhysicalQubit(a), PhysicalQubit(b)];
        kernel.set_level(KernelLevel::Physical);
        kernel
    }

    fn props() -> PropertySet {
        let mut props = PropertySet::new().with_device(Device::path(3).unwrap());
        props.placement = Some(Placement::identity(3, 3).unwrap());
        props
    }

    #[test]
    fn test_adjacent_passes() {
        let mut kernel = mapped_cx(1, 2);
        let mut props = props();
        ConnectivityVerification.run(&mut kernel, &mut props).unwrap();

        let result = props.get::<VerificationResult>().unwrap();
        assert!(result.passed);
        assert_eq!(result.two_qubit_ops_checked, 1);
    }

    #[test]
    fn test_violation_detected() {
        let mut kernel = mapped_cx(0, 2);
        let mut props = props();
        let err = ConnectivityVerification.run(&mut kernel, &mut props);
        assert!(matches!(
            err,
            Err(CompileError::ConnectivityViolation { name, .. }) if name == "cx"
        ));
    }

    #[test]
    fn test_unsupported_ops_not_checked() {
        let mut kernel = Kernel::new("opaque");
        let q0 = kernel.alloc();
        let q1 = kernel.alloc();
        kernel
            .apply(qroute_ir::OpKind::Opaque { name: "barrier".into() }, &[q0, q1])
            .unwrap();
        let barrier = kernel.entry_block()[2];
        kernel.op_mut(barrier).unwrap().physical = vec![PhysicalQubit(0), PhysicalQubit(2)];
        kernel.set_level(KernelLevel::Physical);

        let mut props = props();
        ConnectivityVerification.run(&mut kernel, &mut props).unwrap();
        assert_eq!(props.get::<VerificationResult>().unwrap().two_qubit_ops_checked, 0);
    }

    #[test]
    fn test_missing_properties() {
        let mut kernel = mapped_cx(0, 1);
        let mut props = PropertySet::new();
        assert!(matches!(
            ConnectivityVerification.run(&mut kernel, &mut props),
            Err(CompileError::MissingDevice)
        ));

        let mut props = PropertySet::new().with_device(Device::path(2).unwrap());
        assert!(matches!(
            ConnectivityVerification.run(&mut kernel, &mut props),
            Err(CompileError::MissingPlacement)
        ));
    }

    #[test]
    fn test_only_runs_on_physical_kernels() {
        let kernel = Kernel::new("logical");
        assert!(!ConnectivityVerification.should_run(&kernel, &PropertySet::new()));
    }
}
