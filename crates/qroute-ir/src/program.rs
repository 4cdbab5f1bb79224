//! Index-based program front end.
//!
//! A [`Program`] names qubits by integer index instead of by wire, which is
//! how programs are written by hand and exchanged as JSON. It converts to a
//! [`Kernel`] for compilation and back once a kernel has been mapped.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::kernel::{Kernel, WireId};
use crate::operation::OpKind;

/// One operation over indexed qubits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The operation kind, flattened into the instruction object.
    #[serde(flatten)]
    pub kind: OpKind,
    /// Qubit indices, one per operand.
    pub qubits: Vec<u32>,
}

impl Instruction {
    /// Create a new instruction.
    pub fn new(kind: OpKind, qubits: impl Into<Vec<u32>>) -> Self {
        Self {
            kind,
            qubits: qubits.into(),
        }
    }
}

/// A named list of instructions over `num_qubits` qubits.
///
/// ```json
/// {
///   "name": "bell",
///   "num_qubits": 2,
///   "instructions": [
///     { "kind": "gate", "name": "h", "qubits": [0] },
///     { "kind": "gate", "name": "cx", "qubits": [0, 1] },
///     { "kind": "measure", "register": "r0", "qubits": [0] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Program name.
    pub name: String,
    /// Number of qubits, indexed `0..num_qubits`.
    pub num_qubits: u32,
    /// Instructions in program order.
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

impl Program {
    /// Create an empty program.
    pub fn new(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            instructions: vec![],
        }
    }

    /// Append an instruction.
    pub fn push(&mut self, kind: OpKind, qubits: impl Into<Vec<u32>>) -> &mut Self {
        self.instructions.push(Instruction::new(kind, qubits));
        self
    }

    /// Parse a program from JSON.
    pub fn from_json(json: &str) -> IrResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the program to pretty-printed JSON.
    pub fn to_json(&self) -> IrResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Lower into wire form.
    ///
    /// Qubit `i` becomes the `i`-th allocation of the kernel, so virtual
    /// qubit numbering matches program indices.
    pub fn into_kernel(self) -> IrResult<Kernel> {
        let mut kernel = Kernel::new(self.name);
        let mut current: Vec<Option<WireId>> =
            (0..self.num_qubits).map(|_| Some(kernel.alloc())).collect();

        for instruction in self.instructions {
            if instruction.kind.is_alloc() {
                return Err(IrError::InvalidKernel(
                    "programs declare qubits through num_qubits, not alloc instructions".into(),
                ));
            }

            let mut operands = Vec::with_capacity(instruction.qubits.len());
            for &q in &instruction.qubits {
                let slot = current
                    .get(q as usize)
                    .ok_or_else(|| IrError::QubitOutOfRange {
                        qubit: q,
                        num_qubits: self.num_qubits,
                        op_name: Some(instruction.kind.name().to_string()),
                    })?;
                let wire = slot.ok_or_else(|| IrError::QubitReleased {
                    qubit: q,
                    op_name: Some(instruction.kind.name().to_string()),
                })?;
                operands.push(wire);
            }

            let results = kernel.apply(instruction.kind.clone(), &operands)?;
            if instruction.kind.is_sink() {
                for &q in &instruction.qubits {
                    current[q as usize] = None;
                }
            } else {
                for (&q, wire) in instruction.qubits.iter().zip(results) {
                    current[q as usize] = Some(wire);
                }
            }
        }

        Ok(kernel)
    }
}

impl Kernel {
    /// Emit the mapped kernel as a program over physical qubit indices.
    ///
    /// Allocations are omitted; every other operation must have been
    /// assigned physical qubits.
    pub fn to_physical_program(&self) -> IrResult<Program> {
        let mut instructions = vec![];
        let mut num_qubits = self
            .mapping_v2p()
            .and_then(|m| m.iter().max())
            .map_or(0, |&p| p + 1);

        for (_, ops) in self.blocks() {
            for &id in ops {
                let Some(op) = self.op(id) else {
                    continue;
                };
                if op.is_alloc() {
                    continue;
                }
                if !op.is_mapped() {
                    return Err(IrError::InvalidKernel(format!(
                        "{id} ({}) has no physical qubits assigned",
                        op.name()
                    )));
                }
                let qubits: Vec<u32> = op.physical.iter().map(|p| p.0).collect();
                if let Some(&max) = qubits.iter().max() {
                    num_qubits = num_qubits.max(max + 1);
                }
                instructions.push(Instruction::new(op.kind.clone(), qubits));
            }
        }

        Ok(Program {
            name: self.name().to_string(),
            num_qubits,
            instructions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qubit::PhysicalQubit;

    fn bell_program() -> Program {
        let mut program = Program::new("bell", 2);
        program
            .push(OpKind::gate("h"), [0])
            .push(OpKind::gate("cx"), [0, 1])
            .push(OpKind::measure("r0"), [0])
            .push(OpKind::measure("r1"), [1]);
        program
    }

    #[test]
    fn test_into_kernel() {
        let kernel = bell_program().into_kernel().unwrap();
        assert_eq!(kernel.name(), "bell");
        assert_eq!(kernel.num_ops(), 6);
        assert!(kernel.verify().is_ok());

        let first = kernel.op(kernel.entry_block()[0]).unwrap();
        assert!(first.is_alloc());
    }

    #[test]
    fn test_json_parse() {
        let json = r#"{
            "name": "bell",
            "num_qubits": 2,
            "instructions": [
                { "kind": "gate", "name": "h", "qubits": [0] },
                { "kind": "gate", "name": "cx", "qubits": [0, 1] },
                { "kind": "measure", "register": "r0", "qubits": [0] },
                { "kind": "measure", "register": "r1", "qubits": [1] }
            ]
        }"#;
        let program = Program::from_json(json).unwrap();
        assert_eq!(program, bell_program());
    }

    #[test]
    fn test_out_of_range() {
        let mut program = Program::new("bad", 1);
        program.push(OpKind::gate("cx"), [0, 1]);
        let err = program.into_kernel().unwrap_err();
        assert!(matches!(err, IrError::QubitOutOfRange { qubit: 1, .. }));
    }

    #[test]
    fn test_use_after_sink() {
        let mut program = Program::new("bad", 1);
        program
            .push(OpKind::Sink, [0])
            .push(OpKind::gate("x"), [0]);
        let err = program.into_kernel().unwrap_err();
        assert!(matches!(err, IrError::QubitReleased { qubit: 0, .. }));
    }

    #[test]
    fn test_alloc_instruction_rejected() {
        let mut program = Program::new("bad", 0);
        program.push(OpKind::Alloc, Vec::<u32>::new());
        assert!(program.into_kernel().is_err());
    }

    #[test]
    fn test_physical_program_requires_mapping() {
        let kernel = bell_program().into_kernel().unwrap();
        assert!(kernel.to_physical_program().is_err());
    }

    #[test]
    fn test_physical_program() {
        let mut kernel = bell_program().into_kernel().unwrap();
        let ids = kernel.entry_block().to_vec();
        for &id in &ids {
            let op = kernel.op_mut(id).unwrap();
            // Map virtual i onto physical 1 - i.
            op.physical = match op.num_qubits() {
                0 => vec![],
                1 if op.is_measure() && op.kind == OpKind::measure("r1") => vec![PhysicalQubit(0)],
                1 => vec![PhysicalQubit(1)],
                _ => vec![PhysicalQubit(1), PhysicalQubit(0)],
            };
        }
        kernel.set_mapping_v2p(vec![1, 0]);

        let program = kernel.to_physical_program().unwrap();
        assert_eq!(program.num_qubits, 2);
        assert_eq!(program.instructions.len(), 4);
        assert_eq!(program.instructions[1].qubits, vec![1, 0]);
        assert_eq!(program.instructions[3].qubits, vec![0]);
    }

    mod props {
        use super::*;
        use crate::kernel::BlockId;
        use proptest::prelude::*;

        fn arb_program() -> impl Strategy<Value = Program> {
            (2u32..6).prop_flat_map(|n| {
                let gate = prop_oneof![
                    (0..n).prop_map(|q| (OpKind::gate("h"), vec![q])),
                    (0..n, 1..n).prop_map(move |(a, d)| (OpKind::gate("cx"), vec![a, (a + d) % n])),
                ];
                proptest::collection::vec(gate, 0..40).prop_map(move |gates| {
                    let mut program = Program::new("random", n);
                    for (kind, qubits) in gates {
                        program.push(kind, qubits);
                    }
                    program
                })
            })
        }

        proptest! {
            #[test]
            fn lowered_programs_are_in_value_semantics(program in arb_program()) {
                let expected = program.instructions.len() + program.num_qubits as usize;
                let kernel = program.into_kernel().unwrap();
                prop_assert!(kernel.verify().is_ok());
                prop_assert_eq!(kernel.num_ops(), expected);
            }

            #[test]
            fn program_order_is_already_topological(program in arb_program()) {
                let mut kernel = program.into_kernel().unwrap();
                let before = kernel.entry_block().to_vec();
                kernel.sort_topologically(BlockId::ENTRY).unwrap();
                prop_assert_eq!(kernel.entry_block(), before.as_slice());
            }
        }
    }
}
