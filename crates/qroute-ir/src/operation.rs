//! Operations in wire form.

use serde::{Deserialize, Serialize};

use crate::kernel::WireId;
use crate::qubit::PhysicalQubit;

/// The kind of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OpKind {
    /// Allocation of a fresh qubit wire. Originates one virtual qubit.
    Alloc,
    /// A unitary gate.
    Gate {
        /// Gate name, e.g. `h` or `cx`.
        name: String,
        /// Rotation angles or other numeric parameters.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        params: Vec<f64>,
    },
    /// Measurement in the computational basis.
    ///
    /// The register name identifies the result when measurements are
    /// reassembled for the user.
    Measure {
        /// Name of the classical register receiving the result.
        #[serde(default)]
        register: Option<String>,
    },
    /// Reset to |0⟩.
    Reset,
    /// Qubit exchange inserted by routing.
    Swap,
    /// End of a qubit's lifetime. Consumes its wire and produces nothing.
    Sink,
    /// An operation the mapper does not understand.
    Opaque {
        /// Name used in diagnostics.
        name: String,
    },
}

impl OpKind {
    /// Create a gate kind without parameters.
    pub fn gate(name: impl Into<String>) -> Self {
        OpKind::Gate {
            name: name.into(),
            params: vec![],
        }
    }

    /// Create a named measurement kind.
    pub fn measure(register: impl Into<String>) -> Self {
        OpKind::Measure {
            register: Some(register.into()),
        }
    }

    /// Get the name of the operation kind.
    pub fn name(&self) -> &str {
        match self {
            OpKind::Alloc => "alloc",
            OpKind::Gate { name, .. } | OpKind::Opaque { name } => name,
            OpKind::Measure { .. } => "measure",
            OpKind::Reset => "reset",
            OpKind::Swap => "swap",
            OpKind::Sink => "sink",
        }
    }

    /// Whether the router knows how to place this operation.
    #[inline]
    pub fn is_supported_for_mapping(&self) -> bool {
        !matches!(self, OpKind::Opaque { .. })
    }

    /// Whether this is a measurement (unconstrained by adjacency).
    #[inline]
    pub fn is_measure(&self) -> bool {
        matches!(self, OpKind::Measure { .. })
    }

    /// Whether this is a sink (produces no results).
    #[inline]
    pub fn is_sink(&self) -> bool {
        matches!(self, OpKind::Sink)
    }

    /// Whether this is an allocation.
    #[inline]
    pub fn is_alloc(&self) -> bool {
        matches!(self, OpKind::Alloc)
    }

    /// Number of operands this kind requires, if fixed.
    pub fn fixed_arity(&self) -> Option<usize> {
        match self {
            OpKind::Alloc => Some(0),
            OpKind::Reset | OpKind::Sink => Some(1),
            OpKind::Swap => Some(2),
            _ => None,
        }
    }
}

/// An operation node: a kind, the wires it consumes and the wires it
/// produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// The kind of operation.
    pub kind: OpKind,
    /// Consumed wires, one per qubit operand.
    pub(crate) operands: Vec<WireId>,
    /// Produced wires; `results[i]` carries the qubit of `operands[i]`.
    pub(crate) results: Vec<WireId>,
    /// Physical qubit of each operand, filled in once the operation is mapped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub physical: Vec<PhysicalQubit>,
}

impl Operation {
    /// Wires consumed by this operation.
    #[inline]
    pub fn operands(&self) -> &[WireId] {
        &self.operands
    }

    /// Wires produced by this operation.
    #[inline]
    pub fn results(&self) -> &[WireId] {
        &self.results
    }

    /// Number of qubit operands.
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.operands.len()
    }

    /// Get the name of the operation.
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        self.kind.is_measure()
    }

    /// Check if this is a sink.
    pub fn is_sink(&self) -> bool {
        self.kind.is_sink()
    }

    /// Check if this is an allocation.
    pub fn is_alloc(&self) -> bool {
        self.kind.is_alloc()
    }

    /// Check if the router has assigned physical qubits.
    pub fn is_mapped(&self) -> bool {
        !self.physical.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(OpKind::gate("cx").name(), "cx");
        assert_eq!(OpKind::measure("r0").name(), "measure");
        assert_eq!(OpKind::Swap.name(), "swap");
        assert_eq!(
            OpKind::Opaque {
                name: "custom".into()
            }
            .name(),
            "custom"
        );
    }

    #[test]
    fn test_mapping_support() {
        assert!(OpKind::gate("h").is_supported_for_mapping());
        assert!(OpKind::Sink.is_supported_for_mapping());
        assert!(
            !OpKind::Opaque {
                name: "loop".into()
            }
            .is_supported_for_mapping()
        );
    }

    #[test]
    fn test_kind_json() {
        let kind: OpKind = serde_json::from_str(r#"{"kind":"gate","name":"rx","params":[0.5]}"#)
            .unwrap();
        assert_eq!(
            kind,
            OpKind::Gate {
                name: "rx".into(),
                params: vec![0.5]
            }
        );

        let unnamed: OpKind = serde_json::from_str(r#"{"kind":"measure"}"#).unwrap();
        assert_eq!(unnamed, OpKind::Measure { register: None });
    }
}
