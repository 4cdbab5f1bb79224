//! Error types for the compilation crate.

use std::path::PathBuf;

use qroute_ir::{OpId, PhysicalQubit};
use thiserror::Error;

/// Errors that can occur during mapping.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Error from the IR crate.
    #[error("IR error: {0}")]
    Ir(#[from] qroute_ir::IrError),

    /// Malformed device specification string.
    #[error("Invalid device specification '{spec}': {reason}")]
    InvalidDeviceSpec { spec: String, reason: String },

    /// Device description file could not be read or parsed.
    #[error("Device file {}: {reason}", path.display())]
    DeviceFile { path: PathBuf, reason: String },

    /// Device has no qubits.
    #[error("Device has no qubits")]
    EmptyDevice,

    /// Program needs more qubits than the device provides.
    #[error("Circuit requires {required} qubits but target only has {available}")]
    CircuitTooLarge { required: usize, available: u32 },

    /// The kernel has more than one block.
    #[error("The mapper cannot handle multiple blocks (found {0})")]
    MultipleBlocks(usize),

    /// A non-measurement operation touches more than two qubits.
    #[error("Operation {op} ('{name}') acts on {got} qubits; at most 2 are supported")]
    TooManyQubits { op: OpId, name: String, got: usize },

    /// An operation other than an allocation acts on no qubits.
    #[error("Operation {op} ('{name}') acts on no qubits")]
    NoQubits { op: OpId, name: String },

    /// A measurement has no register name.
    #[error("Measurement {op} has no register name")]
    UnnamedMeasurement { op: OpId },

    /// No path connects the physical qubits of an operation.
    #[error("Routing failed: qubits {qubit1} and {qubit2} not connected")]
    Unroutable {
        qubit1: PhysicalQubit,
        qubit2: PhysicalQubit,
    },

    /// A mapped two-qubit operation acts on non-adjacent qubits.
    #[error("Operation {op} ('{name}') acts on non-adjacent qubits {qubit1} and {qubit2}")]
    ConnectivityViolation {
        op: OpId,
        name: String,
        qubit1: PhysicalQubit,
        qubit2: PhysicalQubit,
    },

    /// Missing device for mapping or verification.
    #[error("Missing device for mapping")]
    MissingDevice,

    /// Missing placement for verification.
    #[error("Missing placement for verification")]
    MissingPlacement,

    /// Pass execution failed.
    #[error("Pass '{name}' failed: {reason}")]
    PassFailed { name: String, reason: String },

    /// Invalid pass configuration.
    #[error("Invalid pass configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
