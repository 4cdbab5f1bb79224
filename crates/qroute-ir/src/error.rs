//! Error types for the IR crate.

use crate::kernel::{BlockId, OpId, WireId};
use thiserror::Error;

/// Errors that can occur in IR operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Wire does not exist in the kernel.
    #[error("Wire {0} not found in kernel")]
    WireNotFound(WireId),

    /// Operation does not exist or has been erased.
    #[error("Operation {0} not found in kernel")]
    OpNotFound(OpId),

    /// Block does not exist.
    #[error("Block {0} not found in kernel")]
    BlockNotFound(BlockId),

    /// Program qubit index is out of range.
    #[error("Qubit {qubit} out of range: program declares {num_qubits} qubits{}", format_op_context(.op_name))]
    QubitOutOfRange {
        /// The offending qubit index.
        qubit: u32,
        /// Number of qubits declared by the program.
        num_qubits: u32,
        /// Optional operation name for context.
        op_name: Option<String>,
    },

    /// Program qubit used after it was sunk.
    #[error("Qubit {qubit} used after release{}", format_op_context(.op_name))]
    QubitReleased {
        /// The released qubit index.
        qubit: u32,
        /// Optional operation name for context.
        op_name: Option<String>,
    },

    /// The same wire appears twice in one operation.
    #[error("Duplicate wire {wire} in operation{}", format_op_context(.op_name))]
    DuplicateWire {
        /// The duplicated wire.
        wire: WireId,
        /// Optional operation name for context.
        op_name: Option<String>,
    },

    /// A wire was consumed by more than one operation.
    #[error("Wire {wire} already consumed by {user}")]
    WireAlreadyConsumed {
        /// The wire.
        wire: WireId,
        /// The operation that already consumes it.
        user: OpId,
    },

    /// An operation cannot be erased while its results are used.
    #[error("Results of operation {0} are still in use")]
    ResultsInUse(OpId),

    /// Operation kind does not accept the given operands.
    #[error("Operation '{op_name}' expects {expected} operands, got {got}")]
    OperandCountMismatch {
        /// Name of the operation.
        op_name: String,
        /// Expected number of operands.
        expected: usize,
        /// Actual number of operands.
        got: usize,
    },

    /// Dependency cycle found while ordering a block.
    #[error("Dependency cycle in block {0}")]
    Cycle(BlockId),

    /// Invalid kernel structure.
    #[error("Invalid kernel structure: {0}")]
    InvalidKernel(String),

    /// JSON (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Helper function to format optional operation context.
#[allow(clippy::ref_option)]
fn format_op_context(op_name: &Option<String>) -> String {
    match op_name {
        Some(name) => format!(" (op: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
