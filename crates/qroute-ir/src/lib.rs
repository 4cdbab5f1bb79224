//! qroute wire-form intermediate representation
//!
//! This crate provides the data structures the qroute mapper operates on.
//! Programs are kernels in *wire form*: every operation consumes one wire
//! per qubit operand and produces a fresh wire per operand, so each qubit's
//! history is a chain of single-assignment values starting at an
//! allocation.
//!
//! # Core Components
//!
//! - **Qubits**: [`VirtualQubit`] for program qubits and [`PhysicalQubit`]
//!   for device qubits
//! - **Operations**: [`OpKind`] and [`Operation`], with allocations, gates,
//!   measurements, resets, routing swaps, sinks and opaque operations
//! - **Kernel**: [`Kernel`], the arena of operations, wires and blocks
//! - **Program**: [`Program`], the index-based JSON front end
//!
//! # Example: Building a Bell Pair
//!
//! ```rust
//! use qroute_ir::Kernel;
//!
//! let mut kernel = Kernel::new("bell");
//! let q0 = kernel.alloc();
//! let q1 = kernel.alloc();
//!
//! let q0 = kernel.h(q0).unwrap();
//! let (q0, q1) = kernel.cx(q0, q1).unwrap();
//! kernel.measure(q0, "r0").unwrap();
//! kernel.measure(q1, "r1").unwrap();
//!
//! assert_eq!(kernel.num_ops(), 6);
//! assert!(kernel.verify().is_ok());
//! ```
//!
//! # Example: Loading a Program
//!
//! ```rust
//! use qroute_ir::Program;
//!
//! let program = Program::from_json(r#"{
//!     "name": "pair",
//!     "num_qubits": 2,
//!     "instructions": [{ "kind": "gate", "name": "cx", "qubits": [0, 1] }]
//! }"#).unwrap();
//!
//! let kernel = program.into_kernel().unwrap();
//! assert_eq!(kernel.num_ops(), 3);
//! ```

pub mod error;
pub mod kernel;
pub mod operation;
pub mod program;
pub mod qubit;

pub use error::{IrError, IrResult};
pub use kernel::{BlockId, Kernel, KernelLevel, OpId, Wire, WireId};
pub use operation::{OpKind, Operation};
pub use program::{Instruction, Program};
pub use qubit::{PhysicalQubit, VirtualQubit};
