//! Qubit mapping and routing for wire-form kernels.
//!
//! This crate places the qubits of a [`qroute_ir::Kernel`] on a device with
//! restricted connectivity and inserts swaps so that every two-qubit
//! operation acts on coupled physical qubits. Routing uses the SABRE
//! heuristic: a front layer of ready operations, a weighted lookahead over
//! upcoming two-qubit operations and per-qubit decay.
//!
//! # Architecture
//!
//! ```text
//! Logical Kernel
//!       │
//!       ▼
//! ┌─────────────┐
//! │ PassManager │ ◄── PropertySet (device, placement, mapping)
//! └─────────────┘
//!       │
//!       ├── MappingPass (pre-flight, ancillas, SabreRouter)
//!       └── ConnectivityVerification
//!       │
//!       ▼
//! Physical Kernel + virtual→physical map
//! ```
//!
//! # Example
//!
//! ```rust
//! use qroute_compile::{DeviceSpec, PassManagerBuilder};
//! use qroute_ir::{OpKind, Program};
//!
//! let mut program = Program::new("far", 4);
//! program.push(OpKind::gate("cx"), [0, 3]);
//! let mut kernel = program.into_kernel().unwrap();
//!
//! let (pm, mut props) = PassManagerBuilder::new()
//!     .with_device(DeviceSpec::Path(Some(4)))
//!     .build();
//! pm.run(&mut kernel, &mut props).unwrap();
//!
//! let mapping = props.mapping.unwrap();
//! assert_eq!(mapping.len(), 4);
//! assert!(kernel.to_physical_program().is_ok());
//! ```
//!
//! # Devices
//!
//! Devices are selected with a [`DeviceSpec`], either in code or parsed
//! from strings such as `path`, `ring(8)`, `star(5, 2)`, `grid(3, 4)` or
//! `file(device.txt)`. Dimensions left out are inferred from the number of
//! qubits the kernel allocates.
//!
//! # Custom Passes
//!
//! Implement the [`Pass`] trait to run additional passes in the same
//! manager:
//!
//! ```rust
//! use qroute_compile::{CompileResult, Pass, PassKind, PropertySet};
//! use qroute_ir::Kernel;
//!
//! struct CountOps;
//!
//! impl Pass for CountOps {
//!     fn name(&self) -> &str { "count_ops" }
//!     fn kind(&self) -> PassKind { PassKind::Analysis }
//!
//!     fn run(&self, kernel: &mut Kernel, props: &mut PropertySet) -> CompileResult<()> {
//!         props.insert(kernel.entry_block().len());
//!         Ok(())
//!     }
//! }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod manager;
pub mod pass;
pub mod placement;
pub mod property;
pub mod sabre;

// Built-in passes
pub mod passes;

pub use config::{DeviceSpec, MappingConfig, SabreOptions};
pub use device::Device;
pub use error::{CompileError, CompileResult};
pub use manager::{PassManager, PassManagerBuilder};
pub use pass::{Pass, PassKind};
pub use passes::{ConnectivityVerification, MappingPass, VerificationResult};
pub use placement::{Placement, QubitMapping};
pub use property::PropertySet;
pub use sabre::{RoutingStats, SabreRouter};
