//! Target-specific compilation passes.
//!
//! These passes build the target device from a [`DeviceSpec`](crate::DeviceSpec)
//! and leave a kernel that respects its connectivity.

pub mod mapping;

pub use mapping::MappingPass;
