//! Built-in compilation passes.
//!
//! Passes are organized into two categories:
//! - [`agnostic`]: passes that only inspect the kernel and the `PropertySet`
//! - [`target`]: passes that rewrite the kernel for a device

pub mod agnostic;
pub mod target;

pub use agnostic::{ConnectivityVerification, VerificationResult};
pub use target::MappingPass;
