//! Target-agnostic compilation passes.
//!
//! These passes do not depend on a particular device; they check whatever
//! the `PropertySet` records about the kernel.

pub mod verification;

pub use verification::{ConnectivityVerification, VerificationResult};
