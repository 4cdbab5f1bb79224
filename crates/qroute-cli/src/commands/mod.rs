//! CLI command implementations.

pub mod common;
pub mod device;
pub mod map;
pub mod version;
