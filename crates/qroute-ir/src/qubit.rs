//! Virtual and physical qubit identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical qubit as declared by the source program.
///
/// Virtual qubits are numbered in allocation order, starting at zero, and
/// are never reused within a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VirtualQubit(pub u32);

impl VirtualQubit {
    /// Position of this qubit in per-qubit tables.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VirtualQubit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<u32> for VirtualQubit {
    fn from(id: u32) -> Self {
        VirtualQubit(id)
    }
}

/// A node of the target device's connectivity graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhysicalQubit(pub u32);

impl PhysicalQubit {
    /// Position of this qubit in per-qubit tables.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PhysicalQubit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

impl From<u32> for PhysicalQubit {
    fn from(id: u32) -> Self {
        PhysicalQubit(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qubit_display() {
        assert_eq!(format!("{}", VirtualQubit(0)), "v0");
        assert_eq!(format!("{}", PhysicalQubit(7)), "p7");
    }

    #[test]
    fn test_qubit_ordering() {
        let mut qubits = vec![PhysicalQubit(3), PhysicalQubit(1), PhysicalQubit(2)];
        qubits.sort();
        assert_eq!(qubits, vec![PhysicalQubit(1), PhysicalQubit(2), PhysicalQubit(3)]);
        assert_eq!(VirtualQubit::from(4).index(), 4);
    }
}
