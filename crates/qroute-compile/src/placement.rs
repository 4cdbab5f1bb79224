//! Virtual-to-physical qubit placement.

use std::ops::Index;

use serde::{Deserialize, Serialize};

use qroute_ir::{PhysicalQubit, VirtualQubit};

use crate::error::{CompileError, CompileResult};

/// Marks an unassigned slot.
const UNASSIGNED: u32 = u32::MAX;

/// A mapping between virtual and physical qubits.
///
/// Once seeded with a total assignment, the placement only changes through
/// [`swap`](Self::swap), which keeps it a bijection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// `virt_to_phy[v]` is the physical qubit holding `v`.
    virt_to_phy: Vec<u32>,
    /// `phy_to_virt[p]` is the virtual qubit held by `p`.
    phy_to_virt: Vec<u32>,
}

impl Placement {
    /// Create an empty placement.
    pub fn new(num_virtual: u32, num_physical: u32) -> CompileResult<Self> {
        if num_physical < num_virtual {
            return Err(CompileError::CircuitTooLarge {
                required: num_virtual as usize,
                available: num_physical,
            });
        }
        Ok(Self {
            virt_to_phy: vec![UNASSIGNED; num_virtual as usize],
            phy_to_virt: vec![UNASSIGNED; num_physical as usize],
        })
    }

    /// Create a placement mapping virtual qubit `i` to physical qubit `i`.
    pub fn identity(num_virtual: u32, num_physical: u32) -> CompileResult<Self> {
        let mut placement = Self::new(num_virtual, num_physical)?;
        for i in 0..num_virtual {
            placement.virt_to_phy[i as usize] = i;
            placement.phy_to_virt[i as usize] = i;
        }
        Ok(placement)
    }

    /// Number of virtual qubits.
    pub fn num_virtual(&self) -> usize {
        self.virt_to_phy.len()
    }

    /// Number of physical qubits.
    pub fn num_physical(&self) -> usize {
        self.phy_to_virt.len()
    }

    /// Seed an assignment.
    ///
    /// Both qubits must be in range and still unassigned.
    pub fn map(&mut self, virt: VirtualQubit, phy: PhysicalQubit) -> CompileResult<()> {
        let (v, p) = (virt.index(), phy.index());
        if v >= self.virt_to_phy.len() || p >= self.phy_to_virt.len() {
            return Err(CompileError::InvalidConfiguration(format!(
                "cannot place {virt} on {phy}: out of range"
            )));
        }
        if self.virt_to_phy[v] != UNASSIGNED || self.phy_to_virt[p] != UNASSIGNED {
            return Err(CompileError::InvalidConfiguration(format!(
                "cannot place {virt} on {phy}: already assigned"
            )));
        }
        self.virt_to_phy[v] = phy.0;
        self.phy_to_virt[p] = virt.0;
        Ok(())
    }

    /// Physical qubit holding `virt`.
    #[inline]
    pub fn physical(&self, virt: VirtualQubit) -> Option<PhysicalQubit> {
        match self.virt_to_phy.get(virt.index()) {
            Some(&p) if p != UNASSIGNED => Some(PhysicalQubit(p)),
            _ => None,
        }
    }

    /// Virtual qubit held by `phy`.
    #[inline]
    pub fn virtual_at(&self, phy: PhysicalQubit) -> Option<VirtualQubit> {
        match self.phy_to_virt.get(phy.index()) {
            Some(&v) if v != UNASSIGNED => Some(VirtualQubit(v)),
            _ => None,
        }
    }

    /// Exchange the virtual qubits held by two physical qubits.
    ///
    /// Unassigned physical qubits take part in the exchange as holes.
    pub fn swap(&mut self, a: PhysicalQubit, b: PhysicalQubit) {
        let (va, vb) = (self.phy_to_virt[a.index()], self.phy_to_virt[b.index()]);
        self.phy_to_virt[a.index()] = vb;
        self.phy_to_virt[b.index()] = va;
        if va != UNASSIGNED {
            self.virt_to_phy[va as usize] = b.0;
        }
        if vb != UNASSIGNED {
            self.virt_to_phy[vb as usize] = a.0;
        }
    }

    /// Whether every virtual qubit has a physical qubit.
    pub fn is_complete(&self) -> bool {
        self.virt_to_phy.iter().all(|&p| p != UNASSIGNED)
    }

    /// Whether the two directions agree with each other.
    #[allow(clippy::cast_possible_truncation)]
    pub fn is_bijective(&self) -> bool {
        let forward = self.virt_to_phy.iter().enumerate().all(|(v, &p)| {
            p == UNASSIGNED || self.phy_to_virt.get(p as usize) == Some(&(v as u32))
        });
        let backward = self.phy_to_virt.iter().enumerate().all(|(p, &v)| {
            v == UNASSIGNED || self.virt_to_phy.get(v as usize) == Some(&(p as u32))
        });
        forward && backward
    }

    /// Freeze the assignment of the first `num_original` virtual qubits.
    pub fn freeze(&self, num_original: usize) -> QubitMapping {
        QubitMapping {
            v2p: self
                .virt_to_phy
                .iter()
                .take(num_original)
                .map(|&p| PhysicalQubit(p))
                .collect(),
        }
    }
}

impl Index<VirtualQubit> for Placement {
    type Output = u32;

    /// Raw physical index of `virt`; panics when out of range.
    #[inline]
    fn index(&self, virt: VirtualQubit) -> &u32 {
        &self.virt_to_phy[virt.index()]
    }
}

/// The published virtual-to-physical map.
///
/// Entry `v` is the physical qubit that holds program qubit `v` when the
/// mapped kernel finishes. Device results indexed by physical qubit are
/// put back into program order with `original[v] = device[map[v]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QubitMapping {
    v2p: Vec<PhysicalQubit>,
}

impl QubitMapping {
    /// Create a mapping from raw physical indices.
    pub fn new(v2p: impl IntoIterator<Item = u32>) -> Self {
        Self {
            v2p: v2p.into_iter().map(PhysicalQubit).collect(),
        }
    }

    /// Number of program qubits covered.
    pub fn len(&self) -> usize {
        self.v2p.len()
    }

    /// Whether the mapping covers no qubits.
    pub fn is_empty(&self) -> bool {
        self.v2p.is_empty()
    }

    /// Physical qubit of program qubit `virt`.
    pub fn get(&self, virt: VirtualQubit) -> Option<PhysicalQubit> {
        self.v2p.get(virt.index()).copied()
    }

    /// The map as a slice.
    pub fn as_slice(&self) -> &[PhysicalQubit] {
        &self.v2p
    }

    /// The map as raw physical indices.
    pub fn to_u32_vec(&self) -> Vec<u32> {
        self.v2p.iter().map(|p| p.0).collect()
    }

    /// Put per-physical-qubit device data back into program order.
    ///
    /// Returns `None` if `device` is too short for some mapped qubit.
    pub fn restore<T: Clone>(&self, device: &[T]) -> Option<Vec<T>> {
        self.v2p.iter().map(|p| device.get(p.index()).cloned()).collect()
    }

    /// Put a measurement bitstring back into program order.
    ///
    /// Character `i` of `bits` is the outcome of physical qubit `i`.
    pub fn restore_bitstring(&self, bits: &str) -> Option<String> {
        let chars: Vec<char> = bits.chars().collect();
        self.restore(&chars).map(|c| c.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: u32) -> VirtualQubit {
        VirtualQubit(i)
    }

    fn p(i: u32) -> PhysicalQubit {
        PhysicalQubit(i)
    }

    #[test]
    fn test_identity() {
        let placement = Placement::identity(3, 5).unwrap();
        assert_eq!(placement.physical(v(2)), Some(p(2)));
        assert_eq!(placement.virtual_at(p(1)), Some(v(1)));
        assert_eq!(placement.virtual_at(p(4)), None);
        assert!(placement.is_complete());
        assert!(placement.is_bijective());
        assert_eq!(placement[v(0)], 0);
    }

    #[test]
    fn test_too_small() {
        assert!(matches!(
            Placement::new(4, 3),
            Err(CompileError::CircuitTooLarge {
                required: 4,
                available: 3
            })
        ));
    }

    #[test]
    fn test_map() {
        let mut placement = Placement::new(2, 3).unwrap();
        assert!(!placement.is_complete());
        placement.map(v(0), p(2)).unwrap();
        placement.map(v(1), p(0)).unwrap();
        assert!(placement.is_complete());
        assert!(placement.is_bijective());

        assert!(placement.map(v(0), p(1)).is_err());
        assert!(placement.map(v(1), p(7)).is_err());
    }

    #[test]
    fn test_swap() {
        let mut placement = Placement::identity(3, 3).unwrap();
        placement.swap(p(0), p(2));
        assert_eq!(placement.physical(v(0)), Some(p(2)));
        assert_eq!(placement.physical(v(2)), Some(p(0)));
        assert_eq!(placement.virtual_at(p(0)), Some(v(2)));
        assert!(placement.is_bijective());
    }

    #[test]
    fn test_swap_is_involution() {
        let original = Placement::identity(4, 4).unwrap();
        let mut placement = original.clone();
        placement.swap(p(1), p(3));
        placement.swap(p(1), p(3));
        assert_eq!(placement, original);
    }

    #[test]
    fn test_swap_with_hole() {
        let mut placement = Placement::identity(2, 3).unwrap();
        placement.swap(p(1), p(2));
        assert_eq!(placement.physical(v(1)), Some(p(2)));
        assert_eq!(placement.virtual_at(p(1)), None);
        assert!(placement.is_bijective());
    }

    #[test]
    fn test_freeze_and_restore() {
        let mut placement = Placement::identity(3, 3).unwrap();
        placement.swap(p(0), p(2));
        let mapping = placement.freeze(2);
        assert_eq!(mapping.to_u32_vec(), vec![2, 1]);
        assert_eq!(mapping.get(v(0)), Some(p(2)));

        // Device reports per physical qubit; program qubit 0 sits on p2.
        let device = ["a", "b", "c"];
        assert_eq!(mapping.restore(&device), Some(vec!["c", "b"]));
        assert_eq!(mapping.restore_bitstring("001"), Some("10".to_string()));
        assert_eq!(mapping.restore(&["x"]), None);
    }

    #[test]
    fn test_mapping_json() {
        let mapping = QubitMapping::new([3, 0, 1]);
        assert_eq!(serde_json::to_string(&mapping).unwrap(), "[3,0,1]");
    }
}
