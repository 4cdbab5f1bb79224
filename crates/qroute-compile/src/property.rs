//! `PropertySet` for pass communication.
//!
//! The mapping pass publishes its results here: the [`Device`] it routed
//! onto, the final [`Placement`] and the frozen [`QubitMapping`]. Passes may
//! also exchange arbitrary typed data through custom properties.
//!
//! # Examples
//!
//! ```
//! use qroute_compile::{PropertySet, QubitMapping};
//!
//! let mut props = PropertySet::new();
//! props.mapping = Some(QubitMapping::new([1, 0]));
//! assert_eq!(props.mapping.as_ref().unwrap().to_u32_vec(), vec![1, 0]);
//! ```
//!
//! ## Custom properties
//!
//! ```
//! use qroute_compile::PropertySet;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct SwapBudget(usize);
//!
//! let mut props = PropertySet::new();
//! props.insert(SwapBudget(15));
//!
//! assert_eq!(props.get::<SwapBudget>(), Some(&SwapBudget(15)));
//! ```

use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};

use crate::device::Device;
use crate::placement::{Placement, QubitMapping};

/// Shared context passed through every pass.
#[derive(Debug, Default)]
pub struct PropertySet {
    /// Device the kernel was mapped onto.
    ///
    /// Set by the mapping pass, read by verification.
    pub device: Option<Device>,

    /// Final virtual-to-physical placement, ancillas included.
    pub placement: Option<Placement>,

    /// Published map for the program's own qubits.
    pub mapping: Option<QubitMapping>,

    /// Custom properties storage (type-erased).
    custom: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl PropertySet {
    /// Create a new empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the device up front, e.g. for verifying an already mapped kernel.
    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    /// Insert a custom property.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.custom.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Get a custom property.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.custom
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Get a mutable custom property.
    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.custom
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut())
    }

    /// Remove a custom property.
    pub fn remove<T: Any>(&mut self) -> Option<T> {
        self.custom
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|v| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_device() {
        let props = PropertySet::new().with_device(Device::path(3).unwrap());
        assert_eq!(props.device.as_ref().map(Device::num_qubits), Some(3));
        assert!(props.placement.is_none());
        assert!(props.mapping.is_none());
    }

    #[test]
    #[allow(clippy::items_after_statements)]
    fn test_property_set_custom() {
        let mut props = PropertySet::new();

        #[derive(Debug, PartialEq)]
        struct CustomData(i32);

        props.insert(CustomData(42));
        assert_eq!(props.get::<CustomData>(), Some(&CustomData(42)));

        if let Some(data) = props.get_mut::<CustomData>() {
            data.0 += 1;
        }
        let removed = props.remove::<CustomData>();
        assert_eq!(removed, Some(CustomData(43)));
        assert_eq!(props.get::<CustomData>(), None);
    }
}
