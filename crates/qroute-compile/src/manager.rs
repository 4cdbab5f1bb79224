//! Pass manager for orchestrating compilation.

use tracing::{debug, info, instrument};

use qroute_ir::Kernel;

use crate::config::{DeviceSpec, MappingConfig, SabreOptions};
use crate::error::CompileResult;
use crate::pass::Pass;
use crate::passes::{ConnectivityVerification, MappingPass};
use crate::property::PropertySet;

/// Manages and executes a sequence of compilation passes.
pub struct PassManager {
    /// The passes to execute, in order.
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    /// Create a new empty pass manager.
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// Add a pass to the manager.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes on the given kernel.
    #[instrument(skip(self, kernel, properties), fields(kernel = kernel.name()))]
    pub fn run(&self, kernel: &mut Kernel, properties: &mut PropertySet) -> CompileResult<()> {
        info!(
            "Running pass manager with {} passes on kernel with {} operations",
            self.passes.len(),
            kernel.entry_block().len()
        );

        for pass in &self.passes {
            if pass.should_run(kernel, properties) {
                debug!("Running pass: {}", pass.name());
                pass.run(kernel, properties)?;
                debug!(
                    "Pass {} completed, ops: {}",
                    pass.name(),
                    kernel.entry_block().len()
                );
            } else {
                debug!("Skipping pass: {}", pass.name());
            }
        }

        info!(
            "Pass manager completed, level: {:?}, ops: {}",
            kernel.level(),
            kernel.entry_block().len()
        );

        Ok(())
    }

    /// Get the number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the manager has no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for the standard mapping pipeline.
pub struct PassManagerBuilder {
    /// Target device.
    device: DeviceSpec,
    /// Router parameters.
    options: SabreOptions,
    /// Whether to check connectivity after mapping.
    verify: bool,
}

impl PassManagerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            device: DeviceSpec::default(),
            options: SabreOptions::default(),
            verify: true,
        }
    }

    /// Set the target device.
    #[must_use]
    pub fn with_device(mut self, device: DeviceSpec) -> Self {
        self.device = device;
        self
    }

    /// Set the router parameters.
    #[must_use]
    pub fn with_options(mut self, options: SabreOptions) -> Self {
        self.options = options;
        self
    }

    /// Take device and router parameters from a configuration.
    pub fn with_config(mut self, config: &MappingConfig) -> CompileResult<Self> {
        config.validate()?;
        self.device = config.device_spec()?;
        self.options = config.sabre.clone();
        Ok(self)
    }

    /// Enable or disable the connectivity check after mapping.
    #[must_use]
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Build the pass manager and return it with fresh properties.
    pub fn build(self) -> (PassManager, PropertySet) {
        let mut pm = PassManager::new();
        pm.add_pass(MappingPass::new(self.device).with_options(self.options));
        if self.verify {
            pm.add_pass(ConnectivityVerification);
        }
        (pm, PropertySet::new())
    }
}

impl Default for PassManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qroute_ir::KernelLevel;

    #[test]
    fn test_empty_pass_manager() {
        let pm = PassManager::new();
        assert!(pm.is_empty());
        assert_eq!(pm.len(), 0);
    }

    #[test]
    fn test_pass_manager_run() {
        let pm = PassManager::new();
        let mut props = PropertySet::new();

        let mut kernel = Kernel::new("test");
        let q0 = kernel.alloc();
        let q1 = kernel.alloc();
        let q0 = kernel.h(q0).unwrap();
        kernel.cx(q0, q1).unwrap();

        pm.run(&mut kernel, &mut props).unwrap();
        assert_eq!(kernel.entry_block().len(), 4);
        assert_eq!(kernel.level(), KernelLevel::Logical);
    }

    #[test]
    fn test_pass_manager_builder() {
        let (pm, props) = PassManagerBuilder::new()
            .with_device(DeviceSpec::Ring(Some(5)))
            .build();
        assert_eq!(pm.len(), 2);
        assert!(props.device.is_none());

        let (pm, _) = PassManagerBuilder::new().with_verification(false).build();
        assert_eq!(pm.len(), 1);
    }

    #[test]
    fn test_builder_with_config() {
        let config = MappingConfig::from_yaml_str("device: grid(2)\n").unwrap();
        let (pm, mut props) = PassManagerBuilder::new()
            .with_config(&config)
            .unwrap()
            .build();

        let mut kernel = Kernel::new("bell");
        let q0 = kernel.alloc();
        let q1 = kernel.alloc();
        kernel.cx(q0, q1).unwrap();

        pm.run(&mut kernel, &mut props).unwrap();
        assert_eq!(kernel.level(), KernelLevel::Physical);
        assert_eq!(props.device.as_ref().map(|d| d.num_qubits()), Some(4));

        let bad = MappingConfig {
            device: "hexagon".into(),
            ..MappingConfig::default()
        };
        assert!(PassManagerBuilder::new().with_config(&bad).is_err());
    }
}
