//! Pass trait and types for compilation passes.

use qroute_ir::Kernel;

use crate::error::CompileResult;
use crate::property::PropertySet;

/// The kind of compilation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Analysis pass that reads but does not modify the kernel.
    Analysis,
    /// Transformation pass that modifies the kernel.
    Transformation,
}

/// A compilation pass that operates on a kernel.
pub trait Pass: Send + Sync {
    /// Get the name of this pass.
    fn name(&self) -> &str;

    /// Get the kind of this pass.
    fn kind(&self) -> PassKind;

    /// Run the pass on the given kernel.
    ///
    /// Analysis passes should not modify the kernel but may write to the
    /// `PropertySet`. Transformation passes modify the kernel and may
    /// publish what they did in the `PropertySet`.
    fn run(&self, kernel: &mut Kernel, properties: &mut PropertySet) -> CompileResult<()>;

    /// Check if this pass should run based on current state.
    fn should_run(&self, _kernel: &Kernel, _properties: &PropertySet) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestPass;

    impl Pass for TestPass {
        fn name(&self) -> &'static str {
            "test"
        }

        fn kind(&self) -> PassKind {
            PassKind::Transformation
        }

        fn run(&self, _kernel: &mut Kernel, _properties: &mut PropertySet) -> CompileResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_pass_kind() {
        let pass = TestPass;
        assert_eq!(pass.kind(), PassKind::Transformation);
        assert_eq!(pass.name(), "test");
        assert!(pass.should_run(&Kernel::new("k"), &PropertySet::new()));
    }
}
