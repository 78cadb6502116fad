//! Evaluation settings.

use linexpr_kernel::threading::MIN_PARALLEL_WORK;
use linexpr_kernel::Parallelism;

/// How the evaluator treats expressions that may read their own target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AliasCheck {
    /// Compare the memory ranges of aliased operands against the target and
    /// buffer only on partial overlap.
    #[default]
    Dynamic,
    /// Trust the caller: elementwise expressions are written directly even if
    /// an aliased operand partially overlaps the target.
    Off,
}

/// Configuration for one assignment.
///
/// The defaults are what `assign`, `add_assign` and friends use; the `_with`
/// variants take an explicit configuration.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Run-time overlap check for aliased elementwise expressions.
    pub alias_check: AliasCheck,
    /// Split large assignments across rayon workers (needs the `parallel` feature).
    pub parallel: bool,
    /// Minimum number of scalar operations before work is split.
    pub parallel_threshold: usize,
    /// Let products delegate to BLAS or faer when those features are on.
    pub use_blas: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            alias_check: AliasCheck::Dynamic,
            parallel: cfg!(feature = "parallel"),
            parallel_threshold: MIN_PARALLEL_WORK,
            use_blas: true,
        }
    }
}

impl EvalConfig {
    /// Single-threaded evaluation with default settings otherwise.
    pub fn serial() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Set the alias check mode.
    pub fn with_alias_check(mut self, mode: AliasCheck) -> Self {
        self.alias_check = mode;
        self
    }

    /// Enable or disable parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the work threshold for parallel splitting.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Allow or forbid accelerated product backends.
    pub fn with_blas(mut self, use_blas: bool) -> Self {
        self.use_blas = use_blas;
        self
    }

    /// Whether an assignment of `work` scalar operations should be split.
    pub(crate) fn splits(&self, work: usize) -> bool {
        cfg!(feature = "parallel") && self.parallel && work >= self.parallel_threshold
    }

    /// Kernel parallelism for products.
    pub(crate) fn kernel_parallelism(&self) -> Parallelism {
        if cfg!(feature = "parallel") && self.parallel {
            Parallelism::Rayon {
                threshold: self.parallel_threshold,
            }
        } else {
            Parallelism::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EvalConfig::default();
        assert_eq!(cfg.alias_check, AliasCheck::Dynamic);
        assert_eq!(cfg.parallel_threshold, MIN_PARALLEL_WORK);
        assert!(cfg.use_blas);
        assert_eq!(cfg.parallel, cfg!(feature = "parallel"));
    }

    #[test]
    fn test_serial_never_splits() {
        let cfg = EvalConfig::serial().with_parallel_threshold(1);
        assert!(!cfg.splits(usize::MAX));
        assert_eq!(cfg.kernel_parallelism(), Parallelism::None);
    }

    #[test]
    fn test_builder() {
        let cfg = EvalConfig::default()
            .with_alias_check(AliasCheck::Off)
            .with_blas(false)
            .with_parallel(true)
            .with_parallel_threshold(10);
        assert_eq!(cfg.alias_check, AliasCheck::Off);
        assert!(!cfg.use_blas);
        assert_eq!(cfg.splits(10), cfg!(feature = "parallel"));
        assert!(!cfg.splits(9));
    }
}
