//! Estimator configuration
//!
//! Thresholds and limits applied by the [`crate::StructSizeEstimator`]. Reading these values
//! from `.editorconfig` or any other settings source is up to the host.

use crate::{metadata::typesystem::PointerSize, Error, Result};

/// Structs at or above this many bytes are reported as large by default (five words on a
/// 64-bit target).
pub const DEFAULT_LARGE_STRUCT_THRESHOLD: usize = 40;

/// Default limit for how deep nested value types are followed
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

/// Configuration for struct size estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimatorConfig {
    /// Size in bytes at which [`crate::StructSizeEstimator::is_large_struct`] reports a
    /// struct as large when no explicit threshold is passed
    pub large_struct_threshold: usize,

    /// Maximum depth of nested value types that is followed (default: 64).
    /// Deeper members contribute nothing to the estimate.
    pub max_nesting_depth: usize,

    /// Pointer width to estimate with, instead of the one reported by the type oracle
    pub pointer_size_override: Option<PointerSize>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            large_struct_threshold: DEFAULT_LARGE_STRUCT_THRESHOLD,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            pointer_size_override: None,
        }
    }
}

impl EstimatorConfig {
    /// Configuration that estimates every type as if compiled for a 32-bit target
    #[must_use]
    pub fn x86() -> Self {
        Self {
            pointer_size_override: Some(PointerSize::Bit32),
            ..Self::default()
        }
    }

    /// Configuration that estimates every type as if compiled for a 64-bit target
    #[must_use]
    pub fn x64() -> Self {
        Self {
            pointer_size_override: Some(PointerSize::Bit64),
            ..Self::default()
        }
    }

    /// Set the large struct threshold
    #[must_use]
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.large_struct_threshold = threshold;
        self
    }

    /// Set the maximum nesting depth
    #[must_use]
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Check that the configuration can be used for estimation
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the threshold or the nesting depth is zero.
    pub fn validate(&self) -> Result<()> {
        if self.large_struct_threshold == 0 {
            return Err(Error::InvalidConfig(
                "large_struct_threshold must be at least 1 byte".to_string(),
            ));
        }

        if self.max_nesting_depth == 0 {
            return Err(Error::InvalidConfig(
                "max_nesting_depth must allow at least one level".to_string(),
            ));
        }

        Ok(())
    }
}
