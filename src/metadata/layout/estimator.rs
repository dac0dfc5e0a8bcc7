//! Struct size estimation by simulating the runtime's sequential field packing.
//!
//! Analyzers want to know whether a struct is large enough that copying it around hurts,
//! without loading it into a runtime. The exact CLR layout is not recoverable from reference
//! assemblies, so [`StructSizeEstimator`] replays the packing algorithm instead.
//!
//! # Algorithm
//!
//! All members of the type are walked in declaration order, flattening nested structs into
//! the same walk. Three running values are threaded through, bundled as
//! [`SizeAccumulator`]:
//!
//! - `capacity`: bytes allocated so far, always a whole number of alignment buckets
//! - `largest_field_size`: the largest alignment bucket seen so far
//! - `actual_size`: bytes actually occupied, where the next member would start
//!
//! Each primitive member first widens the bucket if it needs a larger alignment, padding
//! `capacity` to the new bucket. If it does not fit into the remaining capacity, another
//! bucket (or the member's own size if larger) is allocated. When a nested struct ends, its
//! trailing padding is not reused: `actual_size` jumps to `capacity`.
//!
//! # Limitations
//!
//! References inside a struct are packed like pointer-sized primitives. The runtime really
//! moves them to the start of the object when a struct contains references, so estimates for
//! such structs can be off.

use rayon::prelude::*;

use crate::{
    metadata::{
        layout::{find_layout_size, EstimatorConfig, SizeCache},
        typesystem::{PointerSize, PrimitiveKind, TypeOracle},
    },
    Result,
};

/// Running state of one size estimate.
///
/// Invariants: `capacity >= actual_size`, and `largest_field_size` never decreases while a
/// single type is being measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeAccumulator {
    /// Bytes allocated so far, rounded up to alignment buckets
    pub capacity: usize,
    /// Largest alignment bucket seen so far
    pub largest_field_size: usize,
    /// Bytes occupied so far
    pub actual_size: usize,
}

impl SizeAccumulator {
    /// Place a primitive of `size` bytes aligned to `bucket` bytes.
    ///
    /// Zero sized primitives (unknown kinds) leave the accumulator unchanged.
    #[must_use]
    pub fn add_primitive(self, size: usize, bucket: usize) -> Self {
        if size == 0 || bucket == 0 {
            return self;
        }

        let mut next = self;
        if bucket > next.largest_field_size {
            next.largest_field_size = bucket;
            if next.capacity != 0 {
                let padding = (bucket - next.capacity % bucket) % bucket;
                next.capacity += padding;
                next.actual_size = next.capacity;
            }
        }

        if next.actual_size + size > next.capacity {
            next.capacity += size.max(next.largest_field_size);
        }

        next.actual_size += size;
        next
    }

    /// Finish a struct whose members were just placed.
    ///
    /// The rest of the current bucket is given to the struct. An explicit layout size larger
    /// than what is occupied raises both values to it; it never lowers them.
    #[must_use]
    pub fn close_composite(self, layout_size: Option<usize>) -> Self {
        let end = match layout_size {
            Some(size) if size > self.actual_size => self.capacity.max(size),
            _ => self.capacity,
        };

        SizeAccumulator {
            capacity: end,
            actual_size: end,
            ..self
        }
    }
}

/// A member slot as the packing walk sees it
enum LayoutItem<T> {
    Primitive(PrimitiveKind),
    Type(T),
    Unresolved,
}

/// Estimates the in-memory size of value types.
///
/// The estimator is a cheap view over a [`TypeOracle`] and a configuration. Results are
/// stored in the [`SizeCache`] passed to each call, which decides how long they live.
///
/// # Examples
///
/// ```rust
/// use layoutscope::{
///     metadata::typesystem::{Member, PrimitiveKind, TypeRegistry},
///     SizeCache, StructSizeEstimator,
/// };
///
/// let registry = TypeRegistry::new();
/// let byte = registry.primitive(PrimitiveKind::U1);
/// let short = registry.primitive(PrimitiveKind::I2);
/// let id = registry.define_struct(
///     "Test",
///     "Packed",
///     vec![Member::field("a", byte), Member::field("b", short)],
/// )?;
///
/// let scope = SizeCache::new();
/// let estimator = StructSizeEstimator::new(&registry);
/// assert_eq!(estimator.compute_size(&id, &scope), 4);
/// # Ok::<(), layoutscope::Error>(())
/// ```
pub struct StructSizeEstimator<'a, O: TypeOracle> {
    oracle: &'a O,
    config: EstimatorConfig,
}

impl<'a, O: TypeOracle> StructSizeEstimator<'a, O> {
    /// Create an estimator with the default configuration
    pub fn new(oracle: &'a O) -> Self {
        Self::with_config(oracle, EstimatorConfig::default())
    }

    /// Create an estimator with a custom configuration.
    ///
    /// `config` is used as is. A `max_nesting_depth` of 0 ignores every nested member; use
    /// [`StructSizeEstimator::try_with_config`] for configurations that were not built in code.
    pub fn with_config(oracle: &'a O, config: EstimatorConfig) -> Self {
        StructSizeEstimator { oracle, config }
    }

    /// Create an estimator with a custom configuration after validating it
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConfig`] if [`EstimatorConfig::validate`] rejects `config`.
    pub fn try_with_config(oracle: &'a O, config: EstimatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_config(oracle, config))
    }

    /// The configuration in use
    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// The pointer width estimates are made for
    pub fn pointer_size(&self) -> PointerSize {
        self.config
            .pointer_size_override
            .unwrap_or_else(|| self.oracle.target_pointer_size())
    }

    /// Estimated size of `ty` in bytes.
    ///
    /// `ty` is expected to be a value type; for reference types the result is meaningless.
    /// The estimate is stored in `scope` under the pointer width in use, and later calls for
    /// the same type and width are answered from there.
    pub fn compute_size(&self, ty: &O::Type, scope: &SizeCache<O::Type>) -> usize {
        scope.get_or_compute(self.pointer_size(), ty, || {
            let acc = self.accumulate(ty, SizeAccumulator::default(), scope, 0);
            log::trace!(
                "estimated {} bytes (largest field {})",
                acc.capacity,
                acc.largest_field_size
            );
            acc.capacity
        })
    }

    /// Returns whether `ty` is at least `threshold` bytes, together with the estimate
    pub fn is_large_struct(
        &self,
        ty: &O::Type,
        scope: &SizeCache<O::Type>,
        threshold: usize,
    ) -> (bool, usize) {
        let size = self.compute_size(ty, scope);
        (size >= threshold, size)
    }

    /// [`StructSizeEstimator::is_large_struct`] with the configured threshold
    pub fn is_large(&self, ty: &O::Type, scope: &SizeCache<O::Type>) -> (bool, usize) {
        self.is_large_struct(ty, scope, self.config.large_struct_threshold)
    }

    /// Estimate a batch of types in parallel, sharing `scope`.
    ///
    /// Results are returned in the order of `types`.
    pub fn estimate_all(
        &self,
        types: &[O::Type],
        scope: &SizeCache<O::Type>,
    ) -> Vec<(O::Type, usize)>
    where
        O: Sync,
        O::Type: Send + Sync,
    {
        types
            .par_iter()
            .map(|ty| (ty.clone(), self.compute_size(ty, scope)))
            .collect()
    }

    /// Size and alignment bucket of `ty`, if it is laid out as a single primitive
    fn primitive_layout(&self, ty: &O::Type) -> Option<(usize, usize)> {
        let ptr_size = self.pointer_size();

        if let Some(kind) = self.oracle.primitive_kind(ty) {
            return Some((kind.byte_size(ptr_size), kind.alignment_bucket(ptr_size)));
        }

        if self.oracle.is_reference_type(ty) {
            return Some((ptr_size.bytes(), ptr_size.bytes()));
        }

        if let Some(underlying) = self.oracle.enum_underlying_type(ty) {
            return Some(match self.oracle.primitive_kind(&underlying) {
                Some(kind) => (kind.byte_size(ptr_size), kind.alignment_bucket(ptr_size)),
                None => (0, 0),
            });
        }

        None
    }

    fn layout_items(&self, ty: &O::Type) -> Vec<LayoutItem<O::Type>> {
        // Nullable<T> is { bool hasValue; T value; } but its fields are not visible through
        // reference assemblies
        if let Some(underlying) = self.oracle.nullable_underlying_type(ty) {
            return vec![
                LayoutItem::Primitive(PrimitiveKind::Boolean),
                LayoutItem::Type(underlying),
            ];
        }

        self.oracle
            .instance_layout_members(ty)
            .into_iter()
            .map(|member| match member {
                Some(member_ty) => LayoutItem::Type(member_ty),
                None => LayoutItem::Unresolved,
            })
            .collect()
    }

    fn accumulate(
        &self,
        ty: &O::Type,
        acc: SizeAccumulator,
        scope: &SizeCache<O::Type>,
        depth: usize,
    ) -> SizeAccumulator {
        if depth > self.config.max_nesting_depth {
            log::warn!(
                "value type nesting exceeds {} levels, ignoring the remaining members",
                self.config.max_nesting_depth
            );
            return acc;
        }

        if !self.oracle.is_resolved(ty) {
            log::debug!("skipping unresolved type");
            return acc;
        }

        if let Some((size, bucket)) = self.primitive_layout(ty) {
            return acc.add_primitive(size, bucket);
        }

        let items = self.layout_items(ty);
        let mut acc = if items.is_empty() {
            // Empty structs still take up one byte
            acc.add_primitive(1, 1)
        } else {
            acc
        };

        let ptr_size = self.pointer_size();
        for item in items {
            acc = match item {
                LayoutItem::Primitive(kind) => {
                    acc.add_primitive(kind.byte_size(ptr_size), kind.alignment_bucket(ptr_size))
                }
                LayoutItem::Type(member_ty) => self.accumulate(&member_ty, acc, scope, depth + 1),
                LayoutItem::Unresolved => {
                    log::debug!("skipping member of unresolved type");
                    acc
                }
            };
        }

        let layout_size = scope.layout_override(ty, || {
            find_layout_size(self.oracle, ty).map(|found| found.size)
        });
        acc.close_composite(layout_size)
    }
}
