//! Type metadata and the layout estimation built on top of it.
//!
//! # Key Components
//!
//! - [`typesystem`] - The [`typesystem::TypeOracle`] seam, primitive sizes and an in-memory
//!   type registry
//! - [`layout`] - Struct size estimation, caching and configuration
//!
//! # Examples
//!
//! ```rust
//! use layoutscope::metadata::{
//!     layout::{SizeCache, StructSizeEstimator},
//!     typesystem::{PrimitiveKind, TypeRegistry},
//! };
//!
//! let registry = TypeRegistry::new();
//! let decimal = registry.primitive(PrimitiveKind::Decimal);
//!
//! let estimator = StructSizeEstimator::new(&registry);
//! assert_eq!(estimator.compute_size(&decimal, &SizeCache::new()), 16);
//! ```

/// Value type layout estimation
pub mod layout;
/// Implementation of the type model consumed by the estimator
pub mod typesystem;
