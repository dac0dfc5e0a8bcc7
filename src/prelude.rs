//! # layoutscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the layoutscope library. Import this module to get quick access to everything needed
//! to describe types and estimate their sizes.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all layoutscope operations
pub use crate::Error;

/// The result type used throughout layoutscope
pub use crate::Result;

// ================================================================================================
// Type System
// ================================================================================================

/// The read-only interface the estimator consumes
pub use crate::metadata::typesystem::TypeOracle;

/// Members and built-in types
pub use crate::metadata::typesystem::{Member, MemberKind, PointerSize, PrimitiveKind};

/// In-memory type system
pub use crate::metadata::typesystem::{TypeDef, TypeFlavor, TypeId, TypeRegistry};

// ================================================================================================
// Layout Estimation
// ================================================================================================

/// Size estimation, caching and configuration
pub use crate::metadata::layout::{
    CacheScopes, CacheStats, EstimatorConfig, SizeAccumulator, SizeCache, StructSizeEstimator,
};

/// Explicit layout sizes
pub use crate::metadata::layout::{find_layout_size, LayoutSize, LayoutSizeSource};
