//! Value type layout estimation.
//!
//! This module estimates how many bytes a .NET struct occupies at runtime, using nothing but
//! the declarations visible to a compiler. It exists for analyzers that flag large structs
//! passed by value, where loading the type into a runtime is not an option.
//!
//! # Key Components
//!
//! - [`StructSizeEstimator`]: Simulates the runtime's sequential packing of fields
//! - [`SizeAccumulator`]: The running state of one simulation
//! - [`SizeCache`]: Per-session store of finished estimates
//! - [`CacheScopes`]: One [`SizeCache`] per session id
//! - [`EstimatorConfig`]: Thresholds and limits
//! - [`find_layout_size`]: Explicit `[StructLayout(Size = N)]` / `ClassLayout` lookup
//!
//! # Examples
//!
//! ```rust
//! use layoutscope::{
//!     metadata::typesystem::{Member, PrimitiveKind, TypeRegistry},
//!     CacheScopes, StructSizeEstimator,
//! };
//!
//! let registry = TypeRegistry::new();
//! let long = registry.primitive(PrimitiveKind::I8);
//! let byte = registry.primitive(PrimitiveKind::U1);
//! let id = registry.define_struct(
//!     "Test",
//!     "Padded",
//!     vec![Member::field("a", long), Member::field("b", byte)],
//! )?;
//!
//! let scopes = CacheScopes::new();
//! let scope = scopes.open("compilation-1");
//! let estimator = StructSizeEstimator::new(&registry);
//!
//! let (large, size) = estimator.is_large_struct(&id, &scope, 16);
//! assert!(large);
//! assert_eq!(size, 16);
//!
//! scopes.dispose(&"compilation-1");
//! # Ok::<(), layoutscope::Error>(())
//! ```

mod cache;
mod config;
mod estimator;
mod layoutsize;

pub use cache::{CacheScopes, CacheStats, SizeCache};
pub use config::{EstimatorConfig, DEFAULT_LARGE_STRUCT_THRESHOLD, DEFAULT_MAX_NESTING_DEPTH};
pub use estimator::{SizeAccumulator, StructSizeEstimator};
pub use layoutsize::{find_layout_size, LayoutSize, LayoutSizeSource, MAX_CLASS_SIZE};
