//! Type information consumed by the layout estimator.
//!
//! The estimator never owns a type model. It asks questions through the [`TypeOracle`] trait
//! and this module provides the vocabulary for those questions, plus one concrete model.
//!
//! # Key Components
//!
//! - [`TypeOracle`]: The read-only interface a host type system implements
//! - [`Member`]: A field or property as seen by the layout code
//! - [`PrimitiveKind`]: Built-in value types with runtime-defined sizes
//! - [`PointerSize`]: Pointer width of the compilation target
//! - [`TypeRegistry`]: Thread-safe in-memory [`TypeOracle`] implementation
//!
//! # Examples
//!
//! ```rust
//! use layoutscope::metadata::typesystem::{Member, PrimitiveKind, TypeOracle, TypeRegistry};
//!
//! let registry = TypeRegistry::new();
//! let int64 = registry.primitive(PrimitiveKind::I8);
//! let id = registry.define_struct(
//!     "Test",
//!     "Sample",
//!     vec![
//!         Member::field("_value", int64),
//!         Member::computed_property("Doubled", int64),
//!     ],
//! )?;
//!
//! // Computed properties have no backing storage
//! assert_eq!(registry.instance_layout_members(&id).len(), 1);
//! # Ok::<(), layoutscope::Error>(())
//! ```

mod oracle;
mod primitives;
mod registry;

pub use oracle::{Member, MemberKind, TypeOracle};
pub use primitives::{PointerSize, PrimitiveKind};
pub use registry::{TypeDef, TypeDefRc, TypeFlavor, TypeId, TypeRegistry};
