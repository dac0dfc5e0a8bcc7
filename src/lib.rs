// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # layoutscope
//!
//! Offline estimation of .NET value type sizes.
//!
//! Static analyzers regularly need to know whether a struct is "large": large structs passed
//! by value or copied into readonly fields are a classic performance trap. The real layout is
//! only known once the runtime loads the type, and reference assemblies strip most of the
//! information the runtime would use. `layoutscope` replays the runtime's sequential field
//! packing over the declarations a compiler can see and produces a size estimate, without
//! loading anything.
//!
//! ## Features
//!
//! - **Packing simulation** - Alignment buckets, padding and nested struct flattening
//! - **Runtime special cases** - `decimal` alignment, `Nullable<T>`, enums, empty structs
//! - **Platform aware** - 32-bit and 64-bit pointer widths
//! - **Explicit sizes** - `[StructLayout(Size = N)]` and `ClassLayout` metadata rows
//! - **Session caching** - Concurrent per-compilation caches with explicit lifetimes
//!
//! ## Quick Start
//!
//! ```rust
//! use layoutscope::prelude::*;
//!
//! let registry = TypeRegistry::new();
//! let int32 = registry.primitive(PrimitiveKind::I4);
//! let byte = registry.primitive(PrimitiveKind::U1);
//! let short = registry.primitive(PrimitiveKind::I2);
//!
//! let id = registry.define_struct(
//!     "Sample",
//!     "Mixed",
//!     vec![
//!         Member::field("a", int32),
//!         Member::field("b", byte),
//!         Member::field("c", byte),
//!         Member::field("d", short),
//!     ],
//! )?;
//!
//! let scope = SizeCache::new();
//! let estimator = StructSizeEstimator::new(&registry);
//! assert_eq!(estimator.compute_size(&id, &scope), 8);
//! # Ok::<(), layoutscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata::typesystem`] - The [`metadata::typesystem::TypeOracle`] trait through which
//!   the estimator reads types, and an in-memory implementation of it
//! - [`metadata::layout`] - The estimator, its caches and its configuration
//! - [`Error`] and [`Result`] - Error handling for the code around the estimator
//!
//! ## Integrating a Type System
//!
//! Hosts with their own type model (a compiler's semantic model, a metadata reader) implement
//! [`metadata::typesystem::TypeOracle`] for it. The estimator only ever calls the read-only
//! queries on that trait and is otherwise independent of where types come from.
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade and never installs a logger. Skipped members and
//! the nesting limit are reported at `debug` and `warn` level respectively.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use layoutscope::prelude::*;
///
/// let registry = TypeRegistry::new();
/// let estimator = StructSizeEstimator::new(&registry);
/// let size = estimator.compute_size(&registry.primitive(PrimitiveKind::I8), &SizeCache::new());
/// assert_eq!(size, 8);
/// ```
pub mod prelude;

/// Type model and layout estimation
///
/// # Key Components
///
/// - [`metadata::typesystem::TypeOracle`] - Read-only interface to a host type system
/// - [`metadata::typesystem::TypeRegistry`] - In-memory type system
/// - [`metadata::layout::StructSizeEstimator`] - The size estimator
pub mod metadata;

/// `layoutscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `layoutscope` Error type
///
/// # Examples
///
/// ```rust
/// use layoutscope::{metadata::typesystem::TypeRegistry, Error};
///
/// let registry = TypeRegistry::new();
/// registry.define_struct("Sample", "Twice", vec![])?;
/// match registry.define_struct("Sample", "Twice", vec![]) {
///     Err(Error::TypeInsert(_)) => println!("already defined"),
///     other => panic!("unexpected {:?}", other.map(|_| ())),
/// }
/// # Ok::<(), layoutscope::Error>(())
/// ```
pub use error::Error;

/// The size estimator and its collaborators.
///
/// See [`metadata::layout`] for details.
pub use metadata::layout::{
    CacheScopes, CacheStats, EstimatorConfig, SizeAccumulator, SizeCache, StructSizeEstimator,
};
