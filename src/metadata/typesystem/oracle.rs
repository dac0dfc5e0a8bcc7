//! The questions the estimator asks about types.
//!
//! Type information is owned by whoever hosts the estimator: a compiler's semantic model, a
//! metadata reader, or the in-memory [`crate::metadata::typesystem::TypeRegistry`]. The
//! [`TypeOracle`] trait is the seam between that owner and the layout code. Every method is
//! a read-only query; implementations must be callable from several threads at once.

use std::hash::Hash;

use crate::metadata::typesystem::{PointerSize, PrimitiveKind};

/// How a member is declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// A field declaration
    Field,
    /// A property declaration
    Property {
        /// `true` for `{ get; }` style properties without a getter body, which the compiler
        /// backs with a synthesized field
        auto: bool,
        /// `true` if the property declares a setter or `init` accessor
        has_setter: bool,
    },
}

/// A member of a type, in the shape the layout code needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member<T> {
    /// Declared member name
    pub name: String,
    /// Declared type of the member, `None` if the host could not resolve it
    pub ty: Option<T>,
    /// Field or property
    pub kind: MemberKind,
    /// `static` members do not occupy space in instances
    pub is_static: bool,
}

impl<T> Member<T> {
    /// Create an instance field
    pub fn field(name: impl Into<String>, ty: T) -> Self {
        Member {
            name: name.into(),
            ty: Some(ty),
            kind: MemberKind::Field,
            is_static: false,
        }
    }

    /// Create a get-only auto-property (`public int X { get; }`)
    pub fn auto_property(name: impl Into<String>, ty: T) -> Self {
        Member {
            name: name.into(),
            ty: Some(ty),
            kind: MemberKind::Property {
                auto: true,
                has_setter: false,
            },
            is_static: false,
        }
    }

    /// Create a computed property (`public int X => _x * 2;`)
    pub fn computed_property(name: impl Into<String>, ty: T) -> Self {
        Member {
            name: name.into(),
            ty: Some(ty),
            kind: MemberKind::Property {
                auto: false,
                has_setter: false,
            },
            is_static: false,
        }
    }

    /// Create a field whose type the host failed to resolve
    pub fn unresolved(name: impl Into<String>) -> Self {
        Member {
            name: name.into(),
            ty: None,
            kind: MemberKind::Field,
            is_static: false,
        }
    }

    /// Mark this member as `static`
    #[must_use]
    pub fn into_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Returns true if this member occupies storage in every instance of its declaring type.
    ///
    /// Instance fields always do. Of the properties, only get-only auto-properties are
    /// counted: the compiler synthesizes a backing field for them, while computed properties
    /// have no storage at all.
    #[must_use]
    pub fn occupies_instance_storage(&self) -> bool {
        if self.is_static {
            return false;
        }

        match self.kind {
            MemberKind::Field => true,
            MemberKind::Property { auto, has_setter } => auto && !has_setter,
        }
    }
}

/// Read-only view of a type system, as consumed by the struct size estimator.
///
/// `Type` is the host's handle for a type. It is used as a cache key, so two handles that
/// refer to the same type must compare equal and hash identically.
pub trait TypeOracle {
    /// Handle identifying a type
    type Type: Clone + Eq + Hash;

    /// The pointer width of the compilation target
    fn target_pointer_size(&self) -> PointerSize;

    /// Returns false if the handle does not refer to a type the host knows about
    fn is_resolved(&self, _ty: &Self::Type) -> bool {
        true
    }

    /// The primitive kind of `ty`, if it is one of the fixed-size built-in types
    fn primitive_kind(&self, ty: &Self::Type) -> Option<PrimitiveKind>;

    /// Returns true for classes, interfaces, delegates, arrays and strings
    fn is_reference_type(&self, ty: &Self::Type) -> bool;

    /// The underlying integral type if `ty` is an enum
    fn enum_underlying_type(&self, ty: &Self::Type) -> Option<Self::Type>;

    /// The wrapped type if `ty` is a `System.Nullable<T>` instantiation
    fn nullable_underlying_type(&self, ty: &Self::Type) -> Option<Self::Type>;

    /// All members of `ty` in declaration order, including static and computed ones
    fn members(&self, ty: &Self::Type) -> Vec<Member<Self::Type>>;

    /// `Size` from a `[StructLayout]` attribute applied to `ty` in source
    fn explicit_layout_size(&self, ty: &Self::Type) -> Option<u32>;

    /// `ClassSize` from the `ClassLayout` metadata row of `ty`.
    ///
    /// Reference assemblies drop the `[StructLayout]` attribute but keep the metadata row, so
    /// this is consulted when the attribute is absent.
    fn metadata_class_size(&self, _ty: &Self::Type) -> Option<u32> {
        None
    }

    /// Returns true if `ty` is an enum
    fn is_enum(&self, ty: &Self::Type) -> bool {
        self.enum_underlying_type(ty).is_some()
    }

    /// Returns true if `ty` is a `System.Nullable<T>` instantiation
    fn is_nullable_wrapper(&self, ty: &Self::Type) -> bool {
        self.nullable_underlying_type(ty).is_some()
    }

    /// The types of the members of `ty` that take up instance storage, in declaration order.
    ///
    /// Members whose type could not be resolved are kept as `None` so the caller can decide
    /// how to account for them.
    fn instance_layout_members(&self, ty: &Self::Type) -> Vec<Option<Self::Type>> {
        self.members(ty)
            .into_iter()
            .filter(Member::occupies_instance_storage)
            .map(|member| member.ty)
            .collect()
    }
}
