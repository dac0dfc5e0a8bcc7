//! Primitive types and their natural sizes.
//!
//! The runtime lays out a handful of built-in value types with fixed sizes that do not
//! depend on any user declaration. [`PrimitiveKind`] enumerates those types and
//! [`PrimitiveKind::byte_size`] / [`PrimitiveKind::alignment_bucket`] form the size table
//! the estimator packs with.
//!
//! # Pointer-width dependent types
//!
//! `System.IntPtr`, `System.UIntPtr`, unmanaged pointers and every reference stored inside
//! a value type occupy one machine word. The word size comes from [`PointerSize`], which is
//! a property of the compilation target rather than of the type.
//!
//! # Decimal
//!
//! `System.Decimal` is 16 bytes, but it is composed of four 32-bit integers internally, so
//! the runtime only aligns it on a 4 byte boundary. Its contributed size and its alignment
//! bucket therefore differ, and it is the only kind where they do.

use std::fmt;

use strum::{EnumCount, EnumIter};

/// The pointer width of the compilation target.
///
/// Roslyn exposes this through the `Platform` compilation option: `x86` and `arm` are 32-bit,
/// `x64` and `arm64` are 64-bit and `AnyCpu` leaves it open. An open platform is estimated as
/// 64-bit, which is what the overwhelming majority of processes run as today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PointerSize {
    /// 4 byte pointers
    Bit32,
    /// 8 byte pointers
    Bit64,
    /// Target platform not specified (`AnyCpu`)
    #[default]
    Unknown,
}

impl PointerSize {
    /// Size of a machine word on this target, in bytes
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            PointerSize::Bit32 => 4,
            PointerSize::Bit64 | PointerSize::Unknown => 8,
        }
    }
}

impl fmt::Display for PointerSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointerSize::Bit32 => write!(f, "32-bit"),
            PointerSize::Bit64 => write!(f, "64-bit"),
            PointerSize::Unknown => write!(f, "any-cpu"),
        }
    }
}

/// Built-in value types with a size fixed by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum PrimitiveKind {
    /// System.Boolean
    Boolean,
    /// System.Char - UTF-16 code unit
    Char,
    /// System.SByte
    I1,
    /// System.Byte
    U1,
    /// System.Int16
    I2,
    /// System.UInt16
    U2,
    /// System.Int32
    I4,
    /// System.UInt32
    U4,
    /// System.Int64
    I8,
    /// System.UInt64
    U8,
    /// System.Single
    R4,
    /// System.Double
    R8,
    /// System.Decimal
    Decimal,
    /// System.DateTime - a single 64-bit tick count
    DateTime,
    /// System.IntPtr
    I,
    /// System.UIntPtr
    U,
    /// Unmanaged data or function pointer
    Pointer,
}

impl PrimitiveKind {
    /// The size the value contributes to its containing type, in bytes.
    #[must_use]
    pub const fn byte_size(self, ptr_size: PointerSize) -> usize {
        match self {
            PrimitiveKind::Boolean | PrimitiveKind::I1 | PrimitiveKind::U1 => 1,
            PrimitiveKind::Char | PrimitiveKind::I2 | PrimitiveKind::U2 => 2,
            PrimitiveKind::I4 | PrimitiveKind::U4 | PrimitiveKind::R4 => 4,
            PrimitiveKind::I8 | PrimitiveKind::U8 | PrimitiveKind::R8 | PrimitiveKind::DateTime => {
                8
            }
            PrimitiveKind::Decimal => 16,
            PrimitiveKind::I | PrimitiveKind::U | PrimitiveKind::Pointer => ptr_size.bytes(),
        }
    }

    /// The alignment the runtime applies to this value, in bytes.
    ///
    /// Equal to [`PrimitiveKind::byte_size`] for everything but `decimal`.
    #[must_use]
    pub const fn alignment_bucket(self, ptr_size: PointerSize) -> usize {
        match self {
            PrimitiveKind::Decimal => 4,
            _ => self.byte_size(ptr_size),
        }
    }

    /// Returns true for the integral kinds an enum may be based on
    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Boolean
                | PrimitiveKind::Char
                | PrimitiveKind::I1
                | PrimitiveKind::U1
                | PrimitiveKind::I2
                | PrimitiveKind::U2
                | PrimitiveKind::I4
                | PrimitiveKind::U4
                | PrimitiveKind::I8
                | PrimitiveKind::U8
                | PrimitiveKind::I
                | PrimitiveKind::U
        )
    }

    /// The namespace-qualified runtime name of this kind
    #[must_use]
    pub const fn fullname(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "System.Boolean",
            PrimitiveKind::Char => "System.Char",
            PrimitiveKind::I1 => "System.SByte",
            PrimitiveKind::U1 => "System.Byte",
            PrimitiveKind::I2 => "System.Int16",
            PrimitiveKind::U2 => "System.UInt16",
            PrimitiveKind::I4 => "System.Int32",
            PrimitiveKind::U4 => "System.UInt32",
            PrimitiveKind::I8 => "System.Int64",
            PrimitiveKind::U8 => "System.UInt64",
            PrimitiveKind::R4 => "System.Single",
            PrimitiveKind::R8 => "System.Double",
            PrimitiveKind::Decimal => "System.Decimal",
            PrimitiveKind::DateTime => "System.DateTime",
            PrimitiveKind::I => "System.IntPtr",
            PrimitiveKind::U => "System.UIntPtr",
            PrimitiveKind::Pointer => "System.Void*",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.fullname())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn natural_sizes() {
        let ptr = PointerSize::Bit64;
        assert_eq!(PrimitiveKind::Boolean.byte_size(ptr), 1);
        assert_eq!(PrimitiveKind::Char.byte_size(ptr), 2);
        assert_eq!(PrimitiveKind::I4.byte_size(ptr), 4);
        assert_eq!(PrimitiveKind::R4.byte_size(ptr), 4);
        assert_eq!(PrimitiveKind::I8.byte_size(ptr), 8);
        assert_eq!(PrimitiveKind::DateTime.byte_size(ptr), 8);
        assert_eq!(PrimitiveKind::Decimal.byte_size(ptr), 16);
    }

    #[test]
    fn pointer_sized_kinds_follow_target() {
        for kind in [PrimitiveKind::I, PrimitiveKind::U, PrimitiveKind::Pointer] {
            assert_eq!(kind.byte_size(PointerSize::Bit32), 4);
            assert_eq!(kind.byte_size(PointerSize::Bit64), 8);
            assert_eq!(kind.byte_size(PointerSize::Unknown), 8);
        }
    }

    #[test]
    fn only_decimal_has_a_smaller_bucket() {
        for kind in PrimitiveKind::iter() {
            let size = kind.byte_size(PointerSize::Bit64);
            let bucket = kind.alignment_bucket(PointerSize::Bit64);
            if kind == PrimitiveKind::Decimal {
                assert_eq!(bucket, 4);
            } else {
                assert_eq!(size, bucket, "{kind}");
            }
        }
    }

    #[test]
    fn floating_point_and_decimal_are_not_integral() {
        assert!(!PrimitiveKind::R4.is_integral());
        assert!(!PrimitiveKind::R8.is_integral());
        assert!(!PrimitiveKind::Decimal.is_integral());
        assert!(!PrimitiveKind::DateTime.is_integral());
        assert!(PrimitiveKind::U8.is_integral());
        assert_eq!(PrimitiveKind::COUNT, 17);
    }
}
