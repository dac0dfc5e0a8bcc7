//! Explicit layout size lookup.
//!
//! A struct can fix its own size with `[StructLayout(LayoutKind.Sequential, Size = N)]`. The
//! runtime never makes such a type smaller than its fields need, but it does pad it up to
//! `N`. The size reaches the estimator through two channels:
//!
//! - The attribute itself, when the struct is declared in source
//! - The `ClassLayout` metadata row (ECMA-335 II.22.8), when the struct comes from a
//!   reference assembly; those have the attribute stripped but keep the row
//!
//! A size of `0` means "no explicit size" in both places.

use crate::metadata::typesystem::TypeOracle;

/// Largest class size the runtime accepts (256MB)
pub const MAX_CLASS_SIZE: u32 = 0x1000_0000;

/// Where an explicit layout size was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutSizeSource {
    /// `Size` of a `[StructLayout]` attribute
    Attribute,
    /// `ClassSize` of the `ClassLayout` metadata row
    ClassLayout,
}

/// An explicit layout size together with its origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSize {
    /// Size in bytes
    pub size: usize,
    /// Where the size was declared
    pub source: LayoutSizeSource,
}

/// Find the explicit layout size of `ty`, if it declares a usable one.
///
/// The attribute wins over the metadata row. Sizes of `0` and sizes above
/// [`MAX_CLASS_SIZE`] are treated as absent.
pub fn find_layout_size<O: TypeOracle>(oracle: &O, ty: &O::Type) -> Option<LayoutSize> {
    let candidates = [
        (oracle.explicit_layout_size(ty), LayoutSizeSource::Attribute),
        (oracle.metadata_class_size(ty), LayoutSizeSource::ClassLayout),
    ];

    candidates
        .into_iter()
        .find_map(|(size, source)| match size {
            Some(0) | None => None,
            Some(size) if size > MAX_CLASS_SIZE => {
                log::debug!("ignoring {source:?} size {size} above the runtime limit");
                None
            }
            Some(size) => Some(LayoutSize {
                size: size as usize,
                source,
            }),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::typesystem::{PrimitiveKind, TypeRegistry};

    #[test]
    fn test_no_layout_size() {
        let registry = TypeRegistry::new();
        let id = registry.define_struct("Test", "Plain", vec![]).unwrap();
        assert_eq!(find_layout_size(&registry, &id), None);

        let int32 = registry.primitive(PrimitiveKind::I4);
        assert_eq!(find_layout_size(&registry, &int32), None);
    }

    #[test]
    fn test_attribute_wins_over_class_layout() {
        let registry = TypeRegistry::new();
        let id = registry.define_struct("Test", "Both", vec![]).unwrap();
        registry.set_layout_size(id, 48).unwrap();
        registry.set_class_size(id, 24).unwrap();

        assert_eq!(
            find_layout_size(&registry, &id),
            Some(LayoutSize {
                size: 48,
                source: LayoutSizeSource::Attribute
            })
        );
    }

    #[test]
    fn test_class_layout_fallback() {
        let registry = TypeRegistry::new();
        let id = registry.define_struct("Test", "RefAsm", vec![]).unwrap();
        registry.set_layout_size(id, 0).unwrap();
        registry.set_class_size(id, 24).unwrap();

        let found = find_layout_size(&registry, &id).unwrap();
        assert_eq!(found.size, 24);
        assert_eq!(found.source, LayoutSizeSource::ClassLayout);
    }

    #[test]
    fn test_oversized_values_ignored() {
        let registry = TypeRegistry::new();
        let id = registry.define_struct("Test", "Huge", vec![]).unwrap();
        registry.set_layout_size(id, MAX_CLASS_SIZE + 1).unwrap();
        assert_eq!(find_layout_size(&registry, &id), None);

        let id = registry.define_struct("Test", "AtLimit", vec![]).unwrap();
        registry.set_class_size(id, MAX_CLASS_SIZE).unwrap();
        assert_eq!(
            find_layout_size(&registry, &id).map(|found| found.size),
            Some(MAX_CLASS_SIZE as usize)
        );
    }
}
