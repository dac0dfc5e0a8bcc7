//! Fixtures shared by the unit tests.

use crate::metadata::typesystem::{Member, PrimitiveKind, TypeId, TypeRegistry};

/// Define `Test.<name>` with one field per entry of `fields`, named `f0`, `f1`, ...
pub fn struct_of(registry: &TypeRegistry, name: &str, fields: &[PrimitiveKind]) -> TypeId {
    let members = fields
        .iter()
        .enumerate()
        .map(|(index, kind)| Member::field(format!("f{index}"), registry.primitive(*kind)))
        .collect();

    registry
        .define_struct("Test", name, members)
        .expect("fixture names are unique per registry")
}
