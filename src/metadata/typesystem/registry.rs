//! In-memory type registry.
//!
//! This module provides the [`TypeRegistry`], a thread-safe store of value type definitions
//! that implements [`TypeOracle`]. Hosts that already own a type model implement the oracle
//! directly; everyone else (tools, benchmarks, tests) describes their types here.
//!
//! # Registry Architecture
//!
//! - **Id-based lookup**: Primary index using [`TypeId`]
//! - **Name-based lookup**: Secondary index on the full name (namespace.name)
//! - **Primitive types**: Pre-registered under reserved ids in the `0xF000_0000` range
//!
//! # Thread Safety
//!
//! The registry uses `DashMap` for both indices and an atomic counter for id generation.
//! A definition claims its full name and its id under the shard locks of both indices, so
//! concurrent definitions of the same name cannot both succeed.
//! Member lists are append-only `boxcar::Vec`s, so members can be attached to a type that
//! other threads are already reading. Layout sizes are write-once.
//!
//! # Examples
//!
//! ```rust
//! use layoutscope::metadata::typesystem::{Member, PrimitiveKind, TypeRegistry};
//!
//! let registry = TypeRegistry::new();
//! let int32 = registry.primitive(PrimitiveKind::I4);
//! let point = registry.define_struct(
//!     "Geometry",
//!     "Point",
//!     vec![Member::field("X", int32), Member::field("Y", int32)],
//! )?;
//!
//! assert_eq!(registry.get(point)?.fullname(), "Geometry.Point");
//! # Ok::<(), layoutscope::Error>(())
//! ```

use std::{
    fmt,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, OnceLock,
    },
};

use dashmap::{mapref::entry::Entry, DashMap};
use strum::IntoEnumIterator;

use crate::{
    metadata::typesystem::{Member, PointerSize, PrimitiveKind, TypeOracle},
    Error::{TypeInsert, TypeNotFound},
    Result,
};

/// Identifies a type within a [`TypeRegistry`].
///
/// The high byte tells the origin of the id apart: `0x02` for user definitions (mirroring the
/// `TypeDef` table) and `0xF0` for the reserved built-in types.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(u32);

impl TypeId {
    /// Creates an id from a raw 32-bit value
    #[must_use]
    pub const fn new(value: u32) -> Self {
        TypeId(value)
    }

    /// Returns the raw id value
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Returns true if the id is in the range reserved for built-in types
    #[must_use]
    pub const fn is_builtin(&self) -> bool {
        (self.0 >> 24) == 0xF0
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId(0x{:08x})", self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

const USER_TYPE_BASE: u32 = 0x0200_0001;
const OBJECT_ID: TypeId = TypeId(0xF000_0100);
const STRING_ID: TypeId = TypeId(0xF000_0101);

/// What kind of type a [`TypeDef`] describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFlavor {
    /// A built-in fixed size type
    Primitive(PrimitiveKind),
    /// A user defined struct
    ValueType,
    /// An enum and its underlying integral type
    Enum {
        /// The integral type the enum is stored as
        underlying: TypeId,
    },
    /// A `System.Nullable<T>` instantiation
    Nullable {
        /// The `T` in `Nullable<T>`
        underlying: TypeId,
    },
    /// A class, interface, delegate, array or string
    Class,
}

/// A type definition stored in the [`TypeRegistry`]
pub struct TypeDef {
    /// Id of this type
    pub id: TypeId,
    /// Namespace, may be empty
    pub namespace: String,
    /// Simple name
    pub name: String,
    /// The kind of type
    pub flavor: TypeFlavor,
    /// Members in declaration order, static and computed ones included
    pub members: boxcar::Vec<Member<TypeId>>,
    /// `Size` of a `[StructLayout]` attribute, if the attribute was present
    pub layout_size: OnceLock<u32>,
    /// `ClassSize` of the `ClassLayout` metadata row, if the row was present
    pub class_size: OnceLock<u32>,
}

/// Reference to a `TypeDef`
pub type TypeDefRc = Arc<TypeDef>;

impl TypeDef {
    fn new(id: TypeId, namespace: &str, name: &str, flavor: TypeFlavor) -> Self {
        TypeDef {
            id,
            namespace: namespace.to_string(),
            name: name.to_string(),
            flavor,
            members: boxcar::Vec::new(),
            layout_size: OnceLock::new(),
            class_size: OnceLock::new(),
        }
    }

    /// Returns the full name (Namespace.Name) of the type
    #[must_use]
    pub fn fullname(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{0}.{1}", self.namespace, self.name)
        }
    }
}

/// Thread-safe store of type definitions, usable as a [`TypeOracle`].
pub struct TypeRegistry {
    /// Primary storage indexed by id
    types: DashMap<TypeId, TypeDefRc>,
    /// Secondary index: full name (namespace.name) to id
    types_by_fullname: DashMap<String, TypeId>,
    /// Counter for ids handed out to user definitions
    next_id: AtomicU32,
    /// Pointer width of the target this registry describes
    ptr_size: PointerSize,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create a registry for an unspecified (`AnyCpu`) target, with all primitive types
    /// plus `System.Object` and `System.String` registered.
    #[must_use]
    pub fn new() -> Self {
        Self::with_pointer_size(PointerSize::Unknown)
    }

    /// Create a registry for a target with the given pointer width
    #[must_use]
    pub fn with_pointer_size(ptr_size: PointerSize) -> Self {
        let registry = TypeRegistry {
            types: DashMap::new(),
            types_by_fullname: DashMap::new(),
            next_id: AtomicU32::new(USER_TYPE_BASE),
            ptr_size,
        };

        registry.initialize_builtins();
        registry
    }

    fn initialize_builtins(&self) {
        let builtins = PrimitiveKind::iter()
            .map(|kind| {
                let (namespace, name) = split_fullname(kind.fullname());
                TypeDef::new(
                    Self::primitive_id(kind),
                    namespace,
                    name,
                    TypeFlavor::Primitive(kind),
                )
            })
            .chain([
                TypeDef::new(OBJECT_ID, "System", "Object", TypeFlavor::Class),
                TypeDef::new(STRING_ID, "System", "String", TypeFlavor::Class),
            ]);

        // Fresh registry, built-in names and ids are distinct
        for def in builtins {
            self.types_by_fullname.insert(def.fullname(), def.id);
            self.types.insert(def.id, Arc::new(def));
        }
    }

    fn primitive_id(kind: PrimitiveKind) -> TypeId {
        TypeId(0xF000_0001 + kind as u32)
    }

    fn next_id(&self) -> TypeId {
        TypeId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Claim the full name and the id of `def`, or fail without touching either index.
    ///
    /// Lock order is name index first, then id index.
    fn register(&self, def: TypeDef) -> Result<TypeId> {
        let id = def.id;
        match self.types_by_fullname.entry(def.fullname()) {
            Entry::Occupied(existing) => Err(TypeInsert(*existing.get())),
            Entry::Vacant(name_slot) => match self.types.entry(id) {
                Entry::Occupied(_) => Err(TypeInsert(id)),
                Entry::Vacant(id_slot) => {
                    id_slot.insert(Arc::new(def));
                    name_slot.insert(id);
                    Ok(id)
                }
            },
        }
    }

    /// The pointer width of the target this registry describes
    #[must_use]
    pub fn pointer_size(&self) -> PointerSize {
        self.ptr_size
    }

    /// Id of a built-in primitive type
    #[must_use]
    pub fn primitive(&self, kind: PrimitiveKind) -> TypeId {
        Self::primitive_id(kind)
    }

    /// Id of `System.Object`
    #[must_use]
    pub fn object(&self) -> TypeId {
        OBJECT_ID
    }

    /// Id of `System.String`
    #[must_use]
    pub fn string(&self) -> TypeId {
        STRING_ID
    }

    /// Insert a pre-built definition under its own id.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeInsert`] if the id or the full name is already taken.
    pub fn insert(&self, def: TypeDef) -> Result<TypeId> {
        self.register(def)
    }

    /// Define a struct with the given members, in declaration order.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeInsert`] if a type with the same full name exists.
    pub fn define_struct(
        &self,
        namespace: &str,
        name: &str,
        members: Vec<Member<TypeId>>,
    ) -> Result<TypeId> {
        let def = self.new_definition(namespace, name, TypeFlavor::ValueType);
        for member in members {
            def.members.push(member);
        }

        self.register(def)
    }

    /// Define a class. Classes are only ever referenced by the layout code, never measured.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeInsert`] if a type with the same full name exists.
    pub fn define_class(&self, namespace: &str, name: &str) -> Result<TypeId> {
        self.register(self.new_definition(namespace, name, TypeFlavor::Class))
    }

    /// Define an enum backed by `underlying`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeNotFound`] if `underlying` is unknown,
    /// [`crate::Error::Malformed`] if it is not an integral primitive and
    /// [`crate::Error::TypeInsert`] if a type with the same full name exists.
    pub fn define_enum(&self, namespace: &str, name: &str, underlying: TypeId) -> Result<TypeId> {
        match self.get(underlying)?.flavor {
            TypeFlavor::Primitive(kind) if kind.is_integral() => {}
            _ => {
                return Err(malformed_error!(
                    "Enum {}.{} can not be based on {} - must be an integral primitive",
                    namespace,
                    name,
                    underlying
                ))
            }
        }

        self.register(self.new_definition(namespace, name, TypeFlavor::Enum { underlying }))
    }

    /// Get or create the `System.Nullable<T>` instantiation over `underlying`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeNotFound`] if `underlying` is unknown.
    pub fn nullable(&self, underlying: TypeId) -> Result<TypeId> {
        let inner = self.get(underlying)?;
        let name = format!("Nullable`1[{}]", inner.fullname());

        if let Some(existing) = self.types_by_fullname.get(&format!("System.{name}")) {
            return Ok(*existing);
        }

        let def = self.new_definition("System", &name, TypeFlavor::Nullable { underlying });
        match self.register(def) {
            // Another thread interned it first
            Err(TypeInsert(existing)) => Ok(existing),
            other => other,
        }
    }

    /// Append a member to an existing type
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeNotFound`] if `id` is unknown.
    pub fn add_member(&self, id: TypeId, member: Member<TypeId>) -> Result<()> {
        self.get(id)?.members.push(member);
        Ok(())
    }

    /// Record the `Size` of a `[StructLayout]` attribute on `id`
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeNotFound`] if `id` is unknown, or
    /// [`crate::Error::Malformed`] if a size was already recorded.
    pub fn set_layout_size(&self, id: TypeId, size: u32) -> Result<()> {
        self.get(id)?
            .layout_size
            .set(size)
            .map_err(|_| malformed_error!("Layout size of {} already set", id))
    }

    /// Record the `ClassSize` of the `ClassLayout` metadata row of `id`
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeNotFound`] if `id` is unknown, or
    /// [`crate::Error::Malformed`] if a size was already recorded.
    pub fn set_class_size(&self, id: TypeId, size: u32) -> Result<()> {
        self.get(id)?
            .class_size
            .set(size)
            .map_err(|_| malformed_error!("Class size of {} already set", id))
    }

    /// Look up a type by id
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeNotFound`] if `id` is unknown.
    pub fn get(&self, id: TypeId) -> Result<TypeDefRc> {
        self.types
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(TypeNotFound(id))
    }

    /// Look up a type by its full name (namespace.name)
    #[must_use]
    pub fn get_by_fullname(&self, fullname: &str) -> Option<TypeDefRc> {
        let id = *self.types_by_fullname.get(fullname)?;
        self.get(id).ok()
    }

    /// Number of registered types, built-ins included
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if the registry holds no types
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Ids of all user-defined value types, in definition order
    #[must_use]
    pub fn value_types(&self) -> Vec<TypeId> {
        let mut ids: Vec<TypeId> = self
            .types
            .iter()
            .filter(|entry| {
                !entry.key().is_builtin() && entry.value().flavor == TypeFlavor::ValueType
            })
            .map(|entry| *entry.key())
            .collect();
        ids.sort_unstable();
        ids
    }

    fn new_definition(&self, namespace: &str, name: &str, flavor: TypeFlavor) -> TypeDef {
        TypeDef::new(self.next_id(), namespace, name, flavor)
    }

    fn flavor(&self, id: TypeId) -> Option<TypeFlavor> {
        self.types.get(&id).map(|entry| entry.value().flavor)
    }
}

fn split_fullname(fullname: &str) -> (&str, &str) {
    match fullname.rsplit_once('.') {
        Some((namespace, name)) => (namespace, name),
        None => ("", fullname),
    }
}

impl TypeOracle for TypeRegistry {
    type Type = TypeId;

    fn target_pointer_size(&self) -> PointerSize {
        self.ptr_size
    }

    fn is_resolved(&self, ty: &TypeId) -> bool {
        self.types.contains_key(ty)
    }

    fn primitive_kind(&self, ty: &TypeId) -> Option<PrimitiveKind> {
        match self.flavor(*ty)? {
            TypeFlavor::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    fn is_reference_type(&self, ty: &TypeId) -> bool {
        self.flavor(*ty) == Some(TypeFlavor::Class)
    }

    fn enum_underlying_type(&self, ty: &TypeId) -> Option<TypeId> {
        match self.flavor(*ty)? {
            TypeFlavor::Enum { underlying } => Some(underlying),
            _ => None,
        }
    }

    fn nullable_underlying_type(&self, ty: &TypeId) -> Option<TypeId> {
        match self.flavor(*ty)? {
            TypeFlavor::Nullable { underlying } => Some(underlying),
            _ => None,
        }
    }

    fn members(&self, ty: &TypeId) -> Vec<Member<TypeId>> {
        match self.types.get(ty) {
            Some(entry) => entry
                .value()
                .members
                .iter()
                .map(|(_, member)| member.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    fn explicit_layout_size(&self, ty: &TypeId) -> Option<u32> {
        self.types
            .get(ty)
            .and_then(|entry| entry.value().layout_size.get().copied())
    }

    fn metadata_class_size(&self, ty: &TypeId) -> Option<u32> {
        self.types
            .get(ty)
            .and_then(|entry| entry.value().class_size.get().copied())
    }
}
