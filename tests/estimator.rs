//! Size estimation against the in-memory registry and against a host-provided oracle.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

use layoutscope::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn define(registry: &TypeRegistry, name: &str, fields: &[PrimitiveKind]) -> TypeId {
    let members = fields
        .iter()
        .enumerate()
        .map(|(index, kind)| Member::field(format!("f{index}"), registry.primitive(*kind)))
        .collect();
    registry.define_struct("Tests", name, members).unwrap()
}

/// A host type model keyed by name that counts how often it is asked for members
#[derive(Default)]
struct NamedTypes {
    structs: HashMap<&'static str, Vec<&'static str>>,
    primitives: HashMap<&'static str, PrimitiveKind>,
    member_queries: AtomicUsize,
}

impl NamedTypes {
    fn new() -> Self {
        let mut types = NamedTypes::default();
        types.primitives.insert("int", PrimitiveKind::I4);
        types.primitives.insert("long", PrimitiveKind::I8);
        types.primitives.insert("byte", PrimitiveKind::U1);
        types
    }

    fn with_struct(mut self, name: &'static str, fields: &[&'static str]) -> Self {
        self.structs.insert(name, fields.to_vec());
        self
    }
}

impl TypeOracle for NamedTypes {
    type Type = &'static str;

    fn target_pointer_size(&self) -> PointerSize {
        PointerSize::Bit64
    }

    fn is_resolved(&self, ty: &&'static str) -> bool {
        self.structs.contains_key(ty) || self.primitives.contains_key(ty)
    }

    fn primitive_kind(&self, ty: &&'static str) -> Option<PrimitiveKind> {
        self.primitives.get(ty).copied()
    }

    fn is_reference_type(&self, _ty: &&'static str) -> bool {
        false
    }

    fn enum_underlying_type(&self, _ty: &&'static str) -> Option<&'static str> {
        None
    }

    fn nullable_underlying_type(&self, _ty: &&'static str) -> Option<&'static str> {
        None
    }

    fn members(&self, ty: &&'static str) -> Vec<Member<&'static str>> {
        self.member_queries.fetch_add(1, Ordering::SeqCst);
        self.structs
            .get(ty)
            .map(|fields| {
                fields
                    .iter()
                    .enumerate()
                    .map(|(index, field)| Member::field(format!("f{index}"), *field))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn explicit_layout_size(&self, _ty: &&'static str) -> Option<u32> {
        None
    }
}

#[test]
fn packing_examples() {
    use PrimitiveKind::*;

    let registry = TypeRegistry::new();
    let scope = SizeCache::new();
    let estimator = StructSizeEstimator::new(&registry);

    let cases: [(&str, &[PrimitiveKind], usize); 5] = [
        ("ByteByte", &[U1, U1], 2),
        ("ByteShort", &[U1, I2], 4),
        ("ByteShortInt", &[U1, I2, I4], 8),
        ("LongByte", &[I8, U1], 16),
        ("IntByteByteShort", &[I4, U1, U1, I2], 8),
    ];

    for (name, fields, expected) in cases {
        let id = define(&registry, name, fields);
        assert_eq!(estimator.compute_size(&id, &scope), expected, "{name}");
    }
    assert_eq!(scope.len(), 5);
}

#[test]
fn repeated_queries_hit_the_cache() {
    let types = NamedTypes::new().with_struct("Pair", &["int", "long"]);
    let scope = SizeCache::new();
    let estimator = StructSizeEstimator::new(&types);

    assert_eq!(estimator.compute_size(&"Pair", &scope), 16);
    let queries = types.member_queries.load(Ordering::SeqCst);

    assert_eq!(estimator.compute_size(&"Pair", &scope), 16);
    assert_eq!(types.member_queries.load(Ordering::SeqCst), queries);

    let stats = scope.stats();
    assert_eq!(stats.computations, 1);
    assert_eq!(stats.hits, 1);
}

#[test]
fn host_oracle_nesting_and_unknown_types() {
    init_logging();
    let types = NamedTypes::new()
        .with_struct("Inner", &["long", "byte"])
        .with_struct("Outer", &["Inner", "byte"])
        .with_struct("Broken", &["int", "Missing"]);
    let scope = SizeCache::new();
    let estimator = StructSizeEstimator::new(&types);

    assert_eq!(estimator.compute_size(&"Inner", &scope), 16);
    assert_eq!(estimator.compute_size(&"Outer", &scope), 24);
    assert_eq!(estimator.compute_size(&"Broken", &scope), 4);
}

#[test]
fn nested_struct_is_flattened() {
    use PrimitiveKind::*;

    let registry = TypeRegistry::new();
    let scope = SizeCache::new();
    let estimator = StructSizeEstimator::new(&registry);

    // { { byte; short; } byte; } - the inner struct keeps its 4 bytes, the tail byte starts
    // a new 2 byte bucket
    let inner = define(&registry, "Inner", &[U1, I2]);
    let outer = registry
        .define_struct(
            "Tests",
            "Outer",
            vec![
                Member::field("inner", inner),
                Member::field("tail", registry.primitive(U1)),
            ],
        )
        .unwrap();

    assert_eq!(estimator.compute_size(&inner, &scope), 4);
    assert_eq!(estimator.compute_size(&outer, &scope), 6);
}

#[test]
fn layout_override_only_raises() {
    use PrimitiveKind::*;

    let registry = TypeRegistry::new();
    let scope = SizeCache::new();
    let estimator = StructSizeEstimator::new(&registry);

    let raised = define(&registry, "Raised", &[I4, I4]);
    registry.set_layout_size(raised, 64).unwrap();
    assert_eq!(estimator.compute_size(&raised, &scope), 64);

    let kept = define(&registry, "Kept", &[I8, I8, I8]);
    registry.set_layout_size(kept, 8).unwrap();
    assert_eq!(estimator.compute_size(&kept, &scope), 24);

    let from_metadata = define(&registry, "FromMetadata", &[U1]);
    registry.set_class_size(from_metadata, 12).unwrap();
    assert_eq!(estimator.compute_size(&from_metadata, &scope), 12);
}

#[test]
fn pointer_width_changes_estimates() {
    let x86 = TypeRegistry::with_pointer_size(PointerSize::Bit32);
    let x64 = TypeRegistry::with_pointer_size(PointerSize::Bit64);

    for registry in [&x86, &x64] {
        let handle = registry.primitive(PrimitiveKind::I);
        let object = registry.object();
        registry
            .define_struct(
                "Tests",
                "Handles",
                vec![Member::field("h", handle), Member::field("o", object)],
            )
            .unwrap();
    }

    let size = |registry: &TypeRegistry| {
        let id = registry.get_by_fullname("Tests.Handles").unwrap().id;
        StructSizeEstimator::new(registry).compute_size(&id, &SizeCache::new())
    };
    assert_eq!(size(&x86), 8);
    assert_eq!(size(&x64), 16);

    let forced = StructSizeEstimator::with_config(&x64, EstimatorConfig::x86());
    let id = x64.get_by_fullname("Tests.Handles").unwrap().id;
    assert_eq!(forced.compute_size(&id, &SizeCache::new()), 8);

    // One session analysing both targets
    let shared = SizeCache::new();
    assert_eq!(StructSizeEstimator::new(&x64).compute_size(&id, &shared), 16);
    assert_eq!(forced.compute_size(&id, &shared), 8);
    assert_eq!(shared.get(PointerSize::Bit64, &id), Some(16));
    assert_eq!(shared.get(PointerSize::Bit32, &id), Some(8));
}

#[test]
fn concurrent_callers_agree() {
    use PrimitiveKind::*;

    init_logging();

    let registry = Arc::new(TypeRegistry::new());
    let id = define(&registry, "Shared", &[U1, R8, I2, Decimal, Boolean]);
    let scope = Arc::new(SizeCache::new());

    let expected = StructSizeEstimator::new(registry.as_ref()).compute_size(&id, &SizeCache::new());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let scope = Arc::clone(&scope);
            thread::spawn(move || {
                let estimator = StructSizeEstimator::new(registry.as_ref());
                (0..100)
                    .map(|_| estimator.compute_size(&id, &scope))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for size in handle.join().unwrap() {
            assert_eq!(size, expected);
        }
    }

    assert_eq!(scope.len(), 1);
    assert_eq!(scope.get(registry.pointer_size(), &id), Some(expected));
}

#[test]
fn batch_estimation_preserves_order() {
    use PrimitiveKind::*;

    let registry = TypeRegistry::new();
    let ids: Vec<TypeId> = (0..64)
        .map(|index| {
            let fields: Vec<PrimitiveKind> = std::iter::repeat(I8).take(index % 5 + 1).collect();
            define(&registry, &format!("Batch{index}"), &fields)
        })
        .collect();

    let scope = SizeCache::new();
    let results = StructSizeEstimator::new(&registry).estimate_all(&ids, &scope);

    assert_eq!(results.len(), ids.len());
    for (index, (id, size)) in results.iter().enumerate() {
        assert_eq!(*id, ids[index]);
        assert_eq!(*size, (index % 5 + 1) * 8);
    }
    assert_eq!(scope.len(), ids.len());
}

#[test]
fn sessions_do_not_share_results() {
    let registry = TypeRegistry::new();
    let id = define(&registry, "Session", &[PrimitiveKind::I4]);
    let estimator = StructSizeEstimator::new(&registry);

    let scopes = CacheScopes::new();
    let first = scopes.open(1u32);
    estimator.compute_size(&id, &first);
    assert_eq!(first.stats().computations, 1);

    let second = scopes.open(2u32);
    assert_eq!(second.get(registry.pointer_size(), &id), None);
    estimator.compute_size(&id, &second);
    assert_eq!(second.stats().computations, 1);

    assert!(scopes.dispose(&1));
    assert_eq!(scopes.len(), 1);
    assert!(scopes.open(1).is_empty());
}
