//! Per-session caching of estimated sizes.
//!
//! A [`SizeCache`] is the scope a size estimate lives in. It is created when an analysis
//! session (typically one compilation) starts, handed to every
//! [`crate::StructSizeEstimator`] call of that session and dropped when the session ends.
//! Nothing is ever evicted from a live cache; a type's layout cannot change within one
//! compilation.
//!
//! Sizes are stored per pointer width, so estimators configured for different targets can
//! share one cache. Layout size overrides do not depend on the target and are shared.
//!
//! [`CacheScopes`] keeps one cache per session id for hosts that juggle several
//! compilations at once.
//!
//! # Thread Safety
//!
//! Both types are backed by `DashMap`. Lookups never hold a shard lock while the estimate is
//! computed, so nested lookups from inside an estimate cannot deadlock. Two threads racing on
//! the same type may both compute it; the first stored value wins and is what both return.

use std::{
    hash::Hash,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use dashmap::DashMap;

use crate::metadata::typesystem::PointerSize;

/// Counters describing how a [`SizeCache`] has been used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Number of cached sizes
    pub entries: usize,
    /// Number of lookups answered from the cache
    pub hits: usize,
    /// Number of estimates that were computed
    pub computations: usize,
}

/// Memoized size estimates and layout size lookups for one analysis session
pub struct SizeCache<T> {
    sizes: DashMap<(PointerSize, T), usize>,
    layout_overrides: DashMap<T, Option<usize>>,
    hits: AtomicUsize,
    computations: AtomicUsize,
}

impl<T: Eq + Hash> Default for SizeCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash> SizeCache<T> {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        SizeCache {
            sizes: DashMap::new(),
            layout_overrides: DashMap::new(),
            hits: AtomicUsize::new(0),
            computations: AtomicUsize::new(0),
        }
    }

    /// The cached size of `ty` on a `ptr_size` target, if it was estimated in this session
    pub fn get(&self, ptr_size: PointerSize, ty: &T) -> Option<usize>
    where
        T: Clone,
    {
        let size = self
            .sizes
            .get(&(ptr_size, ty.clone()))
            .map(|entry| *entry.value());
        if size.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        size
    }

    /// Return the cached size of `ty` on a `ptr_size` target, or compute and store it.
    ///
    /// If another thread stored a value while `compute` was running, that value is
    /// returned instead of the freshly computed one.
    pub fn get_or_compute<F>(&self, ptr_size: PointerSize, ty: &T, compute: F) -> usize
    where
        T: Clone,
        F: FnOnce() -> usize,
    {
        if let Some(size) = self.get(ptr_size, ty) {
            return size;
        }

        self.computations.fetch_add(1, Ordering::Relaxed);
        let size = compute();
        *self
            .sizes
            .entry((ptr_size, ty.clone()))
            .or_insert(size)
            .value()
    }

    /// Return the cached layout size override of `ty`, or look it up and store it
    pub(crate) fn layout_override<F>(&self, ty: &T, lookup: F) -> Option<usize>
    where
        T: Clone,
        F: FnOnce() -> Option<usize>,
    {
        if let Some(entry) = self.layout_overrides.get(ty) {
            return *entry.value();
        }

        let value = lookup();
        *self
            .layout_overrides
            .entry(ty.clone())
            .or_insert(value)
            .value()
    }

    /// Number of cached sizes
    #[must_use]
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// Returns true if no size has been cached yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Usage counters of this cache
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.sizes.len(),
            hits: self.hits.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
        }
    }

    /// Drop every cached value and reset the counters
    pub fn clear(&self) {
        self.sizes.clear();
        self.layout_overrides.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.computations.store(0, Ordering::Relaxed);
    }
}

/// One [`SizeCache`] per analysis session, keyed by a host-chosen session id.
pub struct CacheScopes<K, T> {
    scopes: DashMap<K, Arc<SizeCache<T>>>,
}

impl<K: Eq + Hash, T: Eq + Hash> Default for CacheScopes<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, T: Eq + Hash> CacheScopes<K, T> {
    /// Create a registry without any open session
    #[must_use]
    pub fn new() -> Self {
        CacheScopes {
            scopes: DashMap::new(),
        }
    }

    /// The cache of session `key`, created on first use
    pub fn open(&self, key: K) -> Arc<SizeCache<T>> {
        self.scopes
            .entry(key)
            .or_insert_with(|| Arc::new(SizeCache::new()))
            .value()
            .clone()
    }

    /// End session `key`.
    ///
    /// The cache is freed once the last outstanding `Arc` handed out by [`CacheScopes::open`]
    /// is dropped. Returns false if the session was not open.
    pub fn dispose(&self, key: &K) -> bool {
        self.scopes.remove(key).is_some()
    }

    /// Number of open sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Returns true if no session is open
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const X64: PointerSize = PointerSize::Bit64;

    #[test]
    fn test_get_or_compute_runs_once() {
        let cache = SizeCache::new();
        assert_eq!(cache.get_or_compute(X64, &1u32, || 12), 12);
        assert_eq!(cache.get_or_compute(X64, &1u32, || unreachable!()), 12);

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.computations, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn test_first_stored_value_wins() {
        let cache = SizeCache::new();
        cache.get_or_compute(X64, &7u32, || 8);
        cache.sizes.insert((X64, 8u32), 16);
        assert_eq!(cache.get_or_compute(X64, &8u32, || 32), 16);
    }

    #[test]
    fn test_sizes_are_kept_per_pointer_width() {
        let cache = SizeCache::new();
        assert_eq!(cache.get_or_compute(X64, &1u32, || 16), 16);
        assert_eq!(cache.get(PointerSize::Bit32, &1u32), None);
        assert_eq!(cache.get_or_compute(PointerSize::Bit32, &1u32, || 8), 8);
        assert_eq!(cache.get(X64, &1u32), Some(16));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_layout_override_cached() {
        let cache: SizeCache<u32> = SizeCache::new();
        assert_eq!(cache.layout_override(&3, || None), None);
        assert_eq!(cache.layout_override(&3, || Some(64)), None);
        assert_eq!(cache.layout_override(&4, || Some(64)), Some(64));
    }

    #[test]
    fn test_clear() {
        let cache = SizeCache::new();
        cache.get_or_compute(X64, &1u32, || 4);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_scopes_are_isolated() {
        let scopes: CacheScopes<&str, u32> = CacheScopes::new();
        let first = scopes.open("first");
        let second = scopes.open("second");

        first.get_or_compute(X64, &1, || 4);
        assert_eq!(second.get(X64, &1), None);
        assert!(Arc::ptr_eq(&first, &scopes.open("first")));
        assert_eq!(scopes.len(), 2);

        assert!(scopes.dispose(&"first"));
        assert!(!scopes.dispose(&"first"));
        assert!(scopes.open("first").is_empty());
    }
}
