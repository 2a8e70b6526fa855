//! Entity keys and key allocation.
//!
//! Vertices, faces and cells are identified by type-safe key wrappers around
//! a `u64`. Each entity class owns its own namespace and its own
//! [`KeyAllocator`], so `VertexKey(3)` and `FaceKey(3)` never clash.
//!
//! Auto-assigned keys are monotonic: the next automatic key is always one
//! past the largest integer key ever issued in that namespace, whether it was
//! issued automatically or supplied by the caller. Deleting an entity never
//! lowers the high-water mark, so automatic keys are never reused.

use std::fmt::{self, Debug};
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};

/// Common behaviour of the typed key wrappers.
pub trait EntityKey: Copy + Eq + Ord + std::hash::Hash + Debug + Send + Sync + 'static {
    /// Entity class name used in error messages.
    const KIND: &'static str;

    /// Wrap a raw integer.
    fn from_raw(raw: u64) -> Self;

    /// The raw integer value.
    fn raw(self) -> u64;
}

/// A vertex key.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct VertexKey(u64);

/// A face key.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct FaceKey(u64);

/// A cell key (volumetric meshes).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct CellKey(u64);

/// An edge, identified by its two end vertices.
///
/// For meshes the pair is stored in canonical order (smaller key first);
/// for networks it is the directed pair.
pub type EdgeKey = (VertexKey, VertexKey);

macro_rules! impl_key_type {
    ($name:ident, $display:literal, $kind:literal) => {
        impl $name {
            /// Create a key from a raw value.
            #[inline]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Get the raw key value.
            #[inline]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl EntityKey for $name {
            const KIND: &'static str = $kind;

            #[inline]
            fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            #[inline]
            fn raw(self) -> u64 {
                self.0
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $display, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(v: u64) -> Self {
                Self(v)
            }
        }
    };
}

impl_key_type!(VertexKey, "V", "vertex");
impl_key_type!(FaceKey, "F", "face");
impl_key_type!(CellKey, "C", "cell");

/// Put an undirected edge into canonical (sorted) order.
#[inline]
pub fn canonical_edge(u: VertexKey, v: VertexKey) -> EdgeKey {
    if u <= v {
        (u, v)
    } else {
        (v, u)
    }
}

/// Issues keys for one entity namespace.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyAllocator<K: EntityKey> {
    high_water: Option<u64>,
    _marker: PhantomData<K>,
}

impl<K: EntityKey> Default for KeyAllocator<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityKey> Debug for KeyAllocator<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyAllocator")
            .field("kind", &K::KIND)
            .field("high_water", &self.high_water)
            .finish()
    }
}

impl<K: EntityKey> KeyAllocator<K> {
    /// Create an allocator that has issued nothing yet.
    pub fn new() -> Self {
        Self {
            high_water: None,
            _marker: PhantomData,
        }
    }

    /// Largest integer key ever issued, if any.
    #[inline]
    pub fn high_water(&self) -> Option<u64> {
        self.high_water
    }

    /// Restore a persisted high-water mark.
    pub fn restore(&mut self, high_water: Option<u64>) {
        self.high_water = high_water.max(self.high_water);
    }

    /// The key an automatic allocation would return right now.
    #[inline]
    pub fn peek(&self) -> K {
        K::from_raw(self.high_water.map_or(0, |m| m + 1))
    }

    /// Allocate a key.
    ///
    /// Without a requested key the next automatic key is issued. A requested
    /// key is rejected with [`MeshError::DuplicateKey`] when `is_live` reports
    /// it as currently in use; otherwise it is accepted and advances the
    /// high-water mark when it lies above it.
    pub fn allocate(&mut self, requested: Option<K>, is_live: impl Fn(K) -> bool) -> Result<K> {
        let key = match requested {
            Some(key) => {
                if is_live(key) {
                    return Err(MeshError::duplicate(K::KIND, key));
                }
                key
            }
            None => self.peek(),
        };
        self.observe(key);
        Ok(key)
    }

    /// Record a key as issued without any liveness check.
    pub(crate) fn observe(&mut self, key: K) {
        let raw = key.raw();
        if self.high_water.map_or(true, |m| raw > m) {
            self.high_water = Some(raw);
        }
    }
}

/// A stable bijection between keys and contiguous indices.
///
/// External numeric code (linear solvers, force-density, plotting) works
/// with dense `0..n` indices; this maps them back to keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyIndex<K: EntityKey> {
    keys: Vec<K>,
    index: std::collections::HashMap<K, usize>,
}

impl<K: EntityKey> KeyIndex<K> {
    /// Build the bijection from keys in the given order.
    pub fn new(keys: impl IntoIterator<Item = K>) -> Self {
        let keys: Vec<K> = keys.into_iter().collect();
        let index = keys.iter().enumerate().map(|(i, &k)| (k, i)).collect();
        Self { keys, index }
    }

    /// Index of a key, if it is part of the bijection.
    #[inline]
    pub fn index_of(&self, key: K) -> Option<usize> {
        self.index.get(&key).copied()
    }

    /// Key at an index, if in range.
    #[inline]
    pub fn key_at(&self, index: usize) -> Option<K> {
        self.keys.get(index).copied()
    }

    /// All keys in index order.
    #[inline]
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Number of keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the bijection is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_keys_are_monotonic() {
        let mut alloc = KeyAllocator::<VertexKey>::new();
        let a = alloc.allocate(None, |_| false).unwrap();
        let b = alloc.allocate(None, |_| false).unwrap();
        assert_eq!(a, VertexKey::new(0));
        assert_eq!(b, VertexKey::new(1));
        assert_eq!(alloc.high_water(), Some(1));
    }

    #[test]
    fn test_requested_key_advances_high_water() {
        let mut alloc = KeyAllocator::<FaceKey>::new();
        alloc.allocate(Some(FaceKey::new(10)), |_| false).unwrap();
        let next = alloc.allocate(None, |_| false).unwrap();
        assert_eq!(next, FaceKey::new(11));

        // A lower requested key does not move the mark back.
        alloc.allocate(Some(FaceKey::new(3)), |_| false).unwrap();
        assert_eq!(alloc.peek(), FaceKey::new(12));
    }

    #[test]
    fn test_requested_live_key_is_rejected() {
        let mut alloc = KeyAllocator::<VertexKey>::new();
        let err = alloc.allocate(Some(VertexKey::new(4)), |k| k.get() == 4);
        assert!(matches!(err, Err(MeshError::DuplicateKey { .. })));
        assert_eq!(alloc.high_water(), None);
    }

    #[test]
    fn test_key_index_bijection() {
        let keys = [VertexKey::new(5), VertexKey::new(2), VertexKey::new(9)];
        let map = KeyIndex::new(keys);
        assert_eq!(map.len(), 3);
        assert_eq!(map.index_of(VertexKey::new(2)), Some(1));
        assert_eq!(map.key_at(2), Some(VertexKey::new(9)));
        assert_eq!(map.index_of(VertexKey::new(7)), None);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", VertexKey::new(42)), "V(42)");
        assert_eq!(format!("{:?}", FaceKey::new(1)), "F(1)");
        assert_eq!(format!("{:?}", CellKey::new(0)), "C(0)");
        assert_eq!(canonical_edge(VertexKey::new(3), VertexKey::new(1)).0, VertexKey::new(1));
    }
}
