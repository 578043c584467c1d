use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

#[cfg(not(feature = "dense-slotmap"))]
use slotmap::SlotMap;

#[cfg(feature = "dense-slotmap")]
use slotmap::DenseSlotMap;

/// Index of a facet (the opposite vertex slot) within a tetrahedron.
///
/// A tetrahedron has four facets, so a `u8` is ample and keeps
/// `(CellKey, FacetIndex)` pairs compact.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::core::collections::FacetIndex;
///
/// let facet: FacetIndex = 2;
/// assert_eq!(usize::from(facet), 2);
/// ```
pub type FacetIndex = u8;

// Re-export UUID for convenience in type aliases
pub use uuid::Uuid;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Arena backing vertices and cells.
///
/// `SlotMap` by default; the `dense-slotmap` feature switches to
/// `DenseSlotMap`, which iterates faster and removes slower. Public methods
/// return iterators rather than exposing this type.
#[cfg(not(feature = "dense-slotmap"))]
pub type StorageMap<K, V> = SlotMap<K, V>;

/// Arena backing vertices and cells.
#[cfg(feature = "dense-slotmap")]
pub type StorageMap<K, V> = DenseSlotMap<K, V>;

// =============================================================================
// CORE OPTIMIZED TYPES
// =============================================================================

/// `HashMap` using `FxHasher`.
///
/// # Security Warning
///
/// Not DoS-resistant. Keys in this crate are slotmap keys, offsets and
/// signatures derived from them, never attacker-controlled strings.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::core::collections::FastHashMap;
///
/// let mut map: FastHashMap<u64, usize> = FastHashMap::default();
/// map.insert(123, 456);
/// ```
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// Re-export the Entry enum for `FastHashMap`.
pub use std::collections::hash_map::Entry;

/// `HashSet` using `FxHasher`.
///
/// ```rust
/// use periodic_delaunay::core::collections::FastHashSet;
/// use uuid::Uuid;
///
/// let mut set: FastHashSet<Uuid> = FastHashSet::default();
/// set.insert(Uuid::new_v4());
/// ```
pub type FastHashSet<T> = FxHashSet<T>;

/// Small-optimized Vec that keeps up to `N` elements inline.
///
/// # Size Guidelines
///
/// - **N=4**: the vertices, offsets or neighbors of one tetrahedron
/// - **N=8**: copies of a facet or edge orbit
/// - **N=32**: stars and conflict regions of a single insertion
///
/// ```rust
/// use periodic_delaunay::core::collections::SmallBuffer;
///
/// let mut buffer: SmallBuffer<i32, 8> = SmallBuffer::new();
/// for i in 0..5 {
///     buffer.push(i);
/// }
/// assert!(!buffer.spilled());
/// ```
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

// =============================================================================
// SEMANTIC SIZE CONSTANTS
// =============================================================================

/// Inline capacity for per-operation cell buffers (conflict regions, stars).
///
/// A Delaunay star in 3D has about 27 cells on average.
pub const LOCAL_CELL_BUFFER_SIZE: usize = 32;
