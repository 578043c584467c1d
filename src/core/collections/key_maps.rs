use super::{FastHashMap, FastHashSet, LOCAL_CELL_BUFFER_SIZE, SmallBuffer};
use crate::core::triangulation_data_structure::{CellKey, VertexKey};

// =============================================================================
// KEY-BASED TYPES
// =============================================================================

/// Set of cell keys, used for visited marks during walks and floods.
pub type CellKeySet = FastHashSet<CellKey>;

/// Set of vertex keys.
pub type VertexKeySet = FastHashSet<VertexKey>;

/// Map keyed by cell.
pub type KeyBasedCellMap<V> = FastHashMap<CellKey, V>;

/// Cells touched by a single local operation.
pub type CellKeyBuffer = SmallBuffer<CellKey, LOCAL_CELL_BUFFER_SIZE>;
