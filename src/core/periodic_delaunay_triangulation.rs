//! Periodic Delaunay triangulation with incremental insertion and removal.
//!
//! [`PeriodicDelaunayTriangulation`] owns the combinatorial structure, the
//! periodic predicate adapter and the covering manager, and keeps the
//! triangulation Delaunay on the flat torus after every public operation.
//!
//! # Wrap policy
//!
//! Points given outside the domain are wrapped into it before anything else
//! happens; non-finite points are rejected with an error.
//!
//! # Examples
//!
//! ```rust
//! use periodic_delaunay::prelude::*;
//!
//! let mut dt = PeriodicDelaunayTriangulation::new();
//! let a = dt.insert(Point::new([0.1, 0.2, 0.3])).unwrap();
//! dt.insert(Point::new([0.6, 0.7, 0.8])).unwrap();
//!
//! // Points outside the unit cube are wrapped.
//! let again = dt.insert(Point::new([1.1, -0.8, 0.3])).unwrap();
//! assert_eq!(a, again);
//! assert_eq!(dt.number_of_vertices(), 2);
//! assert!(dt.is_valid());
//! ```

#![forbid(unsafe_code)]

use std::io;

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::algorithms::insertion::{
    self, ConflictCell, ConflictError, ConflictFacet, InsertionError, find_conflict_region,
};
use crate::core::algorithms::locate::{self, DEFAULT_MAX_WALK_STEPS, LocateError, Location};
use crate::core::algorithms::removal::{self, RemovalError};
use crate::core::cell::Cell;
use crate::core::collections::FastHashSet;
use crate::core::covering::{CoveringManager, CoveringSheets};
use crate::core::facet::{Edge, Facet, VERTEX_TRIPLES};
use crate::core::query::{self, GeometricSignature, geometric_signature};
use crate::core::triangulation_data_structure::{CellKey, Tds, TdsValidationError, VertexKey};
use crate::core::util::hilbert::hilbert_sort_by;
use crate::core::vertex::Vertex;
use crate::geometry::domain::Domain;
use crate::geometry::kernel::{Kernel, RobustKernel};
use crate::geometry::offset::Offset;
use crate::geometry::periodic::{PeriodicKernel, PeriodicPoint};
use crate::geometry::point::Point;
use crate::geometry::predicates::{InSphere, Orientation};
use crate::geometry::primitives::{Segment, Tetrahedron, Triangle};

// =============================================================================
// CONSTRUCTION OPTIONS
// =============================================================================

/// Default length from which [`insert_range`](PeriodicDelaunayTriangulation::insert_range)
/// sorts its input along a Hilbert curve.
pub const DEFAULT_SPATIAL_SORT_THRESHOLD: usize = 1024;

/// Default Hilbert curve resolution per axis.
pub const DEFAULT_HILBERT_BITS: u32 = 16;

/// Tuning knobs for construction.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::core::periodic_delaunay_triangulation::ConstructionOptionsBuilder;
///
/// let options = ConstructionOptionsBuilder::default()
///     .spatial_sort_threshold(64)
///     .build()
///     .unwrap();
/// assert_eq!(options.spatial_sort_threshold(), 64);
/// assert_eq!(options.max_walk_steps(), 10_000);
/// ```
#[derive(Builder, Clone, Copy, Debug, PartialEq, Eq)]
#[builder(default)]
pub struct ConstructionOptions {
    /// Ranges at least this long are Hilbert-sorted before insertion.
    spatial_sort_threshold: usize,
    /// Bits per axis of the Hilbert curve used for sorting.
    hilbert_bits: u32,
    /// Walk steps before point location falls back to a full scan.
    max_walk_steps: usize,
}

impl Default for ConstructionOptions {
    fn default() -> Self {
        Self {
            spatial_sort_threshold: DEFAULT_SPATIAL_SORT_THRESHOLD,
            hilbert_bits: DEFAULT_HILBERT_BITS,
            max_walk_steps: DEFAULT_MAX_WALK_STEPS,
        }
    }
}

impl ConstructionOptions {
    /// Ranges at least this long are Hilbert-sorted.
    #[must_use]
    pub const fn spatial_sort_threshold(&self) -> usize {
        self.spatial_sort_threshold
    }

    /// Hilbert curve bits per axis.
    #[must_use]
    pub const fn hilbert_bits(&self) -> u32 {
        self.hilbert_bits
    }

    /// Walk step limit of point location.
    #[must_use]
    pub const fn max_walk_steps(&self) -> usize {
        self.max_walk_steps
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error while moving a vertex.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum MoveError {
    /// The vertex key is not in the triangulation
    #[error("Vertex {vertex:?} not found")]
    VertexNotFound {
        /// The unknown key
        vertex: VertexKey,
    },

    /// Re-inserting at the new position failed
    #[error("Insertion failed: {0}")]
    Insertion(#[from] InsertionError),

    /// Taking the vertex out failed
    #[error("Removal failed: {0}")]
    Removal(#[from] RemovalError),
}

impl From<LocateError> for MoveError {
    fn from(error: LocateError) -> Self {
        Self::Insertion(error.into())
    }
}

/// Reasons a periodic triangulation is invalid.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum PeriodicTriangulationValidationError {
    /// The combinatorial structure is broken
    #[error("Structural validation failed: {0}")]
    Structure(#[from] TdsValidationError),

    /// A canonical point lies outside the half-open domain
    #[error("Vertex {vertex:?} at {point} lies outside the domain")]
    Domain {
        /// The vertex
        vertex: VertexKey,
        /// Its stored point
        point: Point,
    },

    /// A cell is not positively oriented
    #[error("Cell {cell:?} has orientation {orientation}")]
    Orientation {
        /// The cell
        cell: CellKey,
        /// Its orientation
        orientation: Orientation,
    },

    /// The vertex across a facet lies inside a cell's circumsphere
    #[error("Cell {cell:?} is not locally Delaunay across facet {facet}")]
    Delaunay {
        /// The cell
        cell: CellKey,
        /// The facet index
        facet: usize,
    },

    /// Oversized flags or the sheet count disagree with the geometry
    #[error("Covering inconsistent: {message}")]
    Covering {
        /// Description
        message: String,
    },
}

// =============================================================================
// TRIANGULATION
// =============================================================================

/// Delaunay triangulation of a point set on the flat torus defined by a
/// cuboidal [`Domain`].
///
/// Internally the triangulation is stored either once (one sheet) or as 27
/// translated copies (three sheets per axis); the switch is automatic and
/// invisible through this API. Logical counts and iteration report one
/// representative per periodic class.
///
/// # Type Parameters
/// - `K`: predicate kernel, [`RobustKernel`] by default
#[derive(Clone, Debug)]
pub struct PeriodicDelaunayTriangulation<K: Kernel = RobustKernel> {
    tds: Tds,
    kernel: PeriodicKernel<K>,
    manager: CoveringManager,
    options: ConstructionOptions,
    /// Hint for the next `locate()` call (last inserted cell)
    last_inserted_cell: Option<CellKey>,
}

impl PeriodicDelaunayTriangulation<RobustKernel> {
    /// An empty triangulation of the unit cube.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use periodic_delaunay::prelude::*;
    ///
    /// let dt = PeriodicDelaunayTriangulation::new();
    /// assert_eq!(dt.number_of_vertices(), 0);
    /// assert_eq!(dt.number_of_sheets(), [3, 3, 3]);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_domain(Domain::unit_cube())
    }

    /// An empty triangulation of `domain`.
    #[must_use]
    pub fn with_domain(domain: Domain) -> Self {
        Self::with_domain_and_kernel(domain, RobustKernel::new())
    }

    /// Triangulate `points` in `domain`.
    ///
    /// # Errors
    ///
    /// Returns [`InsertionError`] if a point is not finite.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use periodic_delaunay::prelude::*;
    ///
    /// let points = [
    ///     Point::new([0.1, 0.2, 0.3]),
    ///     Point::new([0.6, 0.1, 0.9]),
    ///     Point::new([0.4, 0.7, 0.5]),
    /// ];
    /// let dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
    /// assert_eq!(dt.number_of_vertices(), 3);
    /// ```
    pub fn from_points(points: &[Point], domain: Domain) -> Result<Self, InsertionError> {
        let mut dt = Self::with_domain(domain);
        dt.insert_range(points.iter().copied(), false)?;
        Ok(dt)
    }
}

impl Default for PeriodicDelaunayTriangulation<RobustKernel> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Kernel> PeriodicDelaunayTriangulation<K> {
    /// An empty triangulation of `domain` evaluating predicates with `kernel`.
    #[must_use]
    pub fn with_domain_and_kernel(domain: Domain, kernel: K) -> Self {
        Self::with_options(domain, kernel, ConstructionOptions::default())
    }

    /// An empty triangulation with explicit construction options.
    #[must_use]
    pub fn with_options(domain: Domain, kernel: K, options: ConstructionOptions) -> Self {
        Self::from_parts(Tds::new(), PeriodicKernel::new(domain, kernel), options)
    }

    pub(crate) fn from_parts(tds: Tds, kernel: PeriodicKernel<K>, options: ConstructionOptions) -> Self {
        let manager = CoveringManager::new(kernel.domain());
        Self {
            tds,
            kernel,
            manager,
            options,
            last_inserted_cell: None,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// The fundamental domain.
    #[must_use]
    pub const fn domain(&self) -> &Domain {
        self.kernel.domain()
    }

    /// The periodic predicate adapter.
    #[must_use]
    pub const fn kernel(&self) -> &PeriodicKernel<K> {
        &self.kernel
    }

    /// Construction options in effect.
    #[must_use]
    pub const fn options(&self) -> &ConstructionOptions {
        &self.options
    }

    /// The underlying combinatorial structure.
    #[must_use]
    pub const fn tds(&self) -> &Tds {
        &self.tds
    }

    /// Current covering.
    #[must_use]
    pub const fn sheets(&self) -> CoveringSheets {
        self.tds.sheets()
    }

    /// Sheets per axis: `[1, 1, 1]` or `[3, 3, 3]`.
    #[must_use]
    pub const fn number_of_sheets(&self) -> [i32; 3] {
        self.tds.sheets().as_array()
    }

    /// Whether the triangulation has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tds.number_of_vertices() == 0
    }

    /// Number of vertices.
    #[must_use]
    pub fn number_of_vertices(&self) -> usize {
        self.tds.number_of_vertices()
    }

    /// Number of logical cells.
    #[must_use]
    pub fn number_of_cells(&self) -> usize {
        self.tds.number_of_stored_cells() / self.tds.copies()
    }

    /// Number of logical facets.
    #[must_use]
    pub fn number_of_facets(&self) -> usize {
        2 * self.number_of_cells()
    }

    /// Number of logical edges.
    #[must_use]
    pub fn number_of_edges(&self) -> usize {
        self.tds.number_of_stored_edges() / self.tds.copies()
    }

    /// Number of stored vertex copies.
    #[must_use]
    pub fn number_of_stored_vertices(&self) -> usize {
        self.tds.number_of_stored_vertices()
    }

    /// Number of stored cells, every copy counted.
    #[must_use]
    pub fn number_of_stored_cells(&self) -> usize {
        self.tds.number_of_stored_cells()
    }

    /// Number of stored facets, every copy counted.
    #[must_use]
    pub fn number_of_stored_facets(&self) -> usize {
        self.tds.number_of_stored_facets()
    }

    /// Number of stored edges, every copy counted.
    #[must_use]
    pub fn number_of_stored_edges(&self) -> usize {
        self.tds.number_of_stored_edges()
    }

    // -------------------------------------------------------------------------
    // Iteration
    // -------------------------------------------------------------------------

    /// All vertices.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexKey, &Vertex)> {
        self.tds.vertices()
    }

    /// One stored cell per logical cell.
    pub fn cells(&self) -> impl Iterator<Item = (CellKey, &Cell)> {
        self.tds
            .cells()
            .filter(|(_, cell)| query::is_canonical(&self.tds, cell))
    }

    /// Every stored cell.
    pub fn stored_cells(&self) -> impl Iterator<Item = (CellKey, &Cell)> {
        self.tds.cells()
    }

    /// One facet per logical facet.
    pub fn facets(&self) -> impl Iterator<Item = Facet> {
        query::unique_facets(&self.tds).into_iter()
    }

    /// One edge per logical edge.
    pub fn edges(&self) -> impl Iterator<Item = Edge> {
        query::unique_edges(&self.tds).into_iter()
    }

    /// Every materialized vertex copy as a periodic point.
    pub fn periodic_points(&self) -> impl Iterator<Item = (VertexKey, PeriodicPoint)> + '_ {
        let s = self.tds.sheet_count();
        self.tds.vertices().flat_map(move |(key, vertex)| {
            let point = *vertex.point();
            Offset::block(s).map(move |copy| (key, (point, copy)))
        })
    }

    // -------------------------------------------------------------------------
    // Insertion
    // -------------------------------------------------------------------------

    fn wrap(&self, point: &Point) -> Option<Point> {
        self.kernel.domain().wrap(point).ok()
    }

    fn hint(&self) -> Option<CellKey> {
        self.last_inserted_cell
            .filter(|&cell| self.tds.contains_cell(cell))
    }

    fn remember(&mut self, vertex: VertexKey) {
        self.last_inserted_cell = self.tds.vertex(vertex).and_then(|v| v.incident_cell(0));
    }

    /// Insert a point, wrapping it into the domain.
    ///
    /// A point coinciding with an existing vertex returns that vertex and
    /// changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`InsertionError::NonFinitePoint`] for NaN or infinite
    /// coordinates. Other errors indicate a corrupted structure.
    pub fn insert(&mut self, point: Point) -> Result<VertexKey, InsertionError> {
        let wrapped = self
            .wrap(&point)
            .ok_or(InsertionError::NonFinitePoint { point })?;
        let location = if self.tds.number_of_stored_cells() == 0 {
            None
        } else {
            Some(locate::locate(
                &self.tds,
                &self.kernel,
                &wrapped,
                Offset::ZERO,
                self.hint(),
                self.options.max_walk_steps,
            )?)
        };
        self.insert_at(&wrapped, location)
    }

    /// Insert a point whose location was computed by [`locate`](Self::locate)
    /// on the current triangulation.
    ///
    /// # Errors
    ///
    /// See [`insert`](Self::insert).
    pub fn insert_located(
        &mut self,
        point: Point,
        location: &Location,
    ) -> Result<VertexKey, InsertionError> {
        let wrapped = self
            .wrap(&point)
            .ok_or(InsertionError::NonFinitePoint { point })?;
        self.insert_at(&wrapped, Some(*location))
    }

    fn insert_at(
        &mut self,
        wrapped: &Point,
        location: Option<Location>,
    ) -> Result<VertexKey, InsertionError> {
        let outcome = insertion::insert(
            &mut self.tds,
            &self.kernel,
            &self.manager,
            wrapped,
            location,
            self.options.max_walk_steps,
        )?;
        let vertex = outcome.vertex();
        self.remember(vertex);
        Ok(vertex)
    }

    /// Insert a sequence of points and return how many vertices were created.
    ///
    /// With `large_point_set`, or when the input is at least
    /// [`spatial_sort_threshold`](ConstructionOptions::spatial_sort_threshold)
    /// long, points are first sorted along a Hilbert curve. The result does
    /// not depend on insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`InsertionError::NonFinitePoint`] before inserting anything if
    /// any point is not finite.
    pub fn insert_range<I>(&mut self, points: I, large_point_set: bool) -> Result<usize, InsertionError>
    where
        I: IntoIterator<Item = Point>,
    {
        let domain = *self.kernel.domain();
        let mut wrapped = points
            .into_iter()
            .map(|point| {
                domain
                    .wrap(&point)
                    .map_err(|_| InsertionError::NonFinitePoint { point })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if large_point_set || wrapped.len() >= self.options.spatial_sort_threshold {
            hilbert_sort_by(&mut wrapped, &domain, self.options.hilbert_bits, |p| *p);
        }

        let before = self.tds.number_of_vertices();
        for point in wrapped {
            self.insert(point)?;
        }
        Ok(self.tds.number_of_vertices() - before)
    }

    /// Move a vertex to a new position.
    ///
    /// Returns the vertex now at `point`: the same key if the position is
    /// unchanged or free, or the key of another vertex already there, in
    /// which case `vertex` is removed.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::VertexNotFound`] for an unknown key and
    /// [`MoveError::Insertion`] for a non-finite target. If re-inserting
    /// fails, the vertex is put back at its old position.
    pub fn move_point(&mut self, vertex: VertexKey, point: Point) -> Result<VertexKey, MoveError> {
        let current = *self
            .tds
            .vertex(vertex)
            .ok_or(MoveError::VertexNotFound { vertex })?
            .point();
        let wrapped = self
            .wrap(&point)
            .ok_or(InsertionError::NonFinitePoint { point })?;
        if wrapped == current {
            return Ok(vertex);
        }

        let location = self.locate(wrapped)?;
        if let Some(other) = location.vertex(&self.tds)
            && other != vertex
        {
            self.remove(vertex)?;
            return Ok(other);
        }

        let steps = self.options.max_walk_steps;
        removal::detach(&mut self.tds, &self.kernel, &self.manager, vertex, steps)?;
        if let Some(v) = self.tds.vertex_mut(vertex) {
            v.set_point(wrapped);
        }
        if let Err(error) =
            insertion::insert_existing(&mut self.tds, &self.kernel, &self.manager, vertex, steps)
        {
            self.restore(vertex, current);
            return Err(error.into());
        }
        self.remember(vertex);
        Ok(vertex)
    }

    /// Put `vertex` back at `point` after a failed move and re-triangulate.
    fn restore(&mut self, vertex: VertexKey, point: Point) {
        if let Some(v) = self.tds.vertex_mut(vertex) {
            v.set_point(point);
        }
        let steps = self.options.max_walk_steps;
        if let Err(error) = removal::rebuild(&mut self.tds, &self.kernel, &self.manager, None, steps)
        {
            warn!(%error, ?vertex, "rebuild after a failed move failed");
        }
        self.last_inserted_cell = None;
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    /// Remove a vertex.
    ///
    /// # Errors
    ///
    /// Returns [`RemovalError::VertexNotFound`] for an unknown key.
    pub fn remove(&mut self, vertex: VertexKey) -> Result<(), RemovalError> {
        removal::remove(
            &mut self.tds,
            &self.kernel,
            &self.manager,
            vertex,
            self.options.max_walk_steps,
        )?;
        self.last_inserted_cell = None;
        Ok(())
    }

    /// Remove several vertices and return how many were removed.
    ///
    /// Keys that are not (or no longer) in the triangulation are skipped.
    ///
    /// # Errors
    ///
    /// See [`remove`](Self::remove).
    pub fn remove_range<I>(&mut self, vertices: I) -> Result<usize, RemovalError>
    where
        I: IntoIterator<Item = VertexKey>,
    {
        let mut removed = 0;
        for vertex in vertices {
            if !self.tds.contains_vertex(vertex) {
                debug!(?vertex, "skipping unknown vertex in remove_range");
                continue;
            }
            self.remove(vertex)?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Remove every vertex.
    pub fn clear(&mut self) {
        self.tds.clear();
        self.last_inserted_cell = None;
    }

    // -------------------------------------------------------------------------
    // Location and predicates
    // -------------------------------------------------------------------------

    /// Locate a point, wrapping it into the domain.
    ///
    /// On an empty triangulation returns a location of type
    /// [`LocateType::Empty`](crate::core::algorithms::locate::LocateType::Empty).
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::NonFinitePoint`] for NaN or infinite coordinates.
    pub fn locate(&self, point: Point) -> Result<Location, LocateError> {
        let wrapped = self.wrap(&point).ok_or(LocateError::NonFinitePoint { point })?;
        if self.tds.number_of_stored_cells() == 0 {
            return Ok(Location::empty());
        }
        locate::locate(
            &self.tds,
            &self.kernel,
            &wrapped,
            Offset::ZERO,
            self.hint(),
            self.options.max_walk_steps,
        )
    }

    /// Exact position of `point` at `offset` relative to the circumsphere of
    /// `cell`; `None` for an unknown cell.
    #[must_use]
    pub fn side_of_sphere(&self, cell: CellKey, point: &Point, offset: Offset) -> Option<InSphere> {
        let simplex = self.tds.periodic_points(cell)?;
        Some(self.kernel.in_sphere(&simplex, &(*point, offset)))
    }

    /// Lattice offsets at which a copy of a canonical point may touch the
    /// circumsphere of `simplex`.
    #[expect(clippy::cast_possible_truncation)]
    fn offsets_near_sphere(&self, simplex: &[PeriodicPoint; 4]) -> Option<Vec<Offset>> {
        let center = self.kernel.circumcenter(simplex)?.to_array();
        let radius = self.kernel.squared_circumradius(simplex).sqrt();
        let domain = self.kernel.domain();
        let (lo, extent) = (domain.lo(), domain.extent());
        let range = |axis: usize| {
            let from = ((center[axis] - radius - lo[axis]) / extent[axis]).floor() as i32 - 1;
            let to = ((center[axis] + radius - lo[axis]) / extent[axis]).floor() as i32 + 1;
            from..=to
        };
        let mut out = Vec::new();
        for x in range(0) {
            for y in range(1) {
                for z in range(2) {
                    out.push(Offset::new(x, y, z));
                }
            }
        }
        Some(out)
    }

    /// Position relative to the circumsphere of `cell` of the nearest copy of
    /// `point`: [`InSphere::INSIDE`] if any copy is inside, otherwise
    /// [`InSphere::BOUNDARY`] if any copy is on the sphere.
    #[must_use]
    pub fn side_of_sphere_any_copy(&self, cell: CellKey, point: &Point) -> Option<InSphere> {
        let simplex = self.tds.periodic_points(cell)?;
        let point = self.wrap(point)?;
        let mut side = InSphere::OUTSIDE;
        for offset in self.offsets_near_sphere(&simplex)? {
            match self.kernel.in_sphere(&simplex, &(point, offset)) {
                InSphere::INSIDE => return Some(InSphere::INSIDE),
                InSphere::BOUNDARY => side = InSphere::BOUNDARY,
                InSphere::OUTSIDE => {}
            }
        }
        Some(side)
    }

    // -------------------------------------------------------------------------
    // Geometry of simplices
    // -------------------------------------------------------------------------

    /// Periodic point of slot `i` of `cell`.
    #[must_use]
    pub fn periodic_point(&self, cell: CellKey, i: usize) -> Option<PeriodicPoint> {
        self.tds.periodic_point(cell, i)
    }

    /// Stored offset of slot `i` of `cell`.
    #[must_use]
    pub fn get_offset(&self, cell: CellKey, i: usize) -> Option<Offset> {
        self.tds.cell(cell)?.offsets().get(i).copied()
    }

    /// Endpoints of an edge as periodic points.
    #[must_use]
    pub fn periodic_segment(&self, edge: Edge) -> Option<[PeriodicPoint; 2]> {
        let points = self.tds.periodic_points(edge.cell())?;
        let (i, j) = edge.slots();
        Some([points[i], points[j]])
    }

    /// Corners of a facet as periodic points.
    #[must_use]
    pub fn periodic_triangle(&self, facet: Facet) -> Option<[PeriodicPoint; 3]> {
        let points = self.tds.periodic_points(facet.cell())?;
        Some(VERTEX_TRIPLES[facet.slot()].map(|k| points[k]))
    }

    /// Corners of a cell as periodic points.
    #[must_use]
    pub fn periodic_tetrahedron(&self, cell: CellKey) -> Option<[PeriodicPoint; 4]> {
        self.tds.periodic_points(cell)
    }

    /// Lifted segment of an edge.
    #[must_use]
    pub fn segment(&self, edge: Edge) -> Option<Segment> {
        Some(self.kernel.construct_segment(&self.periodic_segment(edge)?))
    }

    /// Lifted triangle of a facet.
    #[must_use]
    pub fn triangle(&self, facet: Facet) -> Option<Triangle> {
        Some(self.kernel.construct_triangle(&self.periodic_triangle(facet)?))
    }

    /// Lifted tetrahedron of a cell.
    #[must_use]
    pub fn tetrahedron(&self, cell: CellKey) -> Option<Tetrahedron> {
        Some(self.kernel.construct_tetrahedron(&self.periodic_tetrahedron(cell)?))
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Vertex nearest to `point` in periodic distance; `None` when empty.
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::NonFinitePoint`] for NaN or infinite coordinates.
    pub fn nearest_vertex(&self, point: Point) -> Result<Option<VertexKey>, LocateError> {
        let wrapped = self.wrap(&point).ok_or(LocateError::NonFinitePoint { point })?;
        query::nearest_vertex(&self.tds, &self.kernel, &wrapped, self.options.max_walk_steps)
    }

    /// Vertex of `cell` nearest to `point` at `offset` in the cell's frame.
    #[must_use]
    pub fn nearest_vertex_in_cell(
        &self,
        cell: CellKey,
        point: &Point,
        offset: Offset,
    ) -> Option<VertexKey> {
        query::nearest_vertex_in_cell(&self.tds, &self.kernel, cell, point, offset)
    }

    /// Report the conflict region of `point` grown from `start`, without
    /// modifying the triangulation.
    ///
    /// `start` must have some copy of the point strictly inside its
    /// circumsphere (after symbolic perturbation). Offsets in the outputs are
    /// the lattice offset of the point in each cell's frame.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError::StartNotInConflict`] (wrapped in
    /// [`InsertionError`]) if no copy of the point conflicts with `start`.
    pub fn find_conflicts<B, C, I>(
        &self,
        point: Point,
        start: CellKey,
        boundary_facets: &mut B,
        conflict_cells: &mut C,
        internal_facets: &mut I,
    ) -> Result<(), InsertionError>
    where
        B: Extend<ConflictFacet>,
        C: Extend<ConflictCell>,
        I: Extend<ConflictFacet>,
    {
        let wrapped = self
            .wrap(&point)
            .ok_or(InsertionError::NonFinitePoint { point })?;
        let simplex = self
            .tds
            .periodic_points(start)
            .ok_or(ConflictError::InvalidStartCell { cell_key: start })?;
        let offset = self
            .offsets_near_sphere(&simplex)
            .unwrap_or_default()
            .into_iter()
            .find(|&o| {
                self.kernel.in_sphere_perturbed(&simplex, &(wrapped, o)) == InSphere::INSIDE
            })
            .ok_or(ConflictError::StartNotInConflict { cell_key: start })?;

        let region = find_conflict_region(&self.tds, &self.kernel, &wrapped, offset, start)?;
        boundary_facets.extend(region.boundary.iter().map(|b| ConflictFacet {
            facet: b.facet,
            offset: b.offset,
        }));
        conflict_cells.extend(region.cells);
        internal_facets.extend(region.internal);
        Ok(())
    }

    /// Whether an edge is Gabriel.
    #[must_use]
    pub fn is_gabriel_edge(&self, edge: Edge) -> bool {
        query::is_gabriel_edge(&self.tds, &self.kernel, edge)
    }

    /// Whether a facet is Gabriel.
    #[must_use]
    pub fn is_gabriel_facet(&self, facet: Facet) -> bool {
        query::is_gabriel_facet(&self.tds, &self.kernel, facet)
    }

    /// Voronoi vertex of a cell, wrapped into the domain.
    #[must_use]
    pub fn dual(&self, cell: CellKey) -> Option<Point> {
        query::dual(&self.tds, &self.kernel, cell)
    }

    /// Voronoi edge of a facet in the frame of the facet's cell.
    #[must_use]
    pub fn dual_facet(&self, facet: Facet) -> Option<Segment> {
        query::dual_facet(&self.tds, &self.kernel, facet)
    }

    /// Write the Voronoi diagram; see [`query::draw_dual`].
    ///
    /// # Errors
    ///
    /// Returns any I/O error from `writer`.
    pub fn draw_dual<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        query::draw_dual(&self.tds, &self.kernel, writer)
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Whether every invariant holds. Never panics; the reason for a failure
    /// is logged.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "periodic triangulation failed validation");
                false
            }
        }
    }

    /// Check structure, domain, orientation, covering and the empty sphere
    /// property.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), PeriodicTriangulationValidationError> {
        self.tds.is_valid()?;

        let domain = self.kernel.domain();
        for (vertex, v) in self.tds.vertices() {
            if !domain.contains(v.point()) {
                return Err(PeriodicTriangulationValidationError::Domain {
                    vertex,
                    point: *v.point(),
                });
            }
        }

        for (cell, c) in self.tds.cells() {
            let points = self.tds.periodic_points_of(c).ok_or_else(|| {
                TdsValidationError::InconsistentDataStructure {
                    message: format!("cell {cell:?} references a missing vertex"),
                }
            })?;
            let orientation = self.kernel.orientation(&points);
            if orientation != Orientation::POSITIVE {
                return Err(PeriodicTriangulationValidationError::Orientation { cell, orientation });
            }
            let oversized = self.manager.is_oversized(&self.kernel, &points);
            if oversized != c.is_oversized() {
                return Err(PeriodicTriangulationValidationError::Covering {
                    message: format!(
                        "cell {cell:?} is flagged oversized={} but its circumradius gives {oversized}",
                        c.is_oversized()
                    ),
                });
            }
            for facet in 0..4 {
                let across = self.tds.neighbor(cell, facet).and_then(|n| {
                    let j = self.tds.mirror_index(cell, facet)?;
                    let t = self.tds.neighbor_translation(cell, facet)?;
                    let (q, o) = self.tds.periodic_point(n, j)?;
                    Some((q, o + t))
                });
                let Some(opposite) = across else {
                    return Err(TdsValidationError::InvalidNeighbors {
                        message: format!("facet {facet} of cell {cell:?} has no mirror"),
                    }
                    .into());
                };
                if self.kernel.in_sphere(&points, &opposite) == InSphere::INSIDE {
                    return Err(PeriodicTriangulationValidationError::Delaunay { cell, facet });
                }
            }
        }

        if self.tds.sheets() == CoveringSheets::One && self.tds.number_of_oversized_cells() > 0 {
            return Err(PeriodicTriangulationValidationError::Covering {
                message: format!(
                    "one-sheet covering holds {} oversized cells",
                    self.tds.number_of_oversized_cells()
                ),
            });
        }
        Ok(())
    }

    /// Geometric signatures of the logical cells.
    fn cell_signatures(&self) -> FastHashSet<GeometricSignature> {
        self.cells()
            .filter_map(|(_, cell)| self.tds.periodic_points_of(cell))
            .map(|points| geometric_signature(&points))
            .collect()
    }
}

impl<K: Kernel> PartialEq for PeriodicDelaunayTriangulation<K> {
    /// Same domain, same points and same logical cells, whatever the covering.
    fn eq(&self, other: &Self) -> bool {
        if self.domain() != other.domain()
            || self.number_of_vertices() != other.number_of_vertices()
            || self.number_of_cells() != other.number_of_cells()
        {
            return false;
        }
        let points = |dt: &Self| -> FastHashSet<Point> {
            dt.tds.vertices().map(|(_, v)| *v.point()).collect()
        };
        points(self) == points(other) && self.cell_signatures() == other.cell_signatures()
    }
}
