use bevy::prelude::*;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::cell_key::{CellCoord, CellKey};
use super::config::{clamp_cell_size, clamped_cell_size};

mod build;
mod query;

pub use query::squared_search_radius;

/// Snapshot indices stored in one cell. Most cells hold a handful of agents.
pub type CellBucket = SmallVec<[u32; 8]>;

/// Unbounded uniform grid over snapshot indices.
///
/// The grid buckets snapshot indices (not entities) by the packed key of the
/// cell their position falls in. It is rebuilt from scratch every tick and is
/// read-only while resolvers query it, so worker threads can share `&SpatialGrid`
/// without synchronization.
///
/// Unlike a dense row/column grid there is no map extent: cells are created
/// on demand in a hash map, and the bounding box of occupied cells is tracked
/// so ring scans never walk empty space outside the populated area.
///
/// # Example
///
/// ```rust
/// use bevy::math::Vec2;
/// use ecosim::ecosystem::cell_key::CellCoord;
/// use ecosim::ecosystem::execution::Executor;
/// use ecosim::ecosystem::spatial_grid::SpatialGrid;
///
/// let positions = [Vec2::new(10.0, 10.0), Vec2::new(13.0, 10.0)];
/// let grid = SpatialGrid::build(&positions, 4.0, &Executor::sequential());
///
/// let center = CellCoord::from_position(positions[0], grid.cell_size());
/// let mut found: Vec<u32> = grid.query_cell_ring(center, 1).collect();
/// found.sort();
/// assert_eq!(found, vec![0, 1]);
/// ```
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: FxHashMap<CellKey, CellBucket>,
    bounds: Option<CellBounds>,
    len: usize,
}

/// Inclusive bounding box of occupied cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellBounds {
    pub min: CellCoord,
    pub max: CellCoord,
}

impl CellBounds {
    pub fn from_cell(cell: CellCoord) -> Self {
        Self { min: cell, max: cell }
    }

    pub fn include(&mut self, cell: CellCoord) {
        self.min.x = self.min.x.min(cell.x);
        self.min.y = self.min.y.min(cell.y);
        self.max.x = self.max.x.max(cell.x);
        self.max.y = self.max.y.max(cell.y);
    }

    pub fn union(mut self, other: Self) -> Self {
        self.include(other.min);
        self.include(other.max);
        self
    }

    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.x >= self.min.x && cell.x <= self.max.x && cell.y >= self.min.y && cell.y <= self.max.y
    }

    /// Number of cells in the box (can exceed `u64` only in theory, hence `u128`).
    pub fn cell_count(&self) -> u128 {
        let width = (i64::from(self.max.x) - i64::from(self.min.x) + 1) as u128;
        let height = (i64::from(self.max.y) - i64::from(self.min.y) + 1) as u128;
        width * height
    }

    /// Intersection of this box with the Chebyshev ring of `ring` cells around `center`.
    pub fn clamp_ring(&self, center: CellCoord, ring: u32) -> Option<Self> {
        let ring = i64::from(ring);
        let min_x = (i64::from(center.x) - ring).max(i64::from(self.min.x));
        let min_y = (i64::from(center.y) - ring).max(i64::from(self.min.y));
        let max_x = (i64::from(center.x) + ring).min(i64::from(self.max.x));
        let max_y = (i64::from(center.y) + ring).min(i64::from(self.max.y));
        if min_x > max_x || min_y > max_y {
            return None;
        }
        // Both ends lie inside `self`, so they fit back into i32.
        Some(Self {
            min: CellCoord::new(min_x as i32, min_y as i32),
            max: CellCoord::new(max_x as i32, max_y as i32),
        })
    }
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self::with_capacity(cell_size, 0)
    }

    /// Create an empty grid with room for `capacity` occupied cells.
    pub fn with_capacity(cell_size: f32, capacity: usize) -> Self {
        Self {
            cell_size: clamp_cell_size("cell_size", cell_size),
            cells: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            bounds: None,
            len: 0,
        }
    }

    /// Empty the grid and switch to a new cell size. Allocations are kept.
    ///
    /// An invalid size is clamped. Warns only when the effective size changes.
    pub fn reset(&mut self, cell_size: f32) {
        self.clear();
        if clamped_cell_size(cell_size) != self.cell_size {
            self.cell_size = clamp_cell_size("cell_size", cell_size);
        }
    }

    /// Remove every entry. Allocations are kept for the next build.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.bounds = None;
        self.len = 0;
    }

    /// Total number of stored indices.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Count of non-empty cells.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn bounds(&self) -> Option<CellBounds> {
        self.bounds
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn cell_of(&self, position: Vec2) -> CellCoord {
        CellCoord::from_position(position, self.cell_size)
    }

    /// Indices stored in one cell (empty slice for unoccupied cells).
    pub fn cell(&self, coord: CellCoord) -> &[u32] {
        self.cells.get(&coord.pack()).map_or(&[], |bucket| bucket.as_slice())
    }
}
