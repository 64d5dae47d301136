use bevy::prelude::*;
use fixedbitset::FixedBitSet;
use rustc_hash::FxHashMap;

use super::{CellBounds, CellBucket, SpatialGrid};
use crate::ecosystem::cell_key::{CellCoord, CellKey};
use crate::ecosystem::execution::Executor;

/// Cells filled by one worker over a disjoint index range.
struct PartialCells {
    cells: FxHashMap<CellKey, CellBucket>,
    bounds: Option<CellBounds>,
    len: usize,
}

impl PartialCells {
    fn fill(positions: &[Vec2], live: Option<&FixedBitSet>, cell_size: f32, range: std::ops::Range<usize>) -> Self {
        let mut cells: FxHashMap<CellKey, CellBucket> = FxHashMap::default();
        let mut bounds: Option<CellBounds> = None;
        let mut len = 0;

        for index in range {
            if !is_live(live, index) {
                continue;
            }
            let coord = CellCoord::from_position(positions[index], cell_size);
            cells.entry(coord.pack()).or_default().push(index as u32);
            include_bounds(&mut bounds, coord);
            len += 1;
        }

        Self { cells, bounds, len }
    }
}

fn is_live(live: Option<&FixedBitSet>, index: usize) -> bool {
    live.map_or(true, |mask| mask.contains(index))
}

fn include_bounds(bounds: &mut Option<CellBounds>, coord: CellCoord) {
    match bounds {
        Some(b) => b.include(coord),
        None => *bounds = Some(CellBounds::from_cell(coord)),
    }
}

impl SpatialGrid {
    /// Insert one snapshot index under the cell of `position`.
    pub fn insert(&mut self, index: u32, position: Vec2) {
        let coord = self.cell_of(position);
        self.cells.entry(coord.pack()).or_default().push(index);
        include_bounds(&mut self.bounds, coord);
        self.len += 1;
    }

    /// Build a fresh grid holding every index of `positions`.
    pub fn build(positions: &[Vec2], cell_size: f32, executor: &Executor) -> Self {
        let mut grid = Self::with_capacity(cell_size, positions.len() * 2);
        grid.rebuild(positions, None, executor);
        grid
    }

    /// Clear the grid and insert every index of `positions` marked in `live`
    /// (all of them when `live` is `None`).
    ///
    /// In parallel mode each batch of indices fills its own partial map, and
    /// the partial maps are merged here in batch order. Buckets therefore end
    /// up in ascending index order with either strategy.
    pub fn rebuild(&mut self, positions: &[Vec2], live: Option<&FixedBitSet>, executor: &Executor) {
        self.clear();
        self.cells.reserve(positions.len() * 2);

        if !executor.runs_parallel(positions.len()) {
            for (index, &position) in positions.iter().enumerate() {
                if is_live(live, index) {
                    self.insert(index as u32, position);
                }
            }
        } else {
            let cell_size = self.cell_size;
            let partials = executor.map_batches(positions.len(), |range| {
                PartialCells::fill(positions, live, cell_size, range)
            });
            for partial in partials {
                self.merge(partial);
            }
        }

        trace!(
            "[SPATIAL_GRID] Built {} entries in {} cells (cell size {})",
            self.len,
            self.cells.len(),
            self.cell_size
        );
    }

    fn merge(&mut self, partial: PartialCells) {
        for (key, bucket) in partial.cells {
            self.cells.entry(key).or_default().extend(bucket);
        }
        if let Some(partial_bounds) = partial.bounds {
            self.bounds = Some(match self.bounds {
                Some(bounds) => bounds.union(partial_bounds),
                None => partial_bounds,
            });
        }
        self.len += partial.len;
    }
}
