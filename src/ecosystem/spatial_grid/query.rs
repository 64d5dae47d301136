use super::{CellBounds, SpatialGrid};
use crate::ecosystem::cell_key::CellCoord;

/// Squared search radius for a sensing or flocking radius.
///
/// Non-positive (or NaN) radii mean "unlimited" and map to `+inf`, so every
/// distance test passes.
pub fn squared_search_radius(radius: f32) -> f32 {
    if radius > 0.0 {
        radius * radius
    } else {
        f32::INFINITY
    }
}

impl SpatialGrid {
    /// Ring radius in cells that covers a search `radius`.
    ///
    /// Returns `u32::MAX` for unlimited radii. Ring scans are clamped to the
    /// occupied bounds, so an unlimited ring only visits populated cells.
    pub fn ring_radius(&self, radius: f32) -> u32 {
        if radius > 0.0 && radius.is_finite() {
            // Float-to-int casts saturate.
            (radius / self.cell_size).ceil() as u32
        } else {
            u32::MAX
        }
    }

    /// Visit every index whose cell lies within Chebyshev distance `ring` of `center`.
    ///
    /// No allocation and no ordering guarantee. When the clamped scan
    /// rectangle holds more cells than the grid has occupied cells, the
    /// occupied cells are walked instead.
    pub fn for_each_in_ring<F: FnMut(u32)>(&self, center: CellCoord, ring: u32, mut visit: F) {
        let Some(rect) = self.ring_rect(center, ring) else {
            return;
        };
        if rect.cell_count() > self.cells.len() as u128 {
            self.scan_occupied(center, ring, &mut visit);
        } else {
            self.scan_rect(rect, &mut visit);
        }
    }

    /// Collect the indices of [`Self::for_each_in_ring`] into an iterator.
    pub fn query_cell_ring(&self, center: CellCoord, ring: u32) -> impl Iterator<Item = u32> {
        let mut found = Vec::new();
        self.for_each_in_ring(center, ring, |index| found.push(index));
        found.into_iter()
    }

    /// Ring rectangle clamped to the occupied bounds; `None` when they do not overlap.
    pub(crate) fn ring_rect(&self, center: CellCoord, ring: u32) -> Option<CellBounds> {
        self.bounds?.clamp_ring(center, ring)
    }

    pub(crate) fn scan_rect<F: FnMut(u32)>(&self, rect: CellBounds, visit: &mut F) {
        for x in rect.min.x..=rect.max.x {
            for y in rect.min.y..=rect.max.y {
                if let Some(bucket) = self.cells.get(&CellCoord::new(x, y).pack()) {
                    for &index in bucket {
                        visit(index);
                    }
                }
            }
        }
    }

    pub(crate) fn scan_occupied<F: FnMut(u32)>(&self, center: CellCoord, ring: u32, visit: &mut F) {
        for (key, bucket) in &self.cells {
            if key.unpack().chebyshev_distance(center) <= ring {
                for &index in bucket {
                    visit(index);
                }
            }
        }
    }
}
