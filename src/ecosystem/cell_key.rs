//! Integer cell coordinates and their packed 64-bit hash key.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

/// Integer coordinate of a grid cell: `floor(position / cell_size)` per axis.
///
/// Float-to-int conversion saturates, so positions far outside the `i32`
/// range land in the outermost representable cell instead of wrapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn from_position(position: Vec2, cell_size: f32) -> Self {
        Self {
            x: (position.x / cell_size).floor() as i32,
            y: (position.y / cell_size).floor() as i32,
        }
    }

    /// Square-ring distance: max of the per-axis offsets.
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        let dx = (i64::from(self.x) - i64::from(other.x)).unsigned_abs();
        let dy = (i64::from(self.y) - i64::from(other.y)).unsigned_abs();
        dx.max(dy).min(u64::from(u32::MAX)) as u32
    }

    pub fn pack(self) -> CellKey {
        CellKey(((self.x as i64) << 32) ^ (self.y as u32 as i64))
    }
}

/// Packed cell coordinate used as the grid's hash-map key.
///
/// Layout is `(x << 32) ^ (y as u32)`: the high half holds `x`, the low half
/// holds the bit pattern of `y`, so every `i32` pair maps to a distinct key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey(i64);

impl CellKey {
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    pub fn unpack(self) -> CellCoord {
        CellCoord {
            x: (self.0 >> 32) as i32,
            y: self.0 as u32 as i32,
        }
    }
}

impl From<CellCoord> for CellKey {
    fn from(coord: CellCoord) -> Self {
        coord.pack()
    }
}

impl From<CellKey> for CellCoord {
    fn from(key: CellKey) -> Self {
        key.unpack()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_pack_unpack_round_trips_in_practical_range() {
        for x in (-10_000..10_000).step_by(7) {
            for y in (-10_000..10_000).step_by(11) {
                let coord = CellCoord::new(x, y);
                assert_eq!(coord.pack().unpack(), coord, "round trip failed for ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_pack_unpack_round_trips_at_extremes() {
        let extremes = [i32::MIN, i32::MIN + 1, -1, 0, 1, i32::MAX - 1, i32::MAX];
        for &x in &extremes {
            for &y in &extremes {
                let coord = CellCoord::new(x, y);
                assert_eq!(coord.pack().unpack(), coord);
            }
        }
    }

    #[test]
    fn test_neighbouring_cells_never_collide() {
        let mut seen = FxHashSet::default();
        for x in -64..64 {
            for y in -64..64 {
                assert!(seen.insert(CellCoord::new(x, y).pack()), "key collision at ({}, {})", x, y);
            }
        }
        // Sign flips on y must not alias with the x half
        assert_ne!(CellCoord::new(0, -1).pack(), CellCoord::new(-1, 0).pack());
        assert_ne!(CellCoord::new(1, -1).pack(), CellCoord::new(0, 1).pack());
    }

    #[test]
    fn test_from_position_floors_negative_coordinates() {
        assert_eq!(CellCoord::from_position(Vec2::new(10.0, 10.0), 4.0), CellCoord::new(2, 2));
        assert_eq!(CellCoord::from_position(Vec2::new(13.0, 10.0), 4.0), CellCoord::new(3, 2));
        assert_eq!(CellCoord::from_position(Vec2::new(-0.5, -4.0), 4.0), CellCoord::new(-1, -1));
        assert_eq!(CellCoord::from_position(Vec2::new(-4.01, 0.0), 4.0), CellCoord::new(-2, 0));
    }

    #[test]
    fn test_from_position_saturates_far_positions() {
        let far = CellCoord::from_position(Vec2::splat(1.0e30), 1.0e-4);
        assert_eq!(far, CellCoord::new(i32::MAX, i32::MAX));
    }

    #[test]
    fn test_chebyshev_distance() {
        let a = CellCoord::new(2, 2);
        assert_eq!(a.chebyshev_distance(a), 0);
        assert_eq!(a.chebyshev_distance(CellCoord::new(3, 2)), 1);
        assert_eq!(a.chebyshev_distance(CellCoord::new(-1, 4)), 3);
        assert_eq!(
            CellCoord::new(i32::MIN, 0).chebyshev_distance(CellCoord::new(i32::MAX, 0)),
            u32::MAX
        );
    }
}
