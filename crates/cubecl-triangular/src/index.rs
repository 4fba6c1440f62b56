//! Enumeration of the tiles covering one triangular half of a square tile grid.
//!
//! Tiles are numbered group by group: group `g` holds the `g + 1` tiles of tile column `g`
//! above the diagonal (upper) or of tile row `g` left of the diagonal (lower). The group of a
//! linear index is the inverse of the triangular-number series,
//! `g = floor((sqrt(8 * i + 1) - 1) / 2)`, and the offset inside the group is
//! `i - g * (g + 1) / 2`.
//!
//! The square root is computed in floating point, which can land one group off for large
//! indices. Both the host and the device versions reconstruct the triangular number in
//! integer arithmetic and step the group until `T(g) <= i < T(g + 1)`.

use cubecl_core as cubecl;
use cubecl_core::prelude::*;
use derive_new::new;

use crate::matrix::Triangle;

/// Position of a tile in the tile grid.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub row: u64,
    pub col: u64,
}

/// Number of tiles in one half of a `tiles_per_side x tiles_per_side` grid, diagonal included.
pub fn triangular_tile_count(tiles_per_side: u64) -> u64 {
    triangular_number(tiles_per_side)
}

/// Tile visited at position `index` of the enumeration of `triangle`.
pub fn triangular_tile_coords(index: u64, triangle: Triangle) -> TileCoord {
    let (group, offset) = group_and_offset(index);

    match triangle {
        Triangle::Upper => TileCoord::new(offset, group),
        Triangle::Lower => TileCoord::new(group, offset),
    }
}

fn triangular_number(n: u64) -> u64 {
    let n = n as u128;
    (n * (n + 1) / 2) as u64
}

fn group_and_offset(index: u64) -> (u64, u64) {
    let estimate = ((8.0 * index as f64 + 1.0).sqrt() - 1.0) / 2.0;
    let mut group = estimate.floor() as u64;

    let index_wide = index as u128;
    let start = |group: u64| group as u128 * (group as u128 + 1) / 2;

    while start(group) > index_wide {
        group -= 1;
    }
    while start(group + 1) <= index_wide {
        group += 1;
    }

    (group, (index_wide - start(group)) as u64)
}

/// Device version of [triangular_tile_coords], returning `(tile_row, tile_col)`.
///
/// The estimate is computed in `f32`, the integer correction keeps the result exact as long as
/// `group * (group + 2)` fits in `u32`. Addressable matrices have at most 8192 tiles per side.
#[cube]
pub fn tile_coords(index: u32, #[comptime] upper: bool) -> (u32, u32) {
    let radicand = f32::cast_from(index) * 8.0 + 1.0;
    let root: f32 = Sqrt::sqrt(radicand);
    let estimate: f32 = Floor::floor((root - 1.0) / 2.0);
    let mut group = u32::cast_from(estimate);

    while group * (group + 1) / 2 > index {
        group -= 1;
    }
    while (group + 1) * (group + 2) / 2 <= index {
        group += 1;
    }

    let offset = index - group * (group + 1) / 2;

    let mut row = group;
    let mut col = offset;
    if upper {
        row = offset;
        col = group;
    }

    (row, col)
}
