//! Geometry handed to the display layer for each tile.

use crate::Bounds;

/// UVs shared by every tile quad, matching the vertex order of [`tile_vertices`].
pub const TILE_UVS: [[f32; 2]; 6] = [
    [0.0, 1.0],
    [0.0, 0.0],
    [1.0, 0.0],
    [0.0, 1.0],
    [1.0, 0.0],
    [1.0, 1.0],
];

/// Depth for a tile generation, in `(0, 1]`.
///
/// Strictly decreasing with generation so finer tiles win a `Less` depth test
/// over the coarser parent they overlap.
pub fn generation_depth(generation: u32) -> f32 {
    1.0 / (1.0 + generation as f32)
}

/// Two triangles covering `[left, right] x [top, bottom]`.
///
/// Order: bottom-left, top-left, top-right, bottom-left, top-right, bottom-right.
pub fn tile_vertices(bounds: &Bounds, generation: u32) -> [[f32; 3]; 6] {
    let z = generation_depth(generation);
    let (l, r) = (bounds.left as f32, bounds.right as f32);
    let (t, b) = (bounds.top as f32, bounds.bottom as f32);
    [
        [l, b, z],
        [l, t, z],
        [r, t, z],
        [l, b, z],
        [r, t, z],
        [r, b, z],
    ]
}
