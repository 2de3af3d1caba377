//! Escape-time evaluation shared by every compute backend.
//!
//! The GPU kernel in `quadzoom-gpu` implements the same loop in WGSL; keep the
//! two in step when changing anything here.

use crate::Bounds;

/// Squared bailout radius (radius 2^8).
///
/// Much larger than the conventional 4 to reduce banding in smooth colouring.
pub const ESCAPE_RADIUS_SQ: f64 = 65536.0;

/// Map a texel to its fractal coordinate by linear interpolation across `bounds`.
///
/// Texel `(0, 0)` samples the top-left corner exactly; there is no half-texel offset.
#[inline]
pub fn pixel_to_fractal(px: u32, py: u32, resolution: u32, bounds: &Bounds) -> (f64, f64) {
    let size = resolution as f64;
    let x0 = bounds.left + (px as f64 * (bounds.right - bounds.left)) / size;
    let y0 = bounds.top + (py as f64 * (bounds.bottom - bounds.top)) / size;
    (x0, y0)
}

/// Smoothed escape-time value for the point `c = (x0, y0)`.
///
/// Iterates `z <- z^2 + c` from `z = 0` until `|z|^2 >= ESCAPE_RADIUS_SQ` or the
/// budget runs out. Escaped points return `i + 1 - log2(log2(|z|))`; points that
/// never escape return `max_iterations` unchanged so colour mapping can gate on it.
pub fn escape_value(x0: f64, y0: f64, max_iterations: f64) -> f32 {
    let budget = iteration_budget(max_iterations);

    let mut x = 0.0_f64;
    let mut y = 0.0_f64;
    let mut i = 0_u32;

    while x * x + y * y < ESCAPE_RADIUS_SQ && i < budget {
        let x_next = x * x - y * y + x0;
        y = 2.0 * x * y + y0;
        x = x_next;
        i += 1;
    }

    if i < budget {
        // log2(|z|) = ln(|z|^2) / (2 ln 2)
        let log_zn = (x * x + y * y).ln() / 2.0;
        let nu = (log_zn / std::f64::consts::LN_2).log2();
        (i as f64 + 1.0 - nu) as f32
    } else {
        max_iterations as f32
    }
}

/// Evaluate a full square tile, row-major.
pub fn render_tile(bounds: &Bounds, resolution: u32) -> Vec<f32> {
    let mut out = vec![0.0_f32; (resolution as usize) * (resolution as usize)];
    render_tile_into(bounds, resolution, &mut out);
    out
}

/// Evaluate a full square tile into an existing row-major buffer.
///
/// Panics if `out` does not hold exactly `resolution^2` values.
pub fn render_tile_into(bounds: &Bounds, resolution: u32, out: &mut [f32]) {
    let res = resolution as usize;
    assert_eq!(
        out.len(),
        res * res,
        "pixel buffer holds {} values, expected {}x{}",
        out.len(),
        res,
        res
    );

    for (py, row) in out.chunks_exact_mut(res).enumerate() {
        for (px, value) in row.iter_mut().enumerate() {
            let (x0, y0) = pixel_to_fractal(px as u32, py as u32, resolution, bounds);
            *value = escape_value(x0, y0, bounds.max_iterations);
        }
    }
}

#[inline]
fn iteration_budget(max_iterations: f64) -> u32 {
    if max_iterations.is_finite() && max_iterations > 0.0 {
        max_iterations as u32
    } else {
        0
    }
}
