//! Colour ramp and the per-pixel shading rule the display applies.

/// Steps per hue segment.
pub const SEGMENT_STEPS: usize = 256;

/// Number of entries in [`gradient_ramp`].
pub const RAMP_LEN: usize = SEGMENT_STEPS * 6;

/// Cyclic hue ramp: red, yellow, green, cyan, blue, violet and back to red.
pub fn gradient_ramp() -> Vec<[u8; 3]> {
    let mut ramp = Vec::with_capacity(RAMP_LEN);
    for segment in 0..6 {
        for i in 0..SEGMENT_STEPS {
            let up = i as u8;
            let down = 255 - i as u8;
            let rgb = match segment {
                0 => [255, up, 0],
                1 => [down, 255, 0],
                2 => [0, 255, up],
                3 => [0, down, 255],
                4 => [up, 0, 255],
                _ => [255, 0, down],
            };
            ramp.push(rgb);
        }
    }
    ramp
}

/// Colour for one escape value.
///
/// Values above `cutoff` show `background`; everything else samples the ramp
/// at `value / color_period`, wrapping around like a repeating texture.
pub fn shade(
    value: f32,
    cutoff: f64,
    color_period: f32,
    ramp: &[[u8; 3]],
    background: [u8; 3],
) -> [u8; 3] {
    if value as f64 > cutoff || ramp.is_empty() {
        return background;
    }
    let t = (value / color_period).rem_euclid(1.0);
    let index = ((t * ramp.len() as f32) as usize).min(ramp.len() - 1);
    ramp[index]
}
