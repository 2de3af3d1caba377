//! Kernel argument packing and read-back layout.

use bytemuck::{Pod, Zeroable};
use quadzoom_core::Bounds;

/// Kernel arguments, laid out as `array<f32, 5>` in the shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct KernelBounds {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub max_iterations: f32,
}

impl From<&Bounds> for KernelBounds {
    fn from(bounds: &Bounds) -> Self {
        let [left, right, top, bottom, max_iterations] = bounds.to_kernel_args();
        Self {
            left,
            right,
            top,
            bottom,
            max_iterations,
        }
    }
}

/// Bytes per row of an R32Float image when copied into a buffer, padded to
/// wgpu's copy alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * std::mem::size_of::<f32>() as u32;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Drop row padding from a mapped read-back buffer.
pub fn unpad_rows(data: &[u8], width: u32, height: u32) -> Vec<f32> {
    let padded = padded_bytes_per_row(width) as usize;
    let row_bytes = width as usize * std::mem::size_of::<f32>();
    let mut out = Vec::with_capacity(width as usize * height as usize);
    for row in data.chunks(padded).take(height as usize) {
        out.extend(
            row[..row_bytes]
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_bounds_is_five_packed_floats() {
        assert_eq!(std::mem::size_of::<KernelBounds>(), 20);
        let bounds = Bounds::new(-2.0, 2.0, -1.5, 0.5, 300.0);
        let packed: [f32; 5] = bytemuck::cast(KernelBounds::from(&bounds));
        assert_eq!(packed, [-2.0, 2.0, -1.5, 0.5, 300.0]);
    }

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(10), 256);
    }

    #[test]
    fn unpad_rows_strips_padding() {
        let width = 3;
        let padded = padded_bytes_per_row(width) as usize;
        let mut data = vec![0u8; padded * 2];
        for (row, base) in [0.0f32, 10.0].iter().enumerate() {
            for col in 0..width as usize {
                let v = base + col as f32;
                let at = row * padded + col * 4;
                data[at..at + 4].copy_from_slice(&v.to_le_bytes());
            }
        }
        assert_eq!(unpad_rows(&data, width, 2), vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
    }
}
