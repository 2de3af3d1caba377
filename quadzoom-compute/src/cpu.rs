//! Blocking escape-time evaluation on the host.

use crate::{Completions, ComputeBackend, ComputeError, DispatchStatus, TileId};
use quadzoom_core::{render_tile_into, Bounds};

/// Host-side tile image: one `f32` escape value per texel, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct CpuImage {
    resolution: u32,
    pixels: Vec<f32>,
}

impl CpuImage {
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    pub fn value_at(&self, px: u32, py: u32) -> f32 {
        self.pixels[(py as usize) * (self.resolution as usize) + px as usize]
    }
}

/// Synchronous backend. Every dispatch finishes before returning, so polling
/// never has anything to report.
#[derive(Debug)]
pub struct CpuBackend {
    resolution: u32,
}

impl CpuBackend {
    pub fn new(resolution: u32) -> Self {
        assert!(resolution > 0, "texture resolution must be > 0");
        Self { resolution }
    }
}

impl ComputeBackend for CpuBackend {
    type Image = CpuImage;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn resolution(&self) -> u32 {
        self.resolution
    }

    fn create_image(&mut self) -> Result<CpuImage, ComputeError> {
        let len = (self.resolution as usize) * (self.resolution as usize);
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|e| {
            ComputeError::Allocation(format!(
                "{}x{} f32 image: {e}",
                self.resolution, self.resolution
            ))
        })?;
        pixels.resize(len, 0.0);
        Ok(CpuImage {
            resolution: self.resolution,
            pixels,
        })
    }

    fn dispatch(
        &mut self,
        tile: TileId,
        bounds: &Bounds,
        image: &mut CpuImage,
    ) -> Result<DispatchStatus, ComputeError> {
        assert_eq!(
            image.resolution, self.resolution,
            "tile {tile} image resolution does not match backend"
        );
        render_tile_into(bounds, self.resolution, &mut image.pixels);
        log::debug!("cpu: rendered tile {tile}");
        Ok(DispatchStatus::Completed)
    }

    fn poll_completed(&mut self) -> Completions {
        Completions::default()
    }
}
