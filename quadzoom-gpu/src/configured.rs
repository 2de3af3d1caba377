//! Backend chosen at startup from [`RenderConfig::backend`].

use quadzoom_compute::{
    Completions, ComputeBackend, ComputeError, CpuBackend, CpuImage, DispatchStatus, TileId,
};
use quadzoom_core::{BackendKind, Bounds, RenderConfig};

use crate::backend::{GpuComputeBackend, GpuImage};
use crate::device::GpuContext;
use crate::error::GpuError;

/// Either backend behind one concrete type, so a single `QuadtreeManager`
/// type serves both configurations.
pub enum ConfiguredBackend {
    Cpu(CpuBackend),
    Gpu(GpuComputeBackend),
}

pub enum ConfiguredImage {
    Cpu(CpuImage),
    Gpu(GpuImage),
}

impl ConfiguredBackend {
    /// Build the configured backend. A GPU configuration without a usable
    /// device fails here rather than falling back, so the caller can abort
    /// before the first frame.
    pub fn from_config(config: &RenderConfig) -> Result<Self, GpuError> {
        match config.backend {
            BackendKind::Cpu => {
                log::info!(
                    "using cpu backend at {0}x{0}",
                    config.texture_resolution
                );
                Ok(Self::Cpu(CpuBackend::new(config.texture_resolution)))
            }
            BackendKind::Gpu => {
                let context = pollster::block_on(GpuContext::init()).map_err(|e| {
                    log::warn!("gpu backend requested but unavailable: {e}");
                    e
                })?;
                let backend = GpuComputeBackend::new(context, config.texture_resolution)?;
                log::info!(
                    "using gpu backend at {0}x{0}",
                    config.texture_resolution
                );
                Ok(Self::Gpu(backend))
            }
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Cpu(_) => BackendKind::Cpu,
            Self::Gpu(_) => BackendKind::Gpu,
        }
    }

    /// Host copy of an image's escape values, row-major.
    pub async fn read_image(&self, image: &ConfiguredImage) -> Result<Vec<f32>, GpuError> {
        match (self, image) {
            (Self::Cpu(_), ConfiguredImage::Cpu(img)) => Ok(img.pixels().to_vec()),
            (Self::Gpu(backend), ConfiguredImage::Gpu(img)) => backend.read_image(img).await,
            _ => panic!("image does not belong to the {} backend", self.name()),
        }
    }
}

impl ComputeBackend for ConfiguredBackend {
    type Image = ConfiguredImage;

    fn name(&self) -> &'static str {
        match self {
            Self::Cpu(b) => b.name(),
            Self::Gpu(b) => b.name(),
        }
    }

    fn resolution(&self) -> u32 {
        match self {
            Self::Cpu(b) => b.resolution(),
            Self::Gpu(b) => b.resolution(),
        }
    }

    fn create_image(&mut self) -> Result<ConfiguredImage, ComputeError> {
        match self {
            Self::Cpu(b) => b.create_image().map(ConfiguredImage::Cpu),
            Self::Gpu(b) => b.create_image().map(ConfiguredImage::Gpu),
        }
    }

    fn dispatch(
        &mut self,
        tile: TileId,
        bounds: &Bounds,
        image: &mut ConfiguredImage,
    ) -> Result<DispatchStatus, ComputeError> {
        match (self, image) {
            (Self::Cpu(b), ConfiguredImage::Cpu(img)) => b.dispatch(tile, bounds, img),
            (Self::Gpu(b), ConfiguredImage::Gpu(img)) => b.dispatch(tile, bounds, img),
            (b, _) => panic!("tile {tile} image does not belong to the {} backend", b.name()),
        }
    }

    fn poll_completed(&mut self) -> Completions {
        match self {
            Self::Cpu(b) => b.poll_completed(),
            Self::Gpu(b) => b.poll_completed(),
        }
    }

    fn pending_count(&self) -> usize {
        match self {
            Self::Cpu(b) => b.pending_count(),
            Self::Gpu(b) => b.pending_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadzoom_compute::{QuadtreeManager, TileState};

    fn cpu_config() -> RenderConfig {
        RenderConfig {
            texture_resolution: 16,
            backend: BackendKind::Cpu,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn cpu_config_builds_cpu_backend() {
        let backend = ConfiguredBackend::from_config(&cpu_config()).unwrap();
        assert_eq!(backend.kind(), BackendKind::Cpu);
        assert_eq!(backend.name(), "cpu");
        assert_eq!(backend.resolution(), 16);
    }

    #[test]
    fn cpu_manager_renders_root_immediately() {
        let config = cpu_config();
        let backend = ConfiguredBackend::from_config(&config).unwrap();
        let manager = QuadtreeManager::from_config(backend, &config).unwrap();
        assert_eq!(manager.tiles()[0].state(), TileState::Active);

        let pixels =
            pollster::block_on(manager.backend().read_image(manager.tiles()[0].texture()))
                .unwrap();
        assert_eq!(pixels.len(), 256);
        // Texel (8, 8) samples the origin
        assert_eq!(pixels[8 * 16 + 8], config.max_iterations as f32);
    }

    #[test]
    fn gpu_config_never_panics() {
        let config = RenderConfig {
            texture_resolution: 16,
            ..RenderConfig::default()
        };
        match ConfiguredBackend::from_config(&config) {
            Ok(backend) => assert_eq!(backend.kind(), BackendKind::Gpu),
            Err(e) => println!("No GPU: {e}"),
        }
    }
}
