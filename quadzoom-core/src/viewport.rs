use crate::{Bounds, RenderConfig};
use serde::{Deserialize, Serialize};

/// Camera over fractal space.
///
/// The visible region is a square of half-width `1 / zoom` around `center`,
/// matching normalized device coordinates `[-1, 1]` on both axes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    center: (f64, f64),
    zoom: f64,
    cutoff: f64,
    pixel_width: u32,
    pixel_height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: (0.0, 0.0),
            zoom: 1.0,
            cutoff: 0.0,
            pixel_width: 1024,
            pixel_height: 1024,
        }
    }
}

impl Viewport {
    pub fn new(center: (f64, f64), zoom: f64, cutoff: f64, pixel_dimensions: (u32, u32)) -> Self {
        Self {
            center,
            zoom,
            cutoff,
            pixel_width: pixel_dimensions.0,
            pixel_height: pixel_dimensions.1,
        }
    }

    /// Viewport framing the configured root tile, using the configured cutoff.
    pub fn from_config(config: &RenderConfig, pixel_dimensions: (u32, u32)) -> Self {
        let root = config.initial_bounds;
        let half_extent = root.width().max(root.height()) / 2.0;
        Self::new(root.center(), 1.0 / half_extent, config.cutoff, pixel_dimensions)
    }

    pub fn set_center(&mut self, x: f64, y: f64) {
        self.center = (x, y);
    }

    /// Zoom must stay strictly positive; the caller is responsible for that.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    pub fn set_cutoff(&mut self, cutoff: f64) {
        self.cutoff = cutoff;
    }

    pub fn set_pixel_dimensions(&mut self, width: u32, height: u32) {
        self.pixel_width = width;
        self.pixel_height = height;
    }

    pub fn center(&self) -> (f64, f64) {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn pixel_width(&self) -> u32 {
        self.pixel_width
    }

    pub fn pixel_height(&self) -> u32 {
        self.pixel_height
    }

    /// Visible rectangle in fractal space.
    ///
    /// The `max_iterations` slot carries the current cutoff so the struct can
    /// serve as a generic region of interest downstream.
    pub fn visible_bounds(&self) -> Bounds {
        let half = 1.0 / self.zoom;
        let (cx, cy) = self.center;
        Bounds {
            left: cx - half,
            right: cx + half,
            top: cy - half,
            bottom: cy + half,
            max_iterations: self.cutoff,
        }
    }

    /// Column-major transform from fractal space to normalized device space.
    ///
    /// Equivalent to `scale(zoom, zoom, 1) * translate(-center)`. Z is passed
    /// through untouched so per-generation depth survives.
    pub fn transform(&self) -> [[f32; 4]; 4] {
        let z = self.zoom as f32;
        let (cx, cy) = (self.center.0 as f32, self.center.1 as f32);
        [
            [z, 0.0, 0.0, 0.0],
            [0.0, z, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [-z * cx, -z * cy, 0.0, 1.0],
        ]
    }
}
