pub mod bounds;
pub mod config;
pub mod display;
pub mod escape;
pub mod palette;
pub mod viewport;

pub use bounds::Bounds;
pub use config::{BackendKind, ConfigError, RenderConfig};
pub use display::{generation_depth, tile_vertices, TILE_UVS};
pub use escape::{escape_value, pixel_to_fractal, render_tile, render_tile_into, ESCAPE_RADIUS_SQ};
pub use palette::{gradient_ramp, shade, RAMP_LEN};
pub use viewport::Viewport;
