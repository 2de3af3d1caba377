//! GPU compute backend for quadtree tile rendering using wgpu.

mod backend;
mod buffers;
mod configured;
mod device;
mod error;
mod pipeline;

pub use backend::{GpuComputeBackend, GpuImage};
pub use buffers::{padded_bytes_per_row, KernelBounds};
pub use configured::{ConfiguredBackend, ConfiguredImage};
pub use device::{GpuAvailability, GpuContext};
pub use error::GpuError;
pub use pipeline::{EscapePipeline, ESCAPE_TIME_WGSL, TILE_FORMAT, WORKGROUP_SIZE};
