//! GPU error types.

use quadzoom_compute::ComputeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("No GPU adapter found")]
    NoAdapter,

    #[error("Failed to create device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),

    #[error("Buffer mapping failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("Escape-time kernel failed to build: {0}")]
    KernelBuild(String),

    #[error("GPU allocation failed: {0}")]
    Allocation(String),

    #[error("GPU unavailable: {0}")]
    Unavailable(String),
}

impl From<GpuError> for ComputeError {
    fn from(e: GpuError) -> Self {
        match e {
            GpuError::KernelBuild(log) => ComputeError::KernelBuild(log),
            GpuError::Allocation(reason) => ComputeError::Allocation(reason),
            other => ComputeError::DeviceUnavailable(other.to_string()),
        }
    }
}
