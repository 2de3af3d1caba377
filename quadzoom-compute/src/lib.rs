//! Tile lifecycle, compute backends and the quadtree that drives them.

pub mod backend;
pub mod cpu;
pub mod error;
pub mod quadtree;
pub mod tile;

pub use backend::{Completions, ComputeBackend, DispatchStatus};
pub use cpu::{CpuBackend, CpuImage};
pub use error::ComputeError;
pub use quadtree::{needs_split, pixel_size, FrameReport, QuadtreeManager};
pub use tile::{Tile, TileId, TileState};

// Re-export core types for convenience
pub use quadzoom_core::*;
