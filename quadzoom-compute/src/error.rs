//! Errors raised while allocating tile images or rendering into them.

use crate::TileId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to allocate tile image: {0}")]
    Allocation(String),

    #[error("Dispatch failed for tile {tile}: {reason}")]
    Dispatch { tile: TileId, reason: String },

    #[error("Completion sync failed for tile {tile}: {reason}")]
    Sync { tile: TileId, reason: String },

    #[error("Compute kernel failed to build: {0}")]
    KernelBuild(String),

    #[error("Compute device unavailable: {0}")]
    DeviceUnavailable(String),
}

impl ComputeError {
    /// Tile the failure belongs to, if it is tied to a single render.
    pub fn tile(&self) -> Option<TileId> {
        match self {
            ComputeError::Dispatch { tile, .. } | ComputeError::Sync { tile, .. } => Some(*tile),
            _ => None,
        }
    }
}
