use crate::{ComputeError, TileId};
use quadzoom_core::Bounds;

/// Outcome of handing a tile to a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchStatus {
    /// Pixel data is already in the image.
    Completed,
    /// Work is in flight; the tile shows up in a later [`ComputeBackend::poll_completed`].
    Pending,
}

/// Result of one non-blocking completion poll.
#[derive(Debug, Default)]
pub struct Completions {
    pub completed: Vec<TileId>,
    pub failed: Vec<(TileId, ComputeError)>,
}

impl Completions {
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.failed.is_empty()
    }
}

/// Turns tile bounds into escape-time values stored in a tile-owned image.
///
/// Implementations are driven from a single thread. A dispatched render always
/// runs to completion; there is no cancellation.
pub trait ComputeBackend {
    /// Per-tile image resource. Dropping it releases the underlying storage.
    type Image;

    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Side length in texels of every image this backend allocates.
    fn resolution(&self) -> u32;

    /// Allocate an empty image of [`ComputeBackend::resolution`] squared texels.
    fn create_image(&mut self) -> Result<Self::Image, ComputeError>;

    /// Start rendering `bounds` into `image`.
    ///
    /// On error the image contents are undefined.
    fn dispatch(
        &mut self,
        tile: TileId,
        bounds: &Bounds,
        image: &mut Self::Image,
    ) -> Result<DispatchStatus, ComputeError>;

    /// Collect tiles whose work finished since the last poll, without blocking.
    ///
    /// Each pending tile is reported exactly once, either completed or failed.
    fn poll_completed(&mut self) -> Completions;

    /// Number of renders still in flight.
    fn pending_count(&self) -> usize {
        0
    }
}
