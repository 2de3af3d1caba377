//! Live quadtree of tiles, refined where the camera looks.
//!
//! Each frame the manager promotes finished renders, splits visible tiles
//! whose texels have grown too large on screen, and retires parents once all
//! four children can be drawn in their place.

use crate::{ComputeBackend, ComputeError, DispatchStatus, Tile, TileId, TileState};
use quadzoom_core::{Bounds, RenderConfig, Viewport};
use std::collections::{HashMap, HashSet};

/// Screen pixels covered by one texel of `tile` when `view` spans `pixel_width` pixels.
pub fn pixel_size(tile: &Bounds, view: &Bounds, pixel_width: u32, resolution: u32) -> f64 {
    tile.width() / view.width() * pixel_width as f64 / resolution as f64
}

/// A tile needs refining when it is on screen, its texels look blocky, and
/// `f64` can still place a midpoint strictly inside it.
pub fn needs_split(
    tile: &Bounds,
    view: &Bounds,
    pixel_width: u32,
    resolution: u32,
    threshold: f64,
) -> bool {
    tile.intersects(view)
        && pixel_size(tile, view, pixel_width, resolution) > threshold
        && tile.is_divisible()
}

/// What one call to [`QuadtreeManager::update`] changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Tiles promoted to `Active` by completed asynchronous work.
    pub promoted: usize,
    /// Tiles that split this frame.
    pub split: usize,
    /// Child renders handed to the backend.
    pub dispatched: usize,
    /// Parents removed because their children are all rendered.
    pub retired: usize,
}

impl FrameReport {
    pub fn is_idle(&self) -> bool {
        *self == FrameReport::default()
    }
}

/// Owns every live tile and drives their lifecycle against one backend.
pub struct QuadtreeManager<B: ComputeBackend> {
    backend: B,
    split_threshold: f64,
    /// Live tiles in insertion order; parents precede their children.
    tiles: Vec<Tile<B::Image>>,
}

impl<B: ComputeBackend> QuadtreeManager<B> {
    /// Create the root tile for `root_bounds` and dispatch its first render.
    pub fn new(mut backend: B, root_bounds: Bounds, split_threshold: f64) -> Result<Self, ComputeError> {
        let mut root = Tile::new_root(root_bounds);
        root.create_texture(&mut backend)?;
        root.begin_render(&mut backend)?;
        log::info!(
            "quadtree: root {:?} dispatched on {} backend ({}x{} texels)",
            root_bounds,
            backend.name(),
            backend.resolution(),
            backend.resolution()
        );

        Ok(Self {
            backend,
            split_threshold,
            tiles: vec![root],
        })
    }

    pub fn from_config(backend: B, config: &RenderConfig) -> Result<Self, ComputeError> {
        Self::new(backend, config.root_bounds(), config.split_threshold)
    }

    /// Live tiles in insertion order. Draw-depth ordering is up to the caller.
    pub fn tiles(&self) -> &[Tile<B::Image>] {
        &self.tiles
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile<B::Image>> {
        self.tiles.iter().find(|t| t.id() == id)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn split_threshold(&self) -> f64 {
        self.split_threshold
    }

    /// Number of live tiles in `state`.
    pub fn count_in_state(&self, state: TileState) -> usize {
        self.tiles.iter().filter(|t| t.state() == state).count()
    }

    /// Advance one frame against the current camera.
    ///
    /// A failed render leaves its tile in `Empty`, logs it, and ends the
    /// frame early with the first such error. That tile keeps its parent
    /// alive until something calls [`QuadtreeManager::redispatch_stalled`].
    pub fn update(&mut self, viewport: &Viewport) -> Result<FrameReport, ComputeError> {
        let mut report = FrameReport::default();

        self.promote_completed(&mut report)?;
        self.split_visible(viewport, &mut report)?;
        self.retire_superseded(&mut report);

        if !report.is_idle() {
            log::debug!(
                "quadtree: +{} active, {} split, {} dispatched, {} retired, {} live",
                report.promoted,
                report.split,
                report.dispatched,
                report.retired,
                self.tiles.len()
            );
        }
        Ok(report)
    }

    /// Retry every tile stuck in `Init` or `Empty` after a failure.
    ///
    /// Returns how many renders were dispatched. Stops at the first error.
    pub fn redispatch_stalled(&mut self) -> Result<usize, ComputeError> {
        let mut dispatched = 0;
        for idx in 0..self.tiles.len() {
            if matches!(self.tiles[idx].state(), TileState::Init | TileState::Empty) {
                Self::start_render(&mut self.tiles[idx], &mut self.backend)?;
                dispatched += 1;
            }
        }
        if dispatched > 0 {
            log::info!("quadtree: redispatched {dispatched} stalled tiles");
        }
        Ok(dispatched)
    }

    fn promote_completed(&mut self, report: &mut FrameReport) -> Result<(), ComputeError> {
        let completions = self.backend.poll_completed();

        for id in completions.completed {
            match self.tiles.iter_mut().find(|t| t.id() == id) {
                Some(tile) => {
                    tile.set_rendered();
                    report.promoted += 1;
                }
                None => log::warn!("quadtree: completion for unknown tile {id}"),
            }
        }

        let mut first_failure = None;
        for (id, err) in completions.failed {
            log::error!("quadtree: render of tile {id} failed: {err}");
            if let Some(tile) = self.tiles.iter_mut().find(|t| t.id() == id) {
                tile.abandon_render();
            }
            first_failure.get_or_insert(err);
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn split_visible(&mut self, viewport: &Viewport, report: &mut FrameReport) -> Result<(), ComputeError> {
        let view = viewport.visible_bounds();
        let resolution = self.backend.resolution();

        // Only tiles already Active before this frame's splits are candidates.
        let candidates: Vec<usize> = self
            .tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| {
                t.state() == TileState::Active
                    && needs_split(
                        &t.bounds(),
                        &view,
                        viewport.pixel_width(),
                        resolution,
                        self.split_threshold,
                    )
            })
            .map(|(idx, _)| idx)
            .collect();

        for idx in candidates {
            let children = self.tiles[idx].split();
            report.split += 1;

            // All four join the live set before any render starts, so a
            // failure part-way through still blocks the parent's retirement.
            let first = self.tiles.len();
            self.tiles.extend(children);

            for child in first..self.tiles.len() {
                if let Err(err) = Self::start_render(&mut self.tiles[child], &mut self.backend) {
                    log::error!(
                        "quadtree: render of tile {} failed: {err}",
                        self.tiles[child].id()
                    );
                    return Err(err);
                }
                report.dispatched += 1;
            }
        }
        Ok(())
    }

    fn retire_superseded(&mut self, report: &mut FrameReport) {
        let states: HashMap<TileId, TileState> =
            self.tiles.iter().map(|t| (t.id(), t.state())).collect();

        let retired: HashSet<TileId> = self
            .tiles
            .iter()
            .filter(|t| t.children_all_rendered(|id| states.get(&id).copied()))
            .map(|t| t.id())
            .collect();

        if retired.is_empty() {
            return;
        }

        // Dropping a tile releases its image
        self.tiles.retain(|t| !retired.contains(&t.id()));
        report.retired += retired.len();
    }

    fn start_render(tile: &mut Tile<B::Image>, backend: &mut B) -> Result<DispatchStatus, ComputeError> {
        if tile.state() == TileState::Init {
            tile.create_texture(backend)?;
        }
        tile.begin_render(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CpuBackend;

    #[test]
    fn full_view_tile_does_not_split() {
        // (4 / 4) * 1024 / 4096 = 0.25
        let view = Bounds::new(-2.0, 2.0, -2.0, 2.0, 0.0);
        let tile = Bounds::new(-2.0, 2.0, -2.0, 2.0, 100.0);
        assert_eq!(pixel_size(&tile, &view, 1024, 4096), 0.25);
        assert!(!needs_split(&tile, &view, 1024, 4096, 0.5));
    }

    #[test]
    fn smaller_tile_in_same_view_does_not_split() {
        // (1 / 4) * 1024 / 4096 = 0.0625
        let view = Bounds::new(-2.0, 2.0, -2.0, 2.0, 0.0);
        let tile = Bounds::new(-0.5, 0.5, -0.5, 0.5, 100.0);
        assert_eq!(pixel_size(&tile, &view, 1024, 4096), 0.0625);
        assert!(!needs_split(&tile, &view, 1024, 4096, 0.5));
    }

    #[test]
    fn zooming_in_triggers_split() {
        // (4 / 0.2) * 1024 / 4096 = 5.0
        let view = Bounds::new(-0.1, 0.1, -0.1, 0.1, 0.0);
        let tile = Bounds::new(-2.0, 2.0, -2.0, 2.0, 100.0);
        assert!((pixel_size(&tile, &view, 1024, 4096) - 5.0).abs() < 1e-9);
        assert!(needs_split(&tile, &view, 1024, 4096, 0.5));
    }

    #[test]
    fn deep_zoom_stops_splitting_at_f64_precision() {
        let root = Bounds::new(-2.0, 2.0, -2.0, 2.0, 8.0);
        let mut m = QuadtreeManager::new(CpuBackend::new(1), root, 0.5).unwrap();
        let vp = Viewport::new((0.3, 0.1), 1e30, 8.0, (64, 64));

        let mut last = FrameReport::default();
        for _ in 0..80 {
            last = m.update(&vp).unwrap();
        }
        assert_eq!(last.split, 0);

        let deepest = m.tiles().iter().map(|t| t.generation()).max().unwrap();
        assert!(deepest < 64, "generation {deepest}");
        for tile in m.tiles() {
            assert!(tile.bounds().is_valid());
        }
        // The tile under the camera could not be divided any further
        assert!(m
            .tiles()
            .iter()
            .any(|t| t.state() == TileState::Active && !t.bounds().is_divisible()));
    }

    #[test]
    fn indivisible_tile_never_splits() {
        let left = 0.3_f64;
        let right = f64::from_bits(left.to_bits() + 1);
        let tile = Bounds::new(left, right, -2.0, 2.0, 100.0);
        let view = Bounds::new(left, right, left, right, 0.0);
        assert!(pixel_size(&tile, &view, 1024, 1) > 0.5);
        assert!(!needs_split(&tile, &view, 1024, 1, 0.5));
    }

    #[test]
    fn off_screen_tile_never_splits() {
        let view = Bounds::new(-0.1, 0.1, -0.1, 0.1, 0.0);
        let tile = Bounds::new(1.0, 2.0, -2.0, 2.0, 100.0);
        assert!(pixel_size(&tile, &view, 1024, 4096) > 0.5);
        assert!(!needs_split(&tile, &view, 1024, 4096, 0.5));
    }

    #[test]
    fn threshold_is_exclusive() {
        // pixel_size exactly 0.5 stays put
        let view = Bounds::new(-2.0, 2.0, -2.0, 2.0, 0.0);
        let tile = Bounds::new(-2.0, 2.0, -2.0, 2.0, 100.0);
        assert_eq!(pixel_size(&tile, &view, 2048, 4096), 0.5);
        assert!(!needs_split(&tile, &view, 2048, 4096, 0.5));
    }

    #[test]
    fn root_is_active_after_construction_on_cpu() {
        let manager =
            QuadtreeManager::new(CpuBackend::new(4), Bounds::new(-2.0, 2.0, -2.0, 2.0, 32.0), 0.5)
                .unwrap();
        assert_eq!(manager.tiles().len(), 1);
        assert_eq!(manager.tiles()[0].state(), TileState::Active);
        assert_eq!(manager.tiles()[0].id(), TileId::ROOT);
    }

    #[test]
    fn cpu_split_retires_parent_in_same_frame() {
        let mut manager =
            QuadtreeManager::new(CpuBackend::new(4), Bounds::new(-2.0, 2.0, -2.0, 2.0, 32.0), 0.5)
                .unwrap();

        // View width 4, 64 px wide, 4 texels: pixel size 16
        let vp = Viewport::new((0.0, 0.0), 0.5, 0.0, (64, 64));
        let report = manager.update(&vp).unwrap();

        assert_eq!(report.split, 1);
        assert_eq!(report.dispatched, 4);
        assert_eq!(report.retired, 1);
        assert_eq!(manager.tiles().len(), 4);
        assert!(manager
            .tiles()
            .iter()
            .all(|t| t.state() == TileState::Active && t.generation() == 1));
    }

    #[test]
    fn new_children_are_not_split_in_the_same_frame() {
        let mut manager =
            QuadtreeManager::new(CpuBackend::new(4), Bounds::new(-2.0, 2.0, -2.0, 2.0, 32.0), 0.5)
                .unwrap();
        let vp = Viewport::new((0.0, 0.0), 0.5, 0.0, (64, 64));

        manager.update(&vp).unwrap();
        assert!(manager.tiles().iter().all(|t| t.generation() == 1));

        manager.update(&vp).unwrap();
        assert!(manager.tiles().iter().all(|t| t.generation() == 2));
        assert_eq!(manager.tiles().len(), 16);
    }

    #[test]
    fn coarse_enough_view_is_idle() {
        let mut manager =
            QuadtreeManager::new(CpuBackend::new(64), Bounds::new(-2.0, 2.0, -2.0, 2.0, 32.0), 0.5)
                .unwrap();
        // 4 / 4 * 16 / 64 = 0.25
        let vp = Viewport::new((0.0, 0.0), 0.5, 0.0, (16, 16));
        let report = manager.update(&vp).unwrap();
        assert!(report.is_idle());
        assert_eq!(manager.tiles().len(), 1);
    }
}
