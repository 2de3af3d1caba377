//! Quadtree tile and its lifecycle.
//!
//! A tile moves `Init -> Empty -> Rendering -> Active -> Split` and never
//! back, except that a failed render may drop `Rendering -> Empty` so a
//! higher layer can dispatch it again. Calling a transition from the wrong
//! state is a caller bug and panics.

use crate::{ComputeBackend, ComputeError, DispatchStatus};
use quadzoom_core::Bounds;
use std::fmt;

/// Position of a tile in the quadtree.
///
/// The children of `(g, x, y)` are `(g + 1, 2x + dx, 2y + dy)`. Every region is
/// produced by exactly one split, so the path is a unique identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub generation: u32,
    pub x: u64,
    pub y: u64,
}

impl TileId {
    pub const ROOT: TileId = TileId {
        generation: 0,
        x: 0,
        y: 0,
    };

    /// Child in quadrant order [top_left, top_right, bottom_left, bottom_right].
    pub fn child(&self, quadrant: usize) -> TileId {
        assert!(quadrant < 4, "quadrant {quadrant} out of range");
        TileId {
            generation: self.generation + 1,
            x: self.x * 2 + (quadrant as u64 & 1),
            y: self.y * 2 + (quadrant as u64 >> 1),
        }
    }

    /// Identity of the tile this one was split from. Lookup only; it says
    /// nothing about whether the parent is still alive.
    pub fn parent(&self) -> Option<TileId> {
        if self.generation == 0 {
            return None;
        }
        Some(TileId {
            generation: self.generation - 1,
            x: self.x / 2,
            y: self.y / 2,
        })
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.generation, self.x, self.y)
    }
}

/// Lifecycle states, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TileState {
    /// Created, no image yet.
    Init,
    /// Image allocated, nothing written.
    Empty,
    /// Render dispatched, not yet complete.
    Rendering,
    /// Image holds valid data.
    Active,
    /// Replaced by four children; image still valid until retirement.
    Split,
}

impl TileState {
    /// True once the tile's image has been fully written.
    pub fn is_rendered(self) -> bool {
        matches!(self, TileState::Active | TileState::Split)
    }
}

/// One square region of fractal space with its own image.
#[derive(Debug)]
pub struct Tile<I> {
    id: TileId,
    bounds: Bounds,
    state: TileState,
    image: Option<I>,
    children: Option<[TileId; 4]>,
}

impl<I> Tile<I> {
    /// Root tile of a new quadtree.
    pub fn new_root(bounds: Bounds) -> Self {
        Self::new(TileId::ROOT, bounds)
    }

    fn new(id: TileId, bounds: Bounds) -> Self {
        bounds.assert_valid();
        Self {
            id,
            bounds,
            state: TileState::Init,
            image: None,
            children: None,
        }
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn generation(&self) -> u32 {
        self.id.generation
    }

    pub fn state(&self) -> TileState {
        self.state
    }

    pub fn parent(&self) -> Option<TileId> {
        self.id.parent()
    }

    /// Child identities, present once the tile has split.
    pub fn children(&self) -> Option<&[TileId; 4]> {
        self.children.as_ref()
    }

    /// Backing image. Panics before [`Tile::create_texture`].
    pub fn texture(&self) -> &I {
        match &self.image {
            Some(image) => image,
            None => panic!("tile {} has no texture in state {:?}", self.id, self.state),
        }
    }

    pub fn try_texture(&self) -> Option<&I> {
        self.image.as_ref()
    }

    /// `Init -> Empty`: allocate the backing image from `backend`.
    pub fn create_texture<B>(&mut self, backend: &mut B) -> Result<(), ComputeError>
    where
        B: ComputeBackend<Image = I>,
    {
        self.expect_state(TileState::Init, "create_texture");
        self.image = Some(backend.create_image()?);
        self.state = TileState::Empty;
        Ok(())
    }

    /// `Empty -> Rendering`.
    pub fn set_rendering(&mut self) {
        self.expect_state(TileState::Empty, "set_rendering");
        self.state = TileState::Rendering;
    }

    /// `Rendering -> Active`.
    pub fn set_rendered(&mut self) {
        self.expect_state(TileState::Rendering, "set_rendered");
        self.state = TileState::Active;
    }

    /// `Rendering -> Empty` after a failed render. Image contents are undefined.
    pub fn abandon_render(&mut self) {
        self.expect_state(TileState::Rendering, "abandon_render");
        self.state = TileState::Empty;
    }

    /// Mark the tile `Rendering` and hand it to `backend`.
    ///
    /// A synchronous completion promotes the tile straight to `Active`. A
    /// failed dispatch returns the tile to `Empty`.
    pub fn begin_render<B>(&mut self, backend: &mut B) -> Result<DispatchStatus, ComputeError>
    where
        B: ComputeBackend<Image = I>,
    {
        self.set_rendering();
        let image = match self.image.as_mut() {
            Some(image) => image,
            None => panic!("tile {} is Rendering without an image", self.id),
        };
        match backend.dispatch(self.id, &self.bounds, image) {
            Ok(DispatchStatus::Completed) => {
                self.set_rendered();
                Ok(DispatchStatus::Completed)
            }
            Ok(DispatchStatus::Pending) => Ok(DispatchStatus::Pending),
            Err(e) => {
                self.abandon_render();
                Err(e)
            }
        }
    }

    /// `Active -> Split`: create the four children covering this tile.
    ///
    /// Children start in `Init`, one generation deeper, with the same
    /// iteration budget. The caller takes ownership of them.
    pub fn split(&mut self) -> [Tile<I>; 4] {
        self.expect_state(TileState::Active, "split");
        assert!(self.children.is_none(), "tile {} already split", self.id);

        let quadrants = self.bounds.quadrants();
        let ids = [0, 1, 2, 3].map(|q| self.id.child(q));
        self.children = Some(ids);
        self.state = TileState::Split;

        let [tl, tr, bl, br] = quadrants;
        [
            Tile::new(ids[0], tl),
            Tile::new(ids[1], tr),
            Tile::new(ids[2], bl),
            Tile::new(ids[3], br),
        ]
    }

    /// True once this tile has split and every child has finished rendering.
    ///
    /// `state_of` looks children up by identity. A child it cannot find has
    /// already been retired, which only happens after it rendered.
    pub fn children_all_rendered<F>(&self, state_of: F) -> bool
    where
        F: Fn(TileId) -> Option<TileState>,
    {
        if self.state != TileState::Split {
            return false;
        }
        match &self.children {
            Some(children) => children
                .iter()
                .all(|&child| state_of(child).map_or(true, TileState::is_rendered)),
            None => false,
        }
    }

    fn expect_state(&self, expected: TileState, transition: &str) {
        assert!(
            self.state == expected,
            "{transition} on tile {} requires state {:?}, found {:?}",
            self.id,
            expected,
            self.state
        );
    }
}
