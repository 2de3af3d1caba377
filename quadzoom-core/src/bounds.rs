use serde::{Deserialize, Serialize};

/// Rectangle in fractal space plus the iteration budget used to evaluate it.
///
/// `top` is the smaller y value: rows run from `top` to `bottom` in the same
/// direction texture rows do.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub max_iterations: f64,
}

impl Bounds {
    /// Create bounds, panicking if the rectangle is empty or inverted.
    pub fn new(left: f64, right: f64, top: f64, bottom: f64, max_iterations: f64) -> Self {
        let bounds = Self {
            left,
            right,
            top,
            bottom,
            max_iterations,
        };
        bounds.assert_valid();
        bounds
    }

    /// Panics unless `left < right` and `top < bottom`.
    pub fn assert_valid(&self) {
        assert!(
            self.left < self.right,
            "invalid bounds: left {} must be < right {}",
            self.left,
            self.right
        );
        assert!(
            self.top < self.bottom,
            "invalid bounds: top {} must be < bottom {}",
            self.top,
            self.bottom
        );
    }

    /// Same check as [`Bounds::assert_valid`] without panicking.
    pub fn is_valid(&self) -> bool {
        self.left < self.right && self.top < self.bottom
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Midpoint `(x, y)` of the rectangle.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    /// Closed-interval overlap test.
    ///
    /// Two rectangles overlap unless one lies entirely left of, right of,
    /// above or below the other. Shared edges count as overlap.
    pub fn intersects(&self, other: &Bounds) -> bool {
        !(self.right < other.left
            || self.left > other.right
            || self.bottom < other.top
            || self.top > other.bottom)
    }

    /// Whether the midpoint lies strictly inside on both axes, so that
    /// [`Bounds::quadrants`] yields four non-empty rectangles. Fails once the
    /// rectangle is only a few ulps wide.
    pub fn is_divisible(&self) -> bool {
        let (mid_x, mid_y) = self.center();
        self.left < mid_x && mid_x < self.right && self.top < mid_y && mid_y < self.bottom
    }

    /// Split into four quadrants sharing the midpoint.
    ///
    /// Quadrants are returned as [top_left, top_right, bottom_left, bottom_right],
    /// each carrying this rectangle's `max_iterations`.
    pub fn quadrants(&self) -> [Bounds; 4] {
        let (mid_x, mid_y) = self.center();
        let it = self.max_iterations;
        [
            Bounds::new(self.left, mid_x, self.top, mid_y, it),
            Bounds::new(mid_x, self.right, self.top, mid_y, it),
            Bounds::new(self.left, mid_x, mid_y, self.bottom, it),
            Bounds::new(mid_x, self.right, mid_y, self.bottom, it),
        ]
    }

    /// Pack as the five `f32` values the compute kernel reads, in the order
    /// left, right, top, bottom, max_iterations.
    pub fn to_kernel_args(&self) -> [f32; 5] {
        [
            self.left as f32,
            self.right as f32,
            self.top as f32,
            self.bottom as f32,
            self.max_iterations as f32,
        ]
    }
}
