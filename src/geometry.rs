//! Integer rectangles in mask pixel space.
//!
//! All rectangles are half-open: a rect covers the pixels
//! `x..x + width` by `y..y + height`.

/// Axis-aligned pixel rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Build a rect from its top-left and exclusive bottom-right corners.
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2.saturating_sub(x1),
            height: y2.saturating_sub(y1),
        }
    }

    pub const fn x2(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub const fn y2(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// `(x1, y1, x2, y2)`.
    pub const fn corners(&self) -> (i32, i32, i32, i32) {
        (self.x, self.y, self.x2(), self.y2())
    }

    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width as usize * self.height as usize
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x2() && y >= self.y && y < self.y2()
    }

    /// Overlap of two rects. The result may be empty, in which case its
    /// width or height is zero.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.x2().min(other.x2());
        let y2 = self.y2().min(other.y2());

        if x2 <= x1 || y2 <= y1 {
            Rect::new(x1, y1, 0, 0)
        } else {
            Rect::from_corners(x1, y1, x2, y2)
        }
    }

    /// Smallest rect containing both. Empty operands are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::from_corners(
            self.x.min(other.x),
            self.y.min(other.y),
            self.x2().max(other.x2()),
            self.y2().max(other.y2()),
        )
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x.saturating_add(dx), self.y.saturating_add(dy), self.width, self.height)
    }

    /// Grow on every side by the given amounts. Saturates at the `i32`
    /// range, so callers clamp huge radii to the canvas first.
    pub fn pad(&self, dx: i32, dy: i32) -> Rect {
        Rect::from_corners(
            self.x.saturating_sub(dx),
            self.y.saturating_sub(dy),
            self.x2().saturating_add(dx),
            self.y2().saturating_add(dy),
        )
    }
}
