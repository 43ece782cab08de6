//! Converting physical sizes to per-axis pixel radii.
//!
//! The mask operators only take pixel radii. Callers that let the user
//! enter a size in a physical unit convert it here first. On images with
//! non-square pixels the size is converted at the lower of the two
//! resolutions, and the radius along the higher-resolution axis is then
//! scaled by `max(xres, yres) / min(xres, yres)`.

/// Length units a radius may be entered in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Unit {
    #[default]
    Pixels,
    Inches,
    Millimeters,
    Points,
    Picas,
}

impl Unit {
    /// Units per inch; `None` for pixels.
    pub fn per_inch(self) -> Option<f64> {
        match self {
            Unit::Pixels => None,
            Unit::Inches => Some(1.0),
            Unit::Millimeters => Some(25.4),
            Unit::Points => Some(72.0),
            Unit::Picas => Some(6.0),
        }
    }
}

/// Image resolution in pixels per inch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolution {
    pub x: f64,
    pub y: f64,
}

impl Default for Resolution {
    fn default() -> Self {
        Self { x: 72.0, y: 72.0 }
    }
}

impl Resolution {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_square(&self) -> bool {
        self.x == self.y
    }

    /// `(radius_x, radius_y)` in pixels for a size of `value` in `unit`.
    /// Pixel sizes are passed through unchanged on both axes.
    pub fn radii(&self, value: f64, unit: Unit) -> (f64, f64) {
        let Some(per_inch) = unit.per_inch() else {
            return (value, value);
        };

        let min = self.x.min(self.y);
        let max = self.x.max(self.y);
        let pixels = value * min / per_inch;
        let factor = if min > 0.0 { max / min } else { 1.0 };

        if self.x == min {
            (pixels, pixels * factor)
        } else {
            (pixels * factor, pixels)
        }
    }

    /// [`Resolution::radii`] rounded to whole pixels, for grow, shrink and
    /// border.
    pub fn pixel_radii(&self, value: f64, unit: Unit) -> (i32, i32) {
        let (rx, ry) = self.radii(value, unit);
        (rx.round() as i32, ry.round() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixels_pass_through() {
        let res = Resolution::new(300.0, 150.0);
        assert_eq!(res.radii(4.5, Unit::Pixels), (4.5, 4.5));
    }

    #[test]
    fn test_square_resolution() {
        let res = Resolution::new(300.0, 300.0);
        assert_eq!(res.pixel_radii(0.1, Unit::Inches), (30, 30));
        assert_eq!(res.pixel_radii(25.4, Unit::Millimeters), (300, 300));
    }

    #[test]
    fn test_non_square_scales_high_resolution_axis() {
        let res = Resolution::new(300.0, 150.0);
        // 1 pt at 150 dpi, doubled on x
        let (rx, ry) = res.radii(72.0, Unit::Points);
        assert_eq!(ry, 150.0);
        assert_eq!(rx, 300.0);

        let res = Resolution::new(100.0, 400.0);
        assert_eq!(res.pixel_radii(6.0, Unit::Picas), (100, 400));
    }
}
