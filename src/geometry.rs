//! Sizes and crop rectangles in displayed-image space.

/// Slack allowed when checking that a rectangle lies inside the image.
const BOUNDS_EPSILON: f32 = 1e-3;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Width over height, or `None` for a degenerate size.
    pub fn aspect(&self) -> Option<f32> {
        if self.is_empty() {
            None
        } else {
            Some(self.width / self.height)
        }
    }
}

impl From<eframe::egui::Vec2> for Size {
    fn from(v: eframe::egui::Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CropUnit {
    /// 0-100 relative to the displayed image.
    #[default]
    Percent,
    /// Displayed (CSS-like) pixels.
    Pixels,
}

/// The user-adjustable region, in displayed coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub unit: CropUnit,
}

impl CropRect {
    pub const fn percent(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            unit: CropUnit::Percent,
        }
    }

    pub const fn pixels(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            unit: CropUnit::Pixels,
        }
    }

    pub fn to_pixels(self, displayed: Size) -> Self {
        match self.unit {
            CropUnit::Pixels => self,
            CropUnit::Percent => Self::pixels(
                self.x * displayed.width / 100.0,
                self.y * displayed.height / 100.0,
                self.width * displayed.width / 100.0,
                self.height * displayed.height / 100.0,
            ),
        }
    }

    pub fn to_percent(self, displayed: Size) -> Self {
        match self.unit {
            CropUnit::Percent => self,
            CropUnit::Pixels if displayed.is_empty() => Self::percent(0.0, 0.0, 0.0, 0.0),
            CropUnit::Pixels => Self::percent(
                self.x / displayed.width * 100.0,
                self.y / displayed.height * 100.0,
                self.width / displayed.width * 100.0,
                self.height / displayed.height * 100.0,
            ),
        }
    }

    /// Ratio of the rectangle as it appears on screen.
    pub fn aspect(self, displayed: Size) -> f32 {
        let px = self.to_pixels(displayed);
        px.width / px.height
    }

    pub fn within(self, displayed: Size) -> bool {
        let px = self.to_pixels(displayed);
        px.x >= -BOUNDS_EPSILON
            && px.y >= -BOUNDS_EPSILON
            && px.width >= 0.0
            && px.height >= 0.0
            && px.x + px.width <= displayed.width + BOUNDS_EPSILON
            && px.y + px.height <= displayed.height + BOUNDS_EPSILON
    }

    /// Rectangle in 0.0-1.0 image coordinates, as the overlay works with it.
    pub fn to_normalized(self, displayed: Size) -> eframe::egui::Rect {
        let pc = self.to_percent(displayed);
        eframe::egui::Rect::from_min_size(
            eframe::egui::pos2(pc.x / 100.0, pc.y / 100.0),
            eframe::egui::vec2(pc.width / 100.0, pc.height / 100.0),
        )
    }

    pub fn from_normalized(rect: eframe::egui::Rect) -> Self {
        Self::percent(
            rect.min.x * 100.0,
            rect.min.y * 100.0,
            rect.width() * 100.0,
            rect.height() * 100.0,
        )
    }
}

/// Fractional rectangle in natural (source) pixel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}
