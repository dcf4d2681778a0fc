//! Axis-aligned rectangles in user space.

use float_cmp::approx_eq;

#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    #[inline]
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    #[inline]
    pub fn from_size(w: f64, h: f64) -> Self {
        Self::new(0.0, 0.0, w, h)
    }

    /// Rectangle from an origin and a size, as used by `x`/`y`/`width`/`height` attributes.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self::new(x, y, x + w, y + h)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    #[inline]
    pub fn size(&self) -> (f64, f64) {
        (self.width(), self.height())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        approx_eq!(f64, self.width(), 0.0) || approx_eq!(f64, self.height(), 0.0)
    }

    #[inline]
    pub fn translate(&self, by: (f64, f64)) -> Self {
        Self {
            x0: self.x0 + by.0,
            y0: self.y0 + by.1,
            x1: self.x1 + by.0,
            y1: self.y1 + by.1,
        }
    }

    #[inline]
    pub fn scale(self, x: f64, y: f64) -> Self {
        Self {
            x0: self.x0 * x,
            y0: self.y0 * y,
            x1: self.x1 * x,
            y1: self.y1 * y,
        }
    }

    pub fn intersection(&self, rect: &Self) -> Option<Self> {
        let (x0, y0, x1, y1) = (
            self.x0.max(rect.x0),
            self.y0.max(rect.y0),
            self.x1.min(rect.x1),
            self.y1.min(rect.y1),
        );

        if x1 > x0 && y1 > y0 {
            Some(Self { x0, y0, x1, y1 })
        } else {
            None
        }
    }

    pub fn union(&self, rect: &Self) -> Self {
        Self {
            x0: self.x0.min(rect.x0),
            y0: self.y0.min(rect.y0),
            x1: self.x1.max(rect.x1),
            y1: self.y1.max(rect.y1),
        }
    }

    pub fn approx_eq(&self, other: &Self) -> bool {
        approx_eq!(f64, self.x0, other.x0, epsilon = 0.0001)
            && approx_eq!(f64, self.y0, other.y0, epsilon = 0.0001)
            && approx_eq!(f64, self.x1, other.x1, epsilon = 0.0001)
            && approx_eq!(f64, self.y1, other.y1, epsilon = 0.0001)
    }
}
