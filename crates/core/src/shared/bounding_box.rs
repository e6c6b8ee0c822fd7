/// Axis-aligned rectangle in pixel coordinates: `(x, y)` is the top-left
/// corner. Width or height may be zero or negative after insetting, in
/// which case the box is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Shrink every side by `pad` pixels. The result may be empty.
    pub fn inset(&self, pad: i32) -> BoundingBox {
        BoundingBox::new(
            self.x + pad,
            self.y + pad,
            self.width - 2 * pad,
            self.height - 2 * pad,
        )
    }

    /// Intersect with the `[0, width) x [0, height)` image rectangle.
    ///
    /// Edges are clamped independently (`max(0, x)`, `min(width, right)`), so
    /// a box lying outside the image yields a non-positive extent rather
    /// than being moved inside.
    pub fn clamp_to(&self, width: u32, height: u32) -> BoundingBox {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.right().min(width as i32);
        let y1 = self.bottom().min(height as i32);
        BoundingBox::new(x0, y0, x1 - x0, y1 - y0)
    }
}
