use serde::Serialize;

/// Axis-aligned rectangle in frame pixel coordinates.
///
/// Coordinates are signed because grouped and scaled rectangles may
/// extend slightly past the frame edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
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

    /// True if `other` lies inside `self` grown by `(dx, dy)` on every side.
    pub fn contains_with_margin(&self, other: &Region, dx: i32, dy: i32) -> bool {
        other.x >= self.x - dx
            && other.y >= self.y - dy
            && other.right() <= self.right() + dx
            && other.bottom() <= self.bottom() + dy
    }

    /// Intersection with a `width x height` frame, or `None` when fully outside.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Region> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = self.right().min(width as i32);
        let y2 = self.bottom().min(height as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Region::new(x1, y1, x2 - x1, y2 - y1))
    }
}
