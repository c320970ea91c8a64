use super::point::Point;

/// Inclusive pixel box: both `right` and `bottom` are covered.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn from_corners(a: Point, b: Point) -> Rect {
        Rect {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            right: a.x.max(b.x),
            bottom: a.y.max(b.y),
        }
    }

    /// Saturates at `u32::MAX` for rects spanning the whole `i32` range.
    pub fn width(&self) -> u32 {
        span(self.left, self.right)
    }

    pub fn height(&self) -> u32 {
        span(self.top, self.bottom)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }

    /// Portion of the rect that lands on a `width` x `height` image.
    pub fn clip(&self, width: u32, height: u32) -> Option<Rect> {
        if width == 0 || height == 0 {
            return None;
        }

        let max_x = (width - 1).min(i32::MAX as u32) as i32;
        let max_y = (height - 1).min(i32::MAX as u32) as i32;

        let left = self.left.max(0);
        let top = self.top.max(0);
        let right = self.right.min(max_x);
        let bottom = self.bottom.min(max_y);

        if left > right || top > bottom {
            return None;
        }

        Some(Rect {
            left,
            top,
            right,
            bottom,
        })
    }

    /// Drawable `imageproc` rect for the part of `self` on a `width` x
    /// `height` canvas.
    pub fn on_canvas(&self, width: u32, height: u32) -> Option<imageproc::rect::Rect> {
        let r = self.clip(width, height)?;
        Some(imageproc::rect::Rect::at(r.left, r.top).of_size(r.width(), r.height()))
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

fn span(lo: i32, hi: i32) -> u32 {
    (hi as i64 - lo as i64 + 1).clamp(0, u32::MAX as i64) as u32
}
