use super::point::Point;
use super::rect::Rect;
use serde::{Deserialize, Serialize};

/// Fewest vertices a detector polygon needs before it describes an area.
pub const MIN_VERTICES: usize = 4;

/// Ordered vertex list in the pixel space of the image it was detected on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon {
    #[serde(rename = "vertices", default)]
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn min_x(&self) -> Option<i32> {
        self.points.iter().map(|p| p.x).min()
    }

    pub fn max_x(&self) -> Option<i32> {
        self.points.iter().map(|p| p.x).max()
    }

    pub fn min_y(&self) -> Option<i32> {
        self.points.iter().map(|p| p.y).min()
    }

    pub fn max_y(&self) -> Option<i32> {
        self.points.iter().map(|p| p.y).max()
    }

    /// Axis-aligned box around every vertex, `None` for polygons too short to
    /// describe a face. Each axis is reduced independently so vertex order
    /// never matters.
    pub fn bounds(&self) -> Option<Rect> {
        if self.points.len() < MIN_VERTICES {
            return None;
        }

        Some(Rect::from_corners(
            Point::new(self.min_x()?, self.min_y()?),
            Point::new(self.max_x()?, self.max_y()?),
        ))
    }
}

impl From<Rect> for Polygon {
    fn from(r: Rect) -> Polygon {
        Polygon::new(Vec::from([
            Point::new(r.left, r.top),
            Point::new(r.right, r.top),
            Point::new(r.right, r.bottom),
            Point::new(r.left, r.bottom),
        ]))
    }
}
