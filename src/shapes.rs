pub mod point;
pub mod polygon;
pub mod rect;

pub use point::Point;
pub use polygon::Polygon;
pub use rect::Rect;
