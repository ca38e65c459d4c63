use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i16,
    pub y: i16,
}

impl Point {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

/// Half-open rectangle: `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i16,
    pub top: i16,
    pub right: i16,
    pub bottom: i16,
}

impl Rect {
    pub const fn new(left: i16, top: i16, right: i16, bottom: i16) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i16 {
        self.right - self.left
    }

    pub fn height(&self) -> i16 {
        self.bottom - self.top
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x < self.right && point.y >= self.top && point.y < self.bottom
    }
}

/// View resource number plus loop and cel inside it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CelRes {
    pub view: u16,
    pub loop_no: i16,
    pub cel: i16,
}

impl CelRes {
    pub const fn new(view: u16, loop_no: i16, cel: i16) -> Self {
        Self { view, loop_no, cel }
    }
}

/// Anything cyclers and movers can drive.
pub trait Animated {
    fn cel(&self) -> i16;
    fn set_cel(&mut self, cel: i16);
    fn last_cel(&self) -> i16;
    fn cycle_speed(&self) -> u32;

    fn position(&self) -> Point;
    fn set_position(&mut self, position: Point);
    fn move_speed(&self) -> u32;
    fn step_size(&self) -> Point;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_excludes_right_and_bottom_edges() {
        let rect = Rect::new(10, 20, 30, 40);
        assert!(rect.contains(Point::new(10, 20)));
        assert!(rect.contains(Point::new(29, 39)));
        assert!(!rect.contains(Point::new(30, 39)));
        assert!(!rect.contains(Point::new(29, 40)));
        assert_eq!((rect.width(), rect.height()), (20, 20));
    }
}
