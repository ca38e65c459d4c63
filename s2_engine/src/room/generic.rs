use crate::kernel::Kernel;
use crate::system::{CelRes, Point};

use super::{RoomAssets, RoomLogic};

/// Any room without bespoke logic: a background and nothing else.
#[derive(Debug)]
pub struct GenericRoom {
    number: u16,
}

impl GenericRoom {
    pub fn new(number: u16) -> Self {
        Self { number }
    }
}

impl RoomLogic for GenericRoom {
    fn init(&mut self, kernel: &mut Kernel, assets: &mut RoomAssets, _previous: u16) {
        assets.item(kernel, CelRes::new(self.number, 0, 0), Point::new(0, 0), 0);
    }
}
