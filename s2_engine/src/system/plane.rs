use std::collections::BTreeSet;

use serde::Serialize;

use super::arena::{Arena, Id};
use super::types::{Animated, CelRes, Point};

pub type ScreenItemId = Id<ScreenItem>;

/// Which part of the game registered a screen item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "number", rename_all = "snake_case")]
pub enum ItemOwner {
    Interface,
    Room(u16),
    GlobalRoom(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenItem {
    pub owner: ItemOwner,
    pub cel: CelRes,
    pub position: Point,
    pub priority: i16,
    pub visible: bool,
    pub num_cels: i16,
    pub cycle_speed: u32,
    pub move_speed: u32,
    pub step_size: Point,
}

impl ScreenItem {
    pub fn new(owner: ItemOwner, cel: CelRes, position: Point, priority: i16) -> Self {
        Self {
            owner,
            cel,
            position,
            priority,
            visible: true,
            num_cels: 1,
            cycle_speed: 6,
            move_speed: 6,
            step_size: Point::new(3, 2),
        }
    }

    pub fn with_cels(mut self, num_cels: i16) -> Self {
        self.num_cels = num_cels.max(1);
        self
    }
}

impl Animated for ScreenItem {
    fn cel(&self) -> i16 {
        self.cel.cel
    }

    fn set_cel(&mut self, cel: i16) {
        self.cel.cel = cel;
    }

    fn last_cel(&self) -> i16 {
        self.num_cels - 1
    }

    fn cycle_speed(&self) -> u32 {
        self.cycle_speed
    }

    fn position(&self) -> Point {
        self.position
    }

    fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    fn move_speed(&self) -> u32 {
        self.move_speed
    }

    fn step_size(&self) -> Point {
        self.step_size
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaneEvent {
    Added { item: ScreenItemId, owner: ItemOwner },
    Removed { item: ScreenItemId, owner: ItemOwner },
}

/// The shared display plane. Keeps a history of registrations so callers can
/// audit what was on screen at any point.
#[derive(Debug, Default)]
pub struct Plane {
    items: Arena<ScreenItem>,
    history: Vec<PlaneEvent>,
}

impl Plane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: ScreenItem) -> ScreenItemId {
        let owner = item.owner;
        let id = self.items.insert(item);
        self.history.push(PlaneEvent::Added { item: id, owner });
        id
    }

    pub fn remove(&mut self, id: ScreenItemId) -> bool {
        match self.items.remove(id) {
            Some(item) => {
                self.history.push(PlaneEvent::Removed {
                    item: id,
                    owner: item.owner,
                });
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: ScreenItemId) -> Option<&ScreenItem> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: ScreenItemId) -> Option<&mut ScreenItem> {
        self.items.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items_owned_by(&self, owner: ItemOwner) -> Vec<ScreenItemId> {
        self.items
            .iter()
            .filter(|(_, item)| item.owner == owner)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn owners(&self) -> BTreeSet<ItemOwner> {
        self.items.iter().map(|(_, item)| item.owner).collect()
    }

    pub fn history(&self) -> &[PlaneEvent] {
        &self.history
    }

    /// Largest number of distinct rooms that had items registered at the
    /// same moment, replayed from the history.
    pub fn peak_room_overlap(&self) -> usize {
        let mut live: Vec<(ScreenItemId, u16)> = Vec::new();
        let mut peak = 0;
        for event in &self.history {
            match event {
                PlaneEvent::Added {
                    item,
                    owner: ItemOwner::Room(room),
                } => live.push((*item, *room)),
                PlaneEvent::Removed { item, .. } => live.retain(|(id, _)| id != item),
                PlaneEvent::Added { .. } => {}
            }
            let rooms: BTreeSet<u16> = live.iter().map(|(_, room)| *room).collect();
            peak = peak.max(rooms.len());
        }
        peak
    }
}
