use serde::Serialize;

use crate::system::{Event, EventKind, Point, Rect};

/// Rectangular click region tagged with a room-specific action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Hotspot<A> {
    pub rect: Rect,
    pub action: A,
    pub enabled: bool,
}

/// Hotspots owned by one room, searched most recent first.
#[derive(Debug, Clone)]
pub struct Hotspots<A> {
    spots: Vec<Hotspot<A>>,
}

impl<A> Default for Hotspots<A> {
    fn default() -> Self {
        Self { spots: Vec::new() }
    }
}

impl<A: Copy + PartialEq> Hotspots<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rect: Rect, action: A) {
        self.spots.push(Hotspot {
            rect,
            action,
            enabled: true,
        });
    }

    pub fn remove(&mut self, action: A) -> bool {
        let before = self.spots.len();
        self.spots.retain(|spot| spot.action != action);
        self.spots.len() != before
    }

    pub fn set_enabled(&mut self, action: A, enabled: bool) {
        for spot in self.spots.iter_mut().filter(|spot| spot.action == action) {
            spot.enabled = enabled;
        }
    }

    pub fn clear(&mut self) {
        self.spots.clear();
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    pub fn hit(&self, point: Point) -> Option<A> {
        self.spots
            .iter()
            .rev()
            .find(|spot| spot.enabled && spot.rect.contains(point))
            .map(|spot| spot.action)
    }

    /// Claims an unclaimed mouse press landing on an enabled hotspot and
    /// returns its action.
    pub fn handle(&self, event: &mut Event) -> Option<A> {
        if event.is_claimed() || event.kind != EventKind::MousePress {
            return None;
        }
        let action = self.hit(event.position)?;
        event.claim();
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Action {
        Door,
        Box,
    }

    #[test]
    fn later_hotspots_win_overlaps() {
        let mut spots = Hotspots::new();
        spots.add(Rect::new(0, 0, 100, 100), Action::Door);
        spots.add(Rect::new(50, 50, 80, 80), Action::Box);
        assert_eq!(spots.hit(Point::new(60, 60)), Some(Action::Box));
        assert_eq!(spots.hit(Point::new(10, 10)), Some(Action::Door));
        assert_eq!(spots.hit(Point::new(100, 10)), None);
    }

    #[test]
    fn disabled_hotspots_let_presses_fall_through() {
        let mut spots = Hotspots::new();
        spots.add(Rect::new(0, 0, 100, 100), Action::Door);
        spots.add(Rect::new(50, 50, 80, 80), Action::Box);
        spots.set_enabled(Action::Box, false);

        let mut press = Event::mouse_press(Point::new(60, 60));
        assert_eq!(spots.handle(&mut press), Some(Action::Door));
        assert!(press.is_claimed());
        assert_eq!(spots.handle(&mut press), None);

        let mut release = Event::mouse_release(Point::new(60, 60));
        assert_eq!(spots.handle(&mut release), None);
        assert!(!release.is_claimed());

        assert!(spots.remove(Action::Door));
        assert!(!spots.remove(Action::Door));
        assert_eq!(spots.len(), 1);
    }
}
