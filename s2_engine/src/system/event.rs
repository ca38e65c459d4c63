use serde::{Deserialize, Serialize};

use super::types::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    KeyDown,
    MousePress,
    MouseRelease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key", content = "char", rename_all = "snake_case")]
pub enum Key {
    Enter,
    Escape,
    Tab,
    F3,
    F4,
    CtrlS,
    Char(char),
}

/// Input event injected by the platform layer. The first handler that acts
/// on it claims it; later handlers check `is_claimed` and stay out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub key: Option<Key>,
    pub position: Point,
    #[serde(default)]
    claimed: bool,
}

impl Event {
    pub fn key_down(key: Key) -> Self {
        Self {
            kind: EventKind::KeyDown,
            key: Some(key),
            position: Point::default(),
            claimed: false,
        }
    }

    pub fn mouse_press(position: Point) -> Self {
        Self {
            kind: EventKind::MousePress,
            key: None,
            position,
            claimed: false,
        }
    }

    pub fn mouse_release(position: Point) -> Self {
        Self {
            kind: EventKind::MouseRelease,
            key: None,
            position,
            claimed: false,
        }
    }

    pub fn is_mouse(&self) -> bool {
        matches!(self.kind, EventKind::MousePress | EventKind::MouseRelease)
    }

    pub fn claim(&mut self) {
        self.claimed = true;
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_start_unclaimed() {
        let mut event = Event::mouse_press(Point::new(4, 5));
        assert!(event.is_mouse());
        assert!(!event.is_claimed());
        event.claim();
        assert!(event.is_claimed());
        assert!(!Event::key_down(Key::Tab).is_mouse());
    }

    #[test]
    fn scripted_events_parse_from_json() {
        let json = r#"{
            "kind": "key_down",
            "key": {"key": "char", "char": "x"},
            "position": {"x": 0, "y": 0}
        }"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.key, Some(Key::Char('x')));
        assert!(!event.is_claimed());
    }
}
