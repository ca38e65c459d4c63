use serde::Serialize;

use crate::system::{
    CelRes, Event, EventKind, ItemOwner, Plane, Point, Rect, ScreenItem, ScreenItemId,
};

/// Cels shown for each button state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ButtonFaces {
    pub enabled: CelRes,
    pub depressed: CelRes,
    pub disabled: CelRes,
}

impl ButtonFaces {
    /// Cel 0 enabled, cel 1 depressed, cel 2 disabled.
    pub const fn from_loop(view: u16, loop_no: i16) -> Self {
        Self {
            enabled: CelRes::new(view, loop_no, 0),
            depressed: CelRes::new(view, loop_no, 1),
            disabled: CelRes::new(view, loop_no, 2),
        }
    }
}

/// What a button did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    Ignored,
    Pressed,
    /// Released inside the hit region after a press.
    Activated,
    /// Released elsewhere; only the face was restored.
    Released,
}

/// Push button with press/release-confirm semantics: a press shows the
/// depressed face, and only a release that still lands inside the hit region
/// activates it.
#[derive(Debug, Clone)]
pub struct Button {
    item: ScreenItemId,
    rect: Rect,
    faces: ButtonFaces,
    enabled: bool,
    pressed: bool,
}

impl Button {
    pub fn new(plane: &mut Plane, owner: ItemOwner, faces: ButtonFaces, rect: Rect) -> Self {
        let item = plane.add(ScreenItem::new(
            owner,
            faces.enabled,
            Point::new(rect.left, rect.top),
            4,
        ));
        Self {
            item,
            rect,
            faces,
            enabled: true,
            pressed: false,
        }
    }

    pub fn item(&self) -> ScreenItemId {
        self.item
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn enable(&mut self, plane: &mut Plane) {
        self.enabled = true;
        self.pressed = false;
        self.show(plane, self.faces.enabled);
    }

    pub fn disable(&mut self, plane: &mut Plane) {
        self.enabled = false;
        self.pressed = false;
        self.show(plane, self.faces.disabled);
    }

    pub fn press(&mut self, plane: &mut Plane) {
        self.pressed = true;
        self.show(plane, self.faces.depressed);
    }

    pub fn release(&mut self, plane: &mut Plane) {
        self.pressed = false;
        let face = if self.enabled {
            self.faces.enabled
        } else {
            self.faces.disabled
        };
        self.show(plane, face);
    }

    /// Claims the event when it presses or activates the button. Any
    /// release disarms a pressed button; only an unclaimed one inside the
    /// hit region activates it.
    pub fn handle(&mut self, event: &mut Event, plane: &mut Plane) -> ButtonAction {
        if !event.is_mouse() || !self.enabled {
            return ButtonAction::Ignored;
        }
        let inside = self.rect.contains(event.position);
        match event.kind {
            EventKind::MouseRelease if self.pressed => {
                self.release(plane);
                if inside && !event.is_claimed() {
                    event.claim();
                    ButtonAction::Activated
                } else {
                    ButtonAction::Released
                }
            }
            EventKind::MousePress if inside && !event.is_claimed() => {
                self.press(plane);
                event.claim();
                ButtonAction::Pressed
            }
            _ => ButtonAction::Ignored,
        }
    }

    /// Drops the button's screen item.
    pub fn dispose(self, plane: &mut Plane) {
        plane.remove(self.item);
    }

    fn show(&self, plane: &mut Plane, face: CelRes) {
        if let Some(item) = plane.get_mut(self.item) {
            item.cel = face;
        }
    }
}
