use crate::kernel::{GameRequest, Kernel};
use crate::system::{
    AnimTarget, CelRes, CycleKind, Event, EventKind, HALT, Key, Point, ScreenItem, ScreenItemId,
    ScriptId,
};

use super::{AssetScope, RoomAssets, RoomLogic};

pub const LOGO_ROOM: u16 = 1000;
pub const OPENING_ROOM: u16 = 1010;
/// Where play starts once the opening is over.
pub const FIRST_ROOM: u16 = 10100;

const LOGO_SCRIPT: u16 = 0;
const OPENING_SCRIPT: u16 = 1;
const LOGO_CELS: i16 = 12;
const OPENING_MUSIC: u16 = 10001;

/// Company logo and opening titles. Any click or Enter/Escape skips ahead.
#[derive(Debug)]
pub struct IntroRoom {
    number: u16,
    logo: Option<ScreenItemId>,
    skipped: bool,
}

impl IntroRoom {
    pub fn new(number: u16) -> Self {
        Self {
            number,
            logo: None,
            skipped: false,
        }
    }

    fn next_room(&self) -> u16 {
        if self.number == LOGO_ROOM {
            OPENING_ROOM
        } else {
            FIRST_ROOM
        }
    }
}

impl RoomLogic for IntroRoom {
    fn init(&mut self, kernel: &mut Kernel, assets: &mut RoomAssets, _previous: u16) {
        match self.number {
            LOGO_ROOM => {
                let mut logo = ScreenItem::new(
                    AssetScope::Room(self.number).owner(),
                    CelRes::new(LOGO_ROOM, 0, 0),
                    Point::new(320, 240),
                    10,
                )
                .with_cels(LOGO_CELS);
                logo.cycle_speed = 2;
                self.logo = Some(assets.add_item(kernel, logo));
                assets.script(kernel, "logo", LOGO_SCRIPT);
            }
            OPENING_ROOM => {
                assets.item(kernel, CelRes::new(OPENING_ROOM, 0, 0), Point::new(0, 0), 1);
                assets.script(kernel, "opening", OPENING_SCRIPT);
            }
            _ => {}
        }
    }

    fn handle_event(&mut self, event: &mut Event, kernel: &mut Kernel, _assets: &mut RoomAssets) {
        let skip = match event.kind {
            EventKind::MousePress => true,
            EventKind::KeyDown => matches!(event.key, Some(Key::Escape | Key::Enter)),
            EventKind::MouseRelease => false,
        };
        if !skip {
            return;
        }
        event.claim();
        if !self.skipped {
            self.skipped = true;
            kernel.log_event(format!("intro.skip {}", self.number));
            kernel.request(GameRequest::LoadRoom(self.next_room()));
        }
    }

    fn change_state(
        &mut self,
        kernel: &mut Kernel,
        assets: &mut RoomAssets,
        tag: u16,
        script: ScriptId,
        state: i32,
    ) {
        match (tag, state) {
            (LOGO_SCRIPT, 0) => {
                if let Some(logo) = self.logo {
                    let target = AnimTarget::Screen(logo);
                    assets.cycle(kernel, CycleKind::EndForward, target, Some(script));
                }
            }
            (LOGO_SCRIPT, 1) => kernel.scripts.set_seconds(script, 2),
            (OPENING_SCRIPT, 0) => {
                kernel.play_sound(OPENING_MUSIC, 100, false);
                kernel.scripts.set_seconds(script, 3);
            }
            (LOGO_SCRIPT, 2) | (OPENING_SCRIPT, 1) => {
                if !self.skipped {
                    self.skipped = true;
                    kernel.request(GameRequest::LoadRoom(self.next_room()));
                }
                kernel.scripts.set_state(script, HALT);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::tests::{kernel_with_mixer, run};
    use crate::room::Room;

    #[test]
    fn logo_cycles_then_moves_on() {
        let (mut kernel, _) = kernel_with_mixer();
        let mut room = Room::new(LOGO_ROOM);
        room.init(&mut kernel, 0);

        let requests = run(&mut room, &mut kernel, 60);
        assert!(requests.is_empty());

        let requests = run(&mut room, &mut kernel, 120);
        assert_eq!(requests, vec![GameRequest::LoadRoom(OPENING_ROOM)]);
        let logo = kernel.plane.items_owned_by(AssetScope::Room(LOGO_ROOM).owner());
        assert_eq!(kernel.plane.get(logo[0]).unwrap().cel.cel, LOGO_CELS - 1);
    }

    #[test]
    fn a_click_skips_once() {
        let (mut kernel, mixer) = kernel_with_mixer();
        let mut room = Room::new(OPENING_ROOM);
        room.init(&mut kernel, LOGO_ROOM);
        run(&mut room, &mut kernel, 1);
        assert_eq!(mixer.events().len(), 1);

        let mut click = Event::mouse_press(Point::new(5, 5));
        assert!(room.handle_event(&mut click, &mut kernel));
        assert!(room.handle_event(&mut Event::key_down(Key::Escape), &mut kernel));
        assert!(!room.handle_event(&mut Event::key_down(Key::Tab), &mut kernel));

        let requests = run(&mut room, &mut kernel, 200);
        assert_eq!(requests, vec![GameRequest::LoadRoom(FIRST_ROOM)]);
    }
}
