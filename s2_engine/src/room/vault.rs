use crate::hotspot::Hotspots;
use crate::kernel::{GameRequest, Kernel};
use crate::panorama::{PanoramaSprite, PanoramaSpriteId};
use crate::system::{
    AnimTarget, CelRes, CycleKind, Event, EventKind, Key, MoveKind, Point, Rect, ScreenItem,
    ScreenItemId, ScriptId,
};

use super::{
    RoomAssets, RoomLogic, BOX_CLOSE_UP_ROOM, GLOBAL_RECT, PRAYER_STICK_FLAGS, VAULT_ROOM,
};

/// Set once the ianyi has been taken out of the box.
pub const BOX_EMPTIED_FLAG: u16 = 140;

const OPEN_BOX_SCRIPT: u16 = 0;
const MOVE_SKULL_SCRIPT: u16 = 1;
const STUCK_SKULL_SCRIPT: u16 = 2;

const BOX_SOUND: u16 = 50001;
const SKULL_SOUND: u16 = 50010;
const STUCK_SOUND: u16 = 50011;
const TAKE_SOUND: u16 = 50101;
const STUCK_DAMAGE: i32 = -5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultAction {
    Box,
    Skull,
}

/// The vault: a puzzle box drawn on the panorama and a skull that only
/// slides aside for someone carrying a prayer stick.
#[derive(Debug, Default)]
pub struct VaultRoom {
    lid: Option<PanoramaSpriteId>,
    skull: Option<ScreenItemId>,
    hotspots: Hotspots<VaultAction>,
    box_open: bool,
    skull_open: bool,
}

impl VaultRoom {
    pub fn is_box_open(&self) -> bool {
        self.box_open
    }

    pub fn is_skull_open(&self) -> bool {
        self.skull_open
    }

    fn has_prayer_stick(kernel: &Kernel) -> bool {
        PRAYER_STICK_FLAGS.into_iter().any(|flag| kernel.flag(flag))
    }
}

impl RoomLogic for VaultRoom {
    fn init(&mut self, kernel: &mut Kernel, assets: &mut RoomAssets, _previous: u16) {
        let surface = assets.surface(kernel, 1024, 96, 0);
        let mut lid = PanoramaSprite::solid(VAULT_ROOM, Point::new(300, 40), 32, 16, 4, 60);
        lid.cycle_speed = 1;
        self.lid = Some(assets.sprite(kernel, lid, surface));

        let mut skull = ScreenItem::new(
            assets.scope().owner(),
            CelRes::new(VAULT_ROOM, 1, 0),
            Point::new(480, 180),
            20,
        );
        skull.move_speed = 1;
        skull.step_size = Point::new(5, 5);
        self.skull = Some(assets.add_item(kernel, skull));

        self.hotspots.add(Rect::new(280, 150, 360, 230), VaultAction::Box);
        self.hotspots.add(Rect::new(480, 180, 540, 240), VaultAction::Skull);
    }

    fn dispose(&mut self, _kernel: &mut Kernel) {
        self.hotspots.clear();
    }

    fn handle_event(&mut self, event: &mut Event, kernel: &mut Kernel, assets: &mut RoomAssets) {
        let Some(action) = self.hotspots.handle(event) else {
            return;
        };
        kernel.log_event(format!("vault.click {action:?}"));
        match action {
            VaultAction::Box if self.box_open => {
                kernel.request(GameRequest::OpenSubRoom(BOX_CLOSE_UP_ROOM))
            }
            VaultAction::Box => {
                assets.script(kernel, "open box", OPEN_BOX_SCRIPT);
            }
            VaultAction::Skull if self.skull_open => {}
            VaultAction::Skull if Self::has_prayer_stick(kernel) => {
                self.hotspots.set_enabled(VaultAction::Skull, false);
                assets.script(kernel, "move skull", MOVE_SKULL_SCRIPT);
            }
            VaultAction::Skull => {
                assets.script(kernel, "stuck skull", STUCK_SKULL_SCRIPT);
            }
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
            (OPEN_BOX_SCRIPT, 0) => {
                self.hotspots.set_enabled(VaultAction::Box, false);
                kernel.play_sound(BOX_SOUND, 100, false);
                let started = self.lid.and_then(|lid| {
                    let target = AnimTarget::Panorama(lid);
                    assets.cycle(kernel, CycleKind::EndForward, target, Some(script))
                });
                if started.is_none() {
                    kernel.scripts.cue(script);
                }
            }
            (OPEN_BOX_SCRIPT, _) => {
                self.box_open = true;
                self.hotspots.set_enabled(VaultAction::Box, true);
                kernel.request(GameRequest::OpenSubRoom(BOX_CLOSE_UP_ROOM));
                kernel.dispose_script(script);
            }
            (MOVE_SKULL_SCRIPT, 0) => {
                kernel.play_sound(SKULL_SOUND, 100, false);
                let started = self.skull.and_then(|skull| {
                    let target = AnimTarget::Screen(skull);
                    let aside = Point::new(580, 180);
                    assets.move_to(kernel, MoveKind::Line, target, aside, Some(script))
                });
                if started.is_none() {
                    kernel.scripts.cue(script);
                }
            }
            (MOVE_SKULL_SCRIPT, _) => {
                self.skull_open = true;
                kernel.dispose_script(script);
            }
            (STUCK_SKULL_SCRIPT, _) => {
                kernel.play_sound(STUCK_SOUND, 100, false);
                kernel.request(GameRequest::ChangeLife(STUCK_DAMAGE));
                kernel.dispose_script(script);
            }
            _ => {}
        }
    }

    /// Closing the close-up lowers the lid again.
    fn sub_room_closed(&mut self, kernel: &mut Kernel, assets: &mut RoomAssets, number: u16) {
        if number != BOX_CLOSE_UP_ROOM || !self.box_open {
            return;
        }
        self.box_open = false;
        if let Some(lid) = self.lid {
            assets.cycle(kernel, CycleKind::EndBack, AnimTarget::Panorama(lid), None);
        }
    }
}

/// Close-up of the open box. Taking what is inside sets a flag; clicking
/// anywhere else closes the view.
#[derive(Debug, Default)]
pub struct BoxCloseUp {
    contents: Option<ScreenItemId>,
    hotspots: Hotspots<()>,
}

impl RoomLogic for BoxCloseUp {
    fn init(&mut self, kernel: &mut Kernel, assets: &mut RoomAssets, _previous: u16) {
        assets.item(kernel, CelRes::new(BOX_CLOSE_UP_ROOM, 0, 0), Point::new(0, 0), 50);
        if !kernel.flag(BOX_EMPTIED_FLAG) {
            let item = assets.item(
                kernel,
                CelRes::new(BOX_CLOSE_UP_ROOM, 1, 0),
                Point::new(260, 140),
                51,
            );
            self.contents = Some(item);
            self.hotspots.add(Rect::new(200, 100, 440, 300), ());
        }
    }

    fn handle_event(&mut self, event: &mut Event, kernel: &mut Kernel, assets: &mut RoomAssets) {
        if event.is_claimed() {
            return;
        }
        if self.hotspots.handle(event).is_some() {
            if let Some(contents) = self.contents.take() {
                assets.remove_item(kernel, contents);
            }
            self.hotspots.clear();
            kernel.set_flag(BOX_EMPTIED_FLAG);
            kernel.play_sound(TAKE_SOUND, 100, false);
            return;
        }
        let close = match event.kind {
            EventKind::KeyDown => event.key == Some(Key::Escape),
            EventKind::MousePress => GLOBAL_RECT.contains(event.position),
            EventKind::MouseRelease => false,
        };
        if close {
            kernel.request(GameRequest::CloseSubRoom);
            event.claim();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::tests::{kernel_with_mixer, run};
    use crate::room::{Room, RoomKind};

    fn vault(room: &Room) -> &VaultRoom {
        match room.kind() {
            RoomKind::Vault(vault) => vault,
            other => panic!("vault expected, found {}", other.label()),
        }
    }

    #[test]
    fn opening_the_box_animates_the_lid_then_shows_the_close_up() {
        let (mut kernel, _) = kernel_with_mixer();
        let mut room = Room::new(VAULT_ROOM);
        room.init(&mut kernel, 0);

        assert!(room.handle_event(&mut Event::mouse_press(Point::new(300, 200)), &mut kernel));
        let requests = run(&mut room, &mut kernel, 10);
        assert_eq!(requests, vec![GameRequest::OpenSubRoom(BOX_CLOSE_UP_ROOM)]);
        assert!(vault(&room).is_box_open());

        assert!(room.open_sub_room(&mut kernel, BOX_CLOSE_UP_ROOM));
        room.handle_event(&mut Event::mouse_press(Point::new(300, 200)), &mut kernel);
        assert!(kernel.flag(BOX_EMPTIED_FLAG));

        room.handle_event(&mut Event::mouse_press(Point::new(10, 10)), &mut kernel);
        let requests = run(&mut room, &mut kernel, 1);
        assert_eq!(requests, vec![GameRequest::CloseSubRoom]);
        assert!(room.close_sub_room(&mut kernel));
        assert!(!vault(&room).is_box_open());
        assert_eq!(kernel.cyclers.len(), 1);
    }

    #[test]
    fn skull_needs_a_prayer_stick() {
        let (mut kernel, _) = kernel_with_mixer();
        let mut room = Room::new(VAULT_ROOM);
        room.init(&mut kernel, 0);

        room.handle_event(&mut Event::mouse_press(Point::new(500, 200)), &mut kernel);
        let requests = run(&mut room, &mut kernel, 2);
        assert_eq!(requests, vec![GameRequest::ChangeLife(STUCK_DAMAGE)]);
        assert!(!vault(&room).is_skull_open());

        kernel.set_flag(*PRAYER_STICK_FLAGS.start());
        room.handle_event(&mut Event::mouse_press(Point::new(500, 200)), &mut kernel);
        let requests = run(&mut room, &mut kernel, 30);
        assert!(requests.is_empty());
        assert!(vault(&room).is_skull_open());
        assert!(kernel.scripts.is_empty());
    }
}
