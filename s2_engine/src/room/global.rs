use log::debug;

use crate::hotspot::Hotspots;
use crate::interface::{FLASHBACK_ROOM, GAME_OVER_ROOM, MAP_ROOM, OPTIONS_ROOM};
use crate::kernel::{GameRequest, Kernel};
use crate::system::{CelRes, Event, EventKind, Key, Point, Rect, ScriptId};

use super::{AssetScope, RoomAssets, ALTAR_ROOM, VAULT_ROOM};

/// Area global rooms draw over; mouse events inside it never reach the room
/// underneath.
pub const GLOBAL_RECT: Rect = Rect::new(0, 0, 640, 383);

const GAME_OVER_SOUND: u16 = 10920;

/// Overlay drawn above the current room: options, flashback, map or game
/// over.
#[derive(Debug)]
pub struct GlobalRoom {
    number: u16,
    assets: RoomAssets,
    destinations: Hotspots<u16>,
}

impl GlobalRoom {
    pub fn new(number: u16) -> Self {
        Self {
            number,
            assets: RoomAssets::new(AssetScope::Global(number)),
            destinations: Hotspots::new(),
        }
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn label(&self) -> &'static str {
        match self.number {
            OPTIONS_ROOM => "options",
            FLASHBACK_ROOM => "flashback",
            MAP_ROOM => "map",
            GAME_OVER_ROOM => "game over",
            _ => "global",
        }
    }

    pub fn init(&mut self, kernel: &mut Kernel) {
        kernel.log_event(format!("room.global.init {} {}", self.number, self.label()));
        self.assets
            .item(kernel, CelRes::new(self.number, 0, 0), Point::new(0, 0), 200);
        match self.number {
            MAP_ROOM => {
                self.destinations.add(Rect::new(100, 100, 200, 180), ALTAR_ROOM);
                self.destinations.add(Rect::new(400, 200, 500, 280), VAULT_ROOM);
            }
            GAME_OVER_ROOM => kernel.play_sound(GAME_OVER_SOUND, 100, false),
            _ => {}
        }
    }

    pub fn dispose(&mut self, kernel: &mut Kernel) {
        self.destinations.clear();
        self.assets.dispose(kernel);
        kernel.log_event(format!("room.global.dispose {}", self.number));
    }

    pub fn handle_event(&mut self, event: &mut Event, kernel: &mut Kernel) -> bool {
        if event.is_claimed() {
            return true;
        }
        if self.number == GAME_OVER_ROOM {
            if matches!(event.kind, EventKind::MousePress | EventKind::KeyDown) {
                kernel.request(GameRequest::Restart);
                event.claim();
            }
            return event.is_claimed();
        }

        if let Some(room) = self.destinations.handle(event) {
            kernel.request(GameRequest::UnloadGlobalRoom);
            kernel.request(GameRequest::LoadRoom(room));
            return true;
        }
        match event.kind {
            EventKind::KeyDown if event.key == Some(Key::Escape) => {
                kernel.request(GameRequest::UnloadGlobalRoom);
                event.claim();
            }
            EventKind::KeyDown if self.number == OPTIONS_ROOM => {
                let handled = match event.key {
                    Some(Key::Char('+')) => kernel.adjust_music_volume(1).is_some(),
                    Some(Key::Char('-')) => kernel.adjust_music_volume(-1).is_some(),
                    Some(Key::Char('m')) => kernel.toggle_music().is_some(),
                    _ => false,
                };
                if handled {
                    event.claim();
                }
            }
            EventKind::MousePress | EventKind::MouseRelease
                if GLOBAL_RECT.contains(event.position) =>
            {
                event.claim();
            }
            _ => {}
        }
        event.is_claimed()
    }

    pub fn change_state(&mut self, kernel: &mut Kernel, tag: u16, script: ScriptId, _state: i32) {
        debug!("global room {} has no script tagged {tag}", self.number);
        kernel.dispose_script(script);
    }
}
