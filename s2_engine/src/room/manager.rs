use log::{info, warn};

use crate::kernel::Kernel;
use crate::system::{Event, ScriptId, ScriptTarget};

use super::{GlobalRoom, Room, RoomStatus};

/// Owns the current room and the optional global overlay, and sequences
/// transitions so two rooms never hold assets at the same time.
#[derive(Debug, Default)]
pub struct RoomManager {
    current: Option<Room>,
    previous: u16,
    global: Option<GlobalRoom>,
    auto_highlight: bool,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Room> {
        self.current.as_ref()
    }

    pub fn current_number(&self) -> u16 {
        self.current.as_ref().map_or(0, Room::number)
    }

    pub fn previous_number(&self) -> u16 {
        self.previous
    }

    pub fn global(&self) -> Option<&GlobalRoom> {
        self.global.as_ref()
    }

    pub fn auto_highlight(&self) -> bool {
        self.auto_highlight
    }

    pub fn toggle_auto_highlight(&mut self) -> bool {
        self.auto_highlight = !self.auto_highlight;
        self.auto_highlight
    }

    pub fn status(&self) -> RoomStatus {
        RoomStatus {
            room: self.current_number(),
            previous: self.previous,
            global_room: self.global.as_ref().map(GlobalRoom::number),
            sub_room: self
                .current
                .as_ref()
                .and_then(Room::sub_room)
                .map(|sub_room| sub_room.number()),
            auto_highlight: self.auto_highlight,
        }
    }

    /// Disposes the current room completely, then initialises `number`.
    pub fn load_room(&mut self, kernel: &mut Kernel, number: u16) {
        let previous = match self.current.take() {
            Some(mut room) => {
                room.dispose(kernel);
                room.number()
            }
            None => 0,
        };
        self.previous = previous;
        info!("loading room {number} (from {previous})");
        let mut room = Room::new(number);
        room.init(kernel, previous);
        self.current = Some(room);
    }

    pub fn load_global_room(&mut self, kernel: &mut Kernel, number: u16) {
        self.unload_global_room(kernel);
        let mut global = GlobalRoom::new(number);
        global.init(kernel);
        self.global = Some(global);
    }

    pub fn unload_global_room(&mut self, kernel: &mut Kernel) -> bool {
        match self.global.take() {
            Some(mut global) => {
                global.dispose(kernel);
                true
            }
            None => false,
        }
    }

    pub fn open_sub_room(&mut self, kernel: &mut Kernel, number: u16) -> bool {
        match self.current.as_mut() {
            Some(room) => room.open_sub_room(kernel, number),
            None => {
                warn!("sub-room {number} requested with no room loaded");
                false
            }
        }
    }

    pub fn close_sub_room(&mut self, kernel: &mut Kernel) -> bool {
        self.current
            .as_mut()
            .is_some_and(|room| room.close_sub_room(kernel))
    }

    /// Tears everything down, global overlay first.
    pub fn dispose_all(&mut self, kernel: &mut Kernel) {
        self.unload_global_room(kernel);
        if let Some(mut room) = self.current.take() {
            room.dispose(kernel);
        }
        self.previous = 0;
    }

    pub fn tick(&mut self, kernel: &mut Kernel) {
        if let Some(room) = self.current.as_mut() {
            room.tick(kernel);
        }
    }

    /// Global room first, then the sub-room and its parent.
    pub fn handle_event(&mut self, event: &mut Event, kernel: &mut Kernel) -> bool {
        if let Some(global) = self.global.as_mut() {
            if global.handle_event(event, kernel) {
                return true;
            }
        }
        match self.current.as_mut() {
            Some(room) => room.handle_event(event, kernel),
            None => event.is_claimed(),
        }
    }

    /// Routes a room-side script transition to whoever owns the script.
    pub fn change_state(
        &mut self,
        kernel: &mut Kernel,
        target: ScriptTarget,
        script: ScriptId,
        state: i32,
    ) {
        match (target, self.current.as_mut(), self.global.as_mut()) {
            (ScriptTarget::Room(tag), Some(room), _) => {
                room.change_state(kernel, tag, script, state)
            }
            (ScriptTarget::SubRoom(tag), Some(room), _) => {
                room.change_sub_room_state(kernel, tag, script, state)
            }
            (ScriptTarget::GlobalRoom(tag), _, Some(global)) => {
                global.change_state(kernel, tag, script, state)
            }
            (target, ..) => warn!("script {script} fired for {target:?} with no owner loaded"),
        }
    }
}
