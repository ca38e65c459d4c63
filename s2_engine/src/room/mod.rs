//! Rooms, their sub-rooms and the global overlay rooms.
//!
//! Each room number maps to one variant of a closed set; the variant holds
//! its own state and implements [`RoomLogic`]. Everything a room puts on the
//! kernel goes through its [`RoomAssets`], so disposal is complete by
//! construction.

mod altar;
mod assets;
mod generic;
mod global;
mod intro;
mod manager;
mod vault;

use log::warn;
use serde::Serialize;

pub use altar::{AltarRoom, TapePlayer, PRAYER_STICK_FLAGS};
pub use assets::{AssetScope, RoomAssets};
pub use generic::GenericRoom;
pub use global::{GlobalRoom, GLOBAL_RECT};
pub use intro::IntroRoom;
pub use manager::RoomManager;
pub use vault::{BoxCloseUp, VaultRoom};

use crate::kernel::Kernel;
use crate::system::{Event, ScriptId};

pub const INTRO_ROOM: u16 = 1000;
pub const ALTAR_ROOM: u16 = 26000;
pub const VAULT_ROOM: u16 = 50000;
pub const TAPE_PLAYER_ROOM: u16 = 26100;
pub const BOX_CLOSE_UP_ROOM: u16 = 50100;

/// Rooms are grouped by thousands; the group picks the implementation.
pub fn room_group(number: u16) -> u16 {
    number / 1000 * 1000
}

/// Snapshot of where the player is, handed to the interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoomStatus {
    pub room: u16,
    pub previous: u16,
    pub global_room: Option<u16>,
    pub sub_room: Option<u16>,
    pub auto_highlight: bool,
}

impl RoomStatus {
    /// Cutscene and intro rooms keep the toolbar locked.
    pub fn is_interactive(&self) -> bool {
        self.room != 0 && room_group(self.room) != INTRO_ROOM && self.room != 6667
    }
}

/// Behaviour shared by rooms, sub-rooms and global rooms.
pub trait RoomLogic {
    fn init(&mut self, kernel: &mut Kernel, assets: &mut RoomAssets, previous: u16);

    /// Runs before the room's assets are released.
    fn dispose(&mut self, _kernel: &mut Kernel) {}

    fn tick(&mut self, _kernel: &mut Kernel, _assets: &mut RoomAssets) {}

    /// Claims the event if it acted on it.
    fn handle_event(&mut self, _event: &mut Event, _kernel: &mut Kernel, _assets: &mut RoomAssets) {
    }

    fn change_state(
        &mut self,
        _kernel: &mut Kernel,
        _assets: &mut RoomAssets,
        _tag: u16,
        _script: ScriptId,
        _state: i32,
    ) {
    }

    /// Called on the parent after one of its sub-rooms went away.
    fn sub_room_closed(&mut self, _kernel: &mut Kernel, _assets: &mut RoomAssets, _number: u16) {}
}

#[derive(Debug)]
pub enum RoomKind {
    Intro(IntroRoom),
    Altar(AltarRoom),
    Vault(VaultRoom),
    Generic(GenericRoom),
}

impl RoomKind {
    pub fn for_number(number: u16) -> Self {
        match room_group(number) {
            INTRO_ROOM => RoomKind::Intro(IntroRoom::new(number)),
            ALTAR_ROOM => RoomKind::Altar(AltarRoom::default()),
            VAULT_ROOM => RoomKind::Vault(VaultRoom::default()),
            _ => RoomKind::Generic(GenericRoom::new(number)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RoomKind::Intro(_) => "intro",
            RoomKind::Altar(_) => "altar",
            RoomKind::Vault(_) => "vault",
            RoomKind::Generic(_) => "generic",
        }
    }

    fn logic(&mut self) -> &mut dyn RoomLogic {
        match self {
            RoomKind::Intro(room) => room,
            RoomKind::Altar(room) => room,
            RoomKind::Vault(room) => room,
            RoomKind::Generic(room) => room,
        }
    }

    /// Sub-rooms this room knows how to open.
    fn sub_room(&self, number: u16) -> Option<SubRoomKind> {
        match (self, number) {
            (RoomKind::Altar(_), TAPE_PLAYER_ROOM) => {
                Some(SubRoomKind::TapePlayer(TapePlayer::default()))
            }
            (RoomKind::Vault(_), BOX_CLOSE_UP_ROOM) => {
                Some(SubRoomKind::BoxCloseUp(BoxCloseUp::default()))
            }
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum SubRoomKind {
    TapePlayer(TapePlayer),
    BoxCloseUp(BoxCloseUp),
}

impl SubRoomKind {
    fn logic(&mut self) -> &mut dyn RoomLogic {
        match self {
            SubRoomKind::TapePlayer(room) => room,
            SubRoomKind::BoxCloseUp(room) => room,
        }
    }
}

#[derive(Debug)]
pub struct SubRoom {
    number: u16,
    kind: SubRoomKind,
    assets: RoomAssets,
}

impl SubRoom {
    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn kind(&self) -> &SubRoomKind {
        &self.kind
    }

    fn dispose(mut self, kernel: &mut Kernel) {
        self.kind.logic().dispose(kernel);
        self.assets.dispose(kernel);
        kernel.log_event(format!("room.sub.dispose {}", self.number));
    }
}

/// A loaded room and its optional active sub-room.
#[derive(Debug)]
pub struct Room {
    number: u16,
    kind: RoomKind,
    assets: RoomAssets,
    sub_room: Option<SubRoom>,
}

impl Room {
    pub fn new(number: u16) -> Self {
        Self {
            number,
            kind: RoomKind::for_number(number),
            assets: RoomAssets::new(AssetScope::Room(number)),
            sub_room: None,
        }
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn kind(&self) -> &RoomKind {
        &self.kind
    }

    pub fn sub_room(&self) -> Option<&SubRoom> {
        self.sub_room.as_ref()
    }

    pub fn assets(&self) -> &RoomAssets {
        &self.assets
    }

    pub fn init(&mut self, kernel: &mut Kernel, previous: u16) {
        kernel.log_event(format!("room.init {} {}", self.number, self.kind.label()));
        kernel.play_music(self.number);
        self.kind.logic().init(kernel, &mut self.assets, previous);
    }

    /// Releases the sub-room first, then this room's own assets.
    pub fn dispose(&mut self, kernel: &mut Kernel) {
        if let Some(sub_room) = self.sub_room.take() {
            sub_room.dispose(kernel);
        }
        self.kind.logic().dispose(kernel);
        self.assets.dispose(kernel);
        kernel.log_event(format!("room.dispose {}", self.number));
    }

    /// Replaces any open sub-room with `number`.
    pub fn open_sub_room(&mut self, kernel: &mut Kernel, number: u16) -> bool {
        let Some(kind) = self.kind.sub_room(number) else {
            warn!("room {} has no sub-room {number}", self.number);
            return false;
        };
        self.close_sub_room(kernel);
        let scope = AssetScope::SubRoom {
            parent: self.number,
            number,
        };
        let mut sub_room = SubRoom {
            number,
            kind,
            assets: RoomAssets::new(scope),
        };
        kernel.log_event(format!("room.sub.init {number}"));
        sub_room
            .kind
            .logic()
            .init(kernel, &mut sub_room.assets, self.number);
        self.sub_room = Some(sub_room);
        true
    }

    pub fn close_sub_room(&mut self, kernel: &mut Kernel) -> bool {
        let Some(sub_room) = self.sub_room.take() else {
            return false;
        };
        let number = sub_room.number;
        sub_room.dispose(kernel);
        self.kind
            .logic()
            .sub_room_closed(kernel, &mut self.assets, number);
        true
    }

    pub fn tick(&mut self, kernel: &mut Kernel) {
        if let Some(sub_room) = self.sub_room.as_mut() {
            sub_room.kind.logic().tick(kernel, &mut sub_room.assets);
        }
        self.kind.logic().tick(kernel, &mut self.assets);
    }

    /// The sub-room sees the event first; the room only gets it unclaimed.
    pub fn handle_event(&mut self, event: &mut Event, kernel: &mut Kernel) -> bool {
        if let Some(sub_room) = self.sub_room.as_mut() {
            sub_room
                .kind
                .logic()
                .handle_event(event, kernel, &mut sub_room.assets);
        }
        if !event.is_claimed() {
            self.kind
                .logic()
                .handle_event(event, kernel, &mut self.assets);
        }
        event.is_claimed()
    }

    pub fn change_state(&mut self, kernel: &mut Kernel, tag: u16, script: ScriptId, state: i32) {
        self.kind
            .logic()
            .change_state(kernel, &mut self.assets, tag, script, state);
    }

    pub fn change_sub_room_state(
        &mut self,
        kernel: &mut Kernel,
        tag: u16,
        script: ScriptId,
        state: i32,
    ) {
        match self.sub_room.as_mut() {
            Some(sub_room) => {
                sub_room
                    .kind
                    .logic()
                    .change_state(kernel, &mut sub_room.assets, tag, script, state)
            }
            None => warn!("sub-room script {script} fired with no sub-room open"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::kernel::GameRequest;
    use crate::resource::ResourceManager;
    use crate::sound::RecordingMixer;
    use crate::system::ScriptTarget;

    pub(crate) fn kernel_with_mixer() -> (Kernel, RecordingMixer) {
        let mixer = RecordingMixer::new();
        let kernel = Kernel::new(
            Arc::new(ResourceManager::new()),
            Box::new(mixer.clone()),
            3,
        );
        (kernel, mixer)
    }

    /// Runs the kernel and one room for a number of ticks, returning any
    /// requests raised along the way.
    pub(crate) fn run(room: &mut Room, kernel: &mut Kernel, ticks: usize) -> Vec<GameRequest> {
        let mut requests = Vec::new();
        for _ in 0..ticks {
            kernel.animate();
            for script in kernel.scripts.collect_due() {
                match kernel.scripts.advance(script) {
                    Some((ScriptTarget::Room(tag), state)) => {
                        room.change_state(kernel, tag, script, state)
                    }
                    Some((ScriptTarget::SubRoom(tag), state)) => {
                        room.change_sub_room_state(kernel, tag, script, state)
                    }
                    Some((ScriptTarget::Track(track), state)) => {
                        kernel.drive_track(track, script, state)
                    }
                    _ => {}
                }
            }
            room.tick(kernel);
            requests.extend(std::iter::from_fn(|| kernel.take_request()));
        }
        requests
    }

    #[test]
    fn groups_pick_the_variant() {
        assert_eq!(RoomKind::for_number(1000).label(), "intro");
        assert_eq!(RoomKind::for_number(1010).label(), "intro");
        assert_eq!(RoomKind::for_number(26000).label(), "altar");
        assert_eq!(RoomKind::for_number(50020).label(), "vault");
        assert_eq!(RoomKind::for_number(6000).label(), "generic");
    }

    #[test]
    fn unknown_sub_rooms_are_refused() {
        let (mut kernel, _) = kernel_with_mixer();
        let mut room = Room::new(6000);
        room.init(&mut kernel, 0);
        assert!(!room.open_sub_room(&mut kernel, TAPE_PLAYER_ROOM));
        assert!(room.sub_room().is_none());
    }

    #[test]
    fn sub_room_is_disposed_before_its_parent() {
        let (mut kernel, _) = kernel_with_mixer();
        let mut room = Room::new(ALTAR_ROOM);
        room.init(&mut kernel, 0);
        assert!(room.open_sub_room(&mut kernel, TAPE_PLAYER_ROOM));
        room.dispose(&mut kernel);

        let events = kernel.events();
        let sub = events
            .iter()
            .position(|event| event == "room.sub.dispose 26100")
            .unwrap();
        let parent = events
            .iter()
            .position(|event| event == "room.dispose 26000")
            .unwrap();
        assert!(sub < parent);
        assert!(kernel.plane.is_empty());
        assert!(kernel.scripts.is_empty());
    }

    #[test]
    fn status_locks_intro_and_cutscene_rooms() {
        let status = |room| RoomStatus {
            room,
            ..RoomStatus::default()
        };
        assert!(!status(1000).is_interactive());
        assert!(!status(6667).is_interactive());
        assert!(status(26000).is_interactive());
    }
}
