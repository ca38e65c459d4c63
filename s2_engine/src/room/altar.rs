use std::ops::RangeInclusive;

use crate::hotspot::Hotspots;
use crate::kernel::{GameRequest, Kernel};
use crate::panorama::{PanoramaSprite, PanoramaSpriteId, SurfaceId};
use crate::sound::mixer::CENTER_PAN;
use crate::system::track::ALWAYS;
use crate::system::{
    AnimTarget, Animated, CelRes, CycleKind, Event, EventKind, Key, MoveKind, Point, Rect,
    ScreenItem, ScreenItemId, ScriptId, SoundTrack,
};

use super::{RoomAssets, RoomLogic, ALTAR_ROOM, GLOBAL_RECT, TAPE_PLAYER_ROOM};

/// One game flag per prayer stick placed on the altar.
pub const PRAYER_STICK_FLAGS: RangeInclusive<u16> = 115..=126;

const PANORAMA_WIDTH: i16 = 1024;
const PANORAMA_HEIGHT: i16 = 96;
/// Room the panorama faces away from on entry.
const ENTRY_ROOM: u16 = 25010;
const ENTRY_PAN: i16 = 512;

const LOSE_STICK_SCRIPT: u16 = 0;
const TAPE_SCRIPT: u16 = 0;

const AMBIENCE: u16 = 26001;
const EMPTY_ALTAR_SOUND: u16 = 26010;
const SAND_SOUND: u16 = 26020;
const STICK_LOST_SOUND: u16 = 26030;
const TAPE_SOUND: u16 = 26105;
const STICK_DAMAGE: i32 = -10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AltarAction {
    TapePlayer,
    Altar,
    Pool,
}

/// The tribal altar: prayer sticks drawn on its panorama, a tape player
/// close-up and an ambient sound loop.
#[derive(Debug, Default)]
pub struct AltarRoom {
    surface: Option<SurfaceId>,
    sticks: Vec<(u16, PanoramaSpriteId)>,
    hotspots: Hotspots<AltarAction>,
    falling: Option<(u16, PanoramaSpriteId)>,
}

impl AltarRoom {
    pub fn surface(&self) -> Option<SurfaceId> {
        self.surface
    }

    pub fn stick_count(&self) -> usize {
        self.sticks.len()
    }

    fn draw_prayer_sticks(&mut self, kernel: &mut Kernel, assets: &mut RoomAssets) {
        let Some(surface) = self.surface else {
            return;
        };
        for (slot, flag) in PRAYER_STICK_FLAGS.enumerate() {
            if !kernel.flag(flag) {
                continue;
            }
            let mut stick = PanoramaSprite::solid(
                ALTAR_ROOM,
                Point::new(100 + slot as i16 * 20, 40),
                8,
                24,
                1,
                100 + slot as u8,
            );
            stick.move_speed = 1;
            stick.step_size = Point::new(6, 6);
            let id = assets.sprite(kernel, stick, surface);
            self.sticks.push((flag, id));
        }
    }
}

impl RoomLogic for AltarRoom {
    fn init(&mut self, kernel: &mut Kernel, assets: &mut RoomAssets, previous: u16) {
        let surface = assets.surface(kernel, PANORAMA_WIDTH, PANORAMA_HEIGHT, 0);
        if previous == ENTRY_ROOM {
            kernel.panorama.pan_by(surface, ENTRY_PAN);
        }
        self.surface = Some(surface);
        self.draw_prayer_sticks(kernel, assets);

        let mut ambience = SoundTrack::new();
        ambience
            .add_sound(AMBIENCE, 80, false, CENTER_PAN, ALWAYS)
            .add_wait(5, 10)
            .add_prs(26002, 60, 70, 30)
            .add_prs(26003, 60, 70, 70)
            .add_wait(4, 0);
        let track = assets.track(kernel, ambience);
        kernel.play_track(track);

        self.hotspots.add(Rect::new(400, 150, 460, 200), AltarAction::TapePlayer);
        self.hotspots.add(Rect::new(200, 100, 360, 300), AltarAction::Altar);
        self.hotspots.add(Rect::new(0, 300, 200, 383), AltarAction::Pool);
    }

    fn dispose(&mut self, _kernel: &mut Kernel) {
        self.hotspots.clear();
        self.sticks.clear();
        self.falling = None;
    }

    fn handle_event(&mut self, event: &mut Event, kernel: &mut Kernel, assets: &mut RoomAssets) {
        let Some(action) = self.hotspots.handle(event) else {
            return;
        };
        kernel.log_event(format!("altar.click {action:?}"));
        match action {
            AltarAction::TapePlayer => kernel.request(GameRequest::OpenSubRoom(TAPE_PLAYER_ROOM)),
            AltarAction::Altar => {
                if self.falling.is_some() {
                    return;
                }
                match self.sticks.pop() {
                    Some(stick) => {
                        self.falling = Some(stick);
                        assets.script(kernel, "lose prayer stick", LOSE_STICK_SCRIPT);
                    }
                    None => kernel.play_sound(EMPTY_ALTAR_SOUND, 100, false),
                }
            }
            AltarAction::Pool => kernel.play_sound(SAND_SOUND, 100, false),
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
        if tag != LOSE_STICK_SCRIPT {
            return;
        }
        let Some((flag, sprite)) = self.falling else {
            kernel.dispose_script(script);
            return;
        };
        match state {
            0 => {
                let from = kernel
                    .panorama
                    .sprite(sprite)
                    .map(|stick| stick.position())
                    .unwrap_or_default();
                let to = Point::new(from.x + 60, from.y);
                let target = AnimTarget::Panorama(sprite);
                let jump = MoveKind::Arc { height: 30 };
                if assets.move_to(kernel, jump, target, to, Some(script)).is_none() {
                    kernel.scripts.cue(script);
                }
            }
            _ => {
                assets.remove_sprite(kernel, sprite);
                kernel.clear_flag(flag);
                kernel.play_sound(STICK_LOST_SOUND, 100, false);
                kernel.request(GameRequest::ChangeLife(STICK_DAMAGE));
                self.falling = None;
                kernel.dispose_script(script);
            }
        }
    }

    fn sub_room_closed(&mut self, kernel: &mut Kernel, _assets: &mut RoomAssets, number: u16) {
        kernel.log_event(format!("altar.sub_room_closed {number}"));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapeAction {
    Play,
    Eject,
}

/// Close-up of the tape player beside the altar.
#[derive(Debug, Default)]
pub struct TapePlayer {
    button: Option<ScreenItemId>,
    hotspots: Hotspots<TapeAction>,
    playing: bool,
}

impl TapePlayer {
    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

impl RoomLogic for TapePlayer {
    fn init(&mut self, kernel: &mut Kernel, assets: &mut RoomAssets, _previous: u16) {
        let owner = assets.scope().owner();
        assets.item(kernel, CelRes::new(TAPE_PLAYER_ROOM, 0, 0), Point::new(0, 0), 50);
        let mut button = ScreenItem::new(
            owner,
            CelRes::new(TAPE_PLAYER_ROOM, 1, 0),
            Point::new(280, 180),
            51,
        )
        .with_cels(4);
        button.cycle_speed = 1;
        self.button = Some(assets.add_item(kernel, button));
        self.hotspots.add(Rect::new(280, 180, 340, 240), TapeAction::Play);
        self.hotspots.add(Rect::new(360, 180, 420, 240), TapeAction::Eject);
    }

    fn handle_event(&mut self, event: &mut Event, kernel: &mut Kernel, assets: &mut RoomAssets) {
        if event.is_claimed() {
            return;
        }
        if event.kind == EventKind::KeyDown && event.key == Some(Key::Escape) {
            kernel.request(GameRequest::CloseSubRoom);
            event.claim();
            return;
        }
        match self.hotspots.handle(event) {
            Some(TapeAction::Play) if !self.playing => {
                self.playing = true;
                assets.script(kernel, "tape player", TAPE_SCRIPT);
            }
            Some(TapeAction::Play) => {}
            Some(TapeAction::Eject) => kernel.request(GameRequest::CloseSubRoom),
            None => {
                // The close-up covers the room; presses elsewhere close it.
                if event.kind == EventKind::MousePress && GLOBAL_RECT.contains(event.position) {
                    kernel.request(GameRequest::CloseSubRoom);
                    event.claim();
                }
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
        if tag != TAPE_SCRIPT {
            return;
        }
        let Some(button) = self.button else {
            return;
        };
        let target = AnimTarget::Screen(button);
        match state {
            0 => {
                assets.cycle(kernel, CycleKind::EndForward, target, Some(script));
            }
            1 => {
                kernel.play_sound(TAPE_SOUND, 100, false);
                kernel.scripts.set_seconds(script, 4);
            }
            2 => {
                assets.cycle(kernel, CycleKind::EndBack, target, Some(script));
            }
            _ => {
                self.playing = false;
                kernel.dispose_script(script);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::tests::{kernel_with_mixer, run};
    use crate::room::{Room, RoomKind};
    use crate::sound::MixerEvent;

    fn played(events: &[MixerEvent]) -> Vec<u16> {
        events
            .iter()
            .filter_map(|event| match event {
                MixerEvent::Play { sound, .. } => Some(*sound),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn entering_draws_placed_sticks_and_starts_the_ambience() {
        let (mut kernel, mixer) = kernel_with_mixer();
        kernel.set_flag(115);
        kernel.set_flag(120);
        let mut room = Room::new(ALTAR_ROOM);
        room.init(&mut kernel, ENTRY_ROOM);

        let RoomKind::Altar(altar) = room.kind() else {
            panic!("altar room expected");
        };
        assert_eq!(altar.stick_count(), 2);
        let surface = altar.surface().unwrap();
        assert_eq!(kernel.panorama.surface(surface).unwrap().pan_x(), ENTRY_PAN);
        assert_eq!(kernel.panorama.surface(surface).unwrap().sprites().len(), 2);

        run(&mut room, &mut kernel, 3);
        assert_eq!(played(&mixer.events()), vec![AMBIENCE]);
    }

    #[test]
    fn clicking_the_altar_loses_the_last_stick() {
        let (mut kernel, _) = kernel_with_mixer();
        kernel.set_flag(115);
        kernel.set_flag(116);
        let mut room = Room::new(ALTAR_ROOM);
        room.init(&mut kernel, 0);
        let sprites_before = kernel.panorama.sprite_count();

        assert!(room.handle_event(&mut Event::mouse_press(Point::new(250, 150)), &mut kernel));
        // A second click while the stick is still falling does nothing.
        room.handle_event(&mut Event::mouse_press(Point::new(250, 150)), &mut kernel);

        let requests = run(&mut room, &mut kernel, 30);
        assert_eq!(requests, vec![GameRequest::ChangeLife(STICK_DAMAGE)]);
        assert!(kernel.flag(115));
        assert!(!kernel.flag(116));
        assert_eq!(kernel.panorama.sprite_count(), sprites_before - 1);
        assert!(kernel.movers.is_empty());
    }

    #[test]
    fn tape_player_plays_and_closes() {
        let (mut kernel, mixer) = kernel_with_mixer();
        let mut room = Room::new(ALTAR_ROOM);
        room.init(&mut kernel, 0);

        let mut click = Event::mouse_press(Point::new(410, 160));
        assert!(room.handle_event(&mut click, &mut kernel));
        let requests = run(&mut room, &mut kernel, 1);
        assert_eq!(requests, vec![GameRequest::OpenSubRoom(TAPE_PLAYER_ROOM)]);

        assert!(room.open_sub_room(&mut kernel, TAPE_PLAYER_ROOM));
        // The sub-room claims the play button before the altar sees it.
        assert!(room.handle_event(&mut Event::mouse_press(Point::new(300, 200)), &mut kernel));
        run(&mut room, &mut kernel, 10);
        assert!(played(&mixer.events()).contains(&TAPE_SOUND));

        let mut escape = Event::key_down(Key::Escape);
        assert!(room.handle_event(&mut escape, &mut kernel));
        let requests = run(&mut room, &mut kernel, 1);
        assert_eq!(requests, vec![GameRequest::CloseSubRoom]);
        assert!(room.close_sub_room(&mut kernel));
        assert!(kernel.events().iter().any(|event| event == "altar.sub_room_closed 26100"));
    }
}
