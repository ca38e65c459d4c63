use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use s2_formats::{MidiCommand, ResourceKey, ResourceType, parse_midi_commands};
use serde::Serialize;

use crate::panorama::Panorama;
use crate::resource::ResourceManager;
use crate::sound::genmidi::MAX_MASTER_VOLUME;
use crate::sound::{AudioMixer, SoundDriver};
use crate::system::{
    Animated, AnimTarget, Arena, CycleKind, Cycler, CyclerId, HALT, MoveKind, Mover, MoverId,
    Plane, Point, Progress, ScriptId, ScriptRunner, ScriptTarget, SoundTrack, TrackId,
};

/// Full volume for digital audio.
pub const MAX_AUDIO_VOLUME: i16 = 127;

/// Work a handler asks the game loop to do once the current dispatch ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GameRequest {
    LoadRoom(u16),
    LoadGlobalRoom(u16),
    UnloadGlobalRoom,
    OpenSubRoom(u16),
    CloseSubRoom,
    /// Health delta applied by the interface.
    ChangeLife(i32),
    ToggleAutoHighlight,
    Save,
    Restart,
}

/// Shared services handed to every room, script target and widget.
pub struct Kernel {
    pub resources: Arc<ResourceManager>,
    pub scripts: ScriptRunner,
    pub plane: Plane,
    pub panorama: Panorama,
    pub cyclers: Arena<Cycler>,
    pub movers: Arena<Mover>,
    pub tracks: Arena<SoundTrack>,
    pub mixer: Box<dyn AudioMixer>,
    pub midi: Option<Box<dyn SoundDriver>>,
    pub flags: BTreeSet<u16>,
    pub rng: StdRng,
    requests: VecDeque<GameRequest>,
    events: Vec<String>,
    ticks: u64,
}

fn animated_mut<'a>(
    plane: &'a mut Plane,
    panorama: &'a mut Panorama,
    target: AnimTarget,
) -> Option<&'a mut dyn Animated> {
    match target {
        AnimTarget::Screen(id) => plane.get_mut(id).map(|item| item as &mut dyn Animated),
        AnimTarget::Panorama(id) => panorama
            .sprite_mut(id)
            .map(|sprite| sprite as &mut dyn Animated),
    }
}

impl Kernel {
    pub fn new(resources: Arc<ResourceManager>, mixer: Box<dyn AudioMixer>, seed: u64) -> Self {
        Self {
            resources,
            scripts: ScriptRunner::new(),
            plane: Plane::new(),
            panorama: Panorama::new(),
            cyclers: Arena::new(),
            movers: Arena::new(),
            tracks: Arena::new(),
            mixer,
            midi: None,
            flags: BTreeSet::new(),
            rng: StdRng::seed_from_u64(seed),
            requests: VecDeque::new(),
            events: Vec::new(),
            ticks: 0,
        }
    }

    pub fn log_event(&mut self, event: impl Into<String>) {
        let event = event.into();
        debug!("{event}");
        self.events.push(event);
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub(crate) fn advance_tick(&mut self) {
        self.ticks += 1;
    }

    pub fn request(&mut self, request: GameRequest) {
        self.requests.push_back(request);
    }

    pub(crate) fn take_request(&mut self) -> Option<GameRequest> {
        self.requests.pop_front()
    }

    pub fn random(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    pub fn flag(&self, flag: u16) -> bool {
        self.flags.contains(&flag)
    }

    pub fn set_flag(&mut self, flag: u16) {
        self.flags.insert(flag);
    }

    pub fn clear_flag(&mut self, flag: u16) {
        self.flags.remove(&flag);
    }

    pub fn spawn_script(&mut self, label: &str, target: ScriptTarget) -> ScriptId {
        let id = self.scripts.spawn(label, target);
        self.log_event(format!("script.start {label} ({id})"));
        id
    }

    pub fn dispose_script(&mut self, id: ScriptId) -> bool {
        let label = self.scripts.label(id).map(str::to_owned);
        let disposed = self.scripts.dispose(id);
        if let Some(label) = label {
            self.log_event(format!("script.dispose {label} ({id})"));
        }
        disposed
    }

    /// Plays an audio resource at centre pan.
    pub fn play_sound(&mut self, sound: u16, volume: i16, looping: bool) {
        let key = ResourceKey::new(ResourceType::Audio, sound);
        if !self.resources.contains(key) {
            debug!("{key} is not in any resource source; handing it to the mixer anyway");
        }
        self.mixer
            .play(sound, volume, crate::sound::mixer::CENTER_PAN, looping);
        self.log_event(format!("sound.play {sound}"));
    }

    /// Hands one channel event to the MIDI driver, if one is attached.
    pub fn send_midi(&mut self, status: u8, data1: u8, data2: u8) {
        let Some(driver) = self.midi.as_mut() else {
            return;
        };
        let channel = status & 0x0F;
        match status & 0xF0 {
            0x80 => driver.note_off(channel, data1, data2),
            0x90 => driver.note_on(channel, data1, data2),
            0xB0 => driver.controller_change(channel, data1, data2),
            0xC0 => driver.program_change(channel, data1),
            0xE0 => {
                let bend = u16::from(data1 & 0x7F) | u16::from(data2 & 0x7F) << 7;
                driver.pitch_bend(channel, bend);
            }
            _ => debug!("no driver call for MIDI status {status:#04x}"),
        }
    }

    /// Streams a Sound resource through the MIDI driver. The payload is read
    /// as running-status MIDI; sysex blocks are left to the driver's init
    /// stream. Returns whether anything was sent.
    pub fn play_music(&mut self, sound: u16) -> bool {
        if self.midi.is_none() {
            return false;
        }
        let key = ResourceKey::new(ResourceType::Sound, sound);
        let Some(resource) = self.resources.find_resource(key) else {
            return false;
        };
        let commands = match parse_midi_commands(resource.data()) {
            Ok(commands) => commands,
            Err(err) => {
                warn!("{key} is not a MIDI stream: {err:#}");
                return false;
            }
        };
        for command in commands {
            match command {
                MidiCommand::Short {
                    status,
                    data1,
                    data2,
                } => self.send_midi(status, data1, data2),
                MidiCommand::SysEx { data } => debug!("{key}: skipping {} byte sysex", data.len()),
            }
        }
        self.log_event(format!("music.play {sound}"));
        true
    }

    pub fn music_volume(&self) -> Option<u8> {
        self.midi.as_ref().map(|driver| driver.master_volume())
    }

    /// Sets the driver's master volume; `None` without a driver.
    pub fn set_music_volume(&mut self, volume: u8) -> Option<u8> {
        let driver = self.midi.as_mut()?;
        driver.set_master_volume(volume);
        let volume = driver.master_volume();
        self.log_event(format!("music.volume {volume}"));
        Some(volume)
    }

    /// Steps the master volume by `delta`, staying within `0..=15`.
    pub fn adjust_music_volume(&mut self, delta: i8) -> Option<u8> {
        let current = self.music_volume()?;
        let volume = (current as i16 + delta as i16).clamp(0, MAX_MASTER_VOLUME as i16);
        self.set_music_volume(volume as u8)
    }

    /// Flips driver output on or off and returns the new state.
    pub fn toggle_music(&mut self) -> Option<bool> {
        let driver = self.midi.as_mut()?;
        let enabled = !driver.is_enabled();
        driver.enable(enabled);
        self.log_event(format!("music.enabled {enabled}"));
        Some(enabled)
    }

    /// Starts a cycler. A caller script is parked until the cycle finishes.
    pub fn start_cycler(
        &mut self,
        kind: CycleKind,
        target: AnimTarget,
        caller: Option<ScriptId>,
    ) -> Option<CyclerId> {
        let mut cycler = Cycler::new(kind, target, caller);
        let sprite = animated_mut(&mut self.plane, &mut self.panorama, target)?;
        cycler.start(sprite);
        if let AnimTarget::Panorama(sprite) = target {
            self.panorama.update(sprite);
        }
        if let Some(caller) = caller {
            self.scripts.park(caller);
        }
        Some(self.cyclers.insert(cycler))
    }

    pub fn stop_cycler(&mut self, id: CyclerId) -> bool {
        self.cyclers.remove(id).is_some()
    }

    /// Starts a mover. A caller script is parked until it arrives.
    pub fn start_mover(
        &mut self,
        kind: MoveKind,
        target: AnimTarget,
        destination: Point,
        caller: Option<ScriptId>,
    ) -> Option<MoverId> {
        let mut mover = Mover::new(kind, target, destination, caller);
        let sprite = animated_mut(&mut self.plane, &mut self.panorama, target)?;
        mover.start(sprite);
        if let Some(caller) = caller {
            self.scripts.park(caller);
        }
        Some(self.movers.insert(mover))
    }

    pub fn stop_mover(&mut self, id: MoverId) -> bool {
        self.movers.remove(id).is_some()
    }

    /// Registers a track with its driving script, halted until played.
    pub fn add_track(&mut self, track: SoundTrack) -> TrackId {
        let id = self.tracks.insert(track);
        let script = self.scripts.spawn("sound track", ScriptTarget::Track(id));
        self.scripts.set_state(script, HALT);
        if let Some(track) = self.tracks.get_mut(id) {
            track.attach_script(script);
        }
        id
    }

    pub fn play_track(&mut self, id: TrackId) {
        if let Some(track) = self.tracks.get_mut(id) {
            track.play(&mut self.scripts);
        }
    }

    pub fn stop_track(&mut self, id: TrackId) {
        if let Some(track) = self.tracks.get_mut(id) {
            track.stop(self.mixer.as_ref());
        }
    }

    pub fn remove_track(&mut self, id: TrackId) {
        self.stop_track(id);
        if let Some(track) = self.tracks.remove(id) {
            if let Some(script) = track.script() {
                self.scripts.dispose(script);
            }
        }
    }

    /// Routes a track script transition to its track.
    pub(crate) fn drive_track(&mut self, id: TrackId, script: ScriptId, state: i32) {
        let Kernel {
            tracks,
            scripts,
            mixer,
            rng,
            ..
        } = self;
        match tracks.get_mut(id) {
            Some(track) => track.change_state(scripts, script, state, mixer.as_ref(), rng),
            None => warn!("script {script} drives missing sound track {id}"),
        }
    }

    /// Steps every cycler and mover once, cueing callers of those that
    /// finished.
    pub fn animate(&mut self) {
        for id in self.cyclers.ids() {
            let Some(cycler) = self.cyclers.get_mut(id) else {
                continue;
            };
            let target = cycler.target;
            let progress = match animated_mut(&mut self.plane, &mut self.panorama, target) {
                Some(sprite) => cycler.step(sprite),
                None => Progress::Done,
            };
            let caller = cycler.caller;
            self.settle(target, progress, caller);
            if progress == Progress::Done {
                self.cyclers.remove(id);
            }
        }

        for id in self.movers.ids() {
            let Some(mover) = self.movers.get_mut(id) else {
                continue;
            };
            let target = mover.target;
            let progress = match animated_mut(&mut self.plane, &mut self.panorama, target) {
                Some(sprite) => mover.step(sprite),
                None => Progress::Done,
            };
            let caller = mover.caller;
            self.settle(target, progress, caller);
            if progress == Progress::Done {
                self.movers.remove(id);
            }
        }
    }

    fn settle(&mut self, target: AnimTarget, progress: Progress, caller: Option<ScriptId>) {
        if progress == Progress::Idle {
            return;
        }
        if let AnimTarget::Panorama(sprite) = target {
            self.panorama.update(sprite);
        }
        if progress == Progress::Done {
            if let Some(caller) = caller {
                self.scripts.cue(caller);
            }
        }
    }
}
