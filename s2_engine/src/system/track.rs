use log::warn;
use rand::Rng;
use serde::Serialize;

use super::arena::Id;
use super::script::{HALT, ScriptId, ScriptRunner};
use crate::sound::AudioMixer;

pub type TrackId = Id<SoundTrack>;

/// Randomness value meaning "always play".
pub const ALWAYS: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackSound {
    pub sound: u16,
    pub volume: i16,
    pub pan: i16,
    pub looping: bool,
    /// Percent chance the sound plays when its node comes up.
    pub randomness: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackNode {
    Header,
    /// Waits `min` seconds, or a random count in `min..=max` when `max` is
    /// non-zero.
    Wait { min: u32, max: u32 },
    Sound(TrackSound),
    /// Plays one sound picked at random.
    Prs(Vec<TrackSound>),
}

/// Ambient sound sequence driven by its own script: state 1 starts the next
/// node, state 2 polls until the node's sound ends. The node list loops.
#[derive(Debug, Clone)]
pub struct SoundTrack {
    nodes: Vec<TrackNode>,
    current: usize,
    current_sound: u16,
    stopped: bool,
    paused: bool,
    script: Option<ScriptId>,
}

impl Default for SoundTrack {
    fn default() -> Self {
        Self {
            nodes: vec![TrackNode::Header],
            current: 0,
            current_sound: 0,
            stopped: true,
            paused: false,
            script: None,
        }
    }
}

impl SoundTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_wait(&mut self, min: u32, max: u32) -> &mut Self {
        self.nodes.push(TrackNode::Wait { min, max });
        self
    }

    pub fn add_sound(
        &mut self,
        sound: u16,
        volume: i16,
        looping: bool,
        pan: i16,
        randomness: u8,
    ) -> &mut Self {
        self.nodes.push(TrackNode::Sound(TrackSound {
            sound,
            volume,
            pan,
            looping,
            randomness,
        }));
        self
    }

    /// Consecutive PRS additions share one node.
    pub fn add_prs(&mut self, sound: u16, randomness: u8, volume: i16, pan: i16) -> &mut Self {
        let entry = TrackSound {
            sound,
            volume,
            pan,
            looping: false,
            randomness,
        };
        match self.nodes.last_mut() {
            Some(TrackNode::Prs(sounds)) => sounds.push(entry),
            _ => self.nodes.push(TrackNode::Prs(vec![entry])),
        }
        self
    }

    pub fn nodes(&self) -> &[TrackNode] {
        &self.nodes
    }

    pub fn current_sound(&self) -> u16 {
        self.current_sound
    }

    pub fn script(&self) -> Option<ScriptId> {
        self.script
    }

    pub fn attach_script(&mut self, script: ScriptId) {
        self.script = Some(script);
    }

    pub fn is_playing(&self) -> bool {
        !self.stopped && !self.paused
    }

    /// Restarts from the first node.
    pub fn play(&mut self, scripts: &mut ScriptRunner) {
        self.paused = false;
        self.stopped = false;
        self.current = 0;
        if let Some(script) = self.script {
            scripts.cue(script);
        }
    }

    pub fn stop(&mut self, mixer: &dyn AudioMixer) {
        self.stopped = true;
        if self.current_sound != 0 {
            mixer.stop(self.current_sound);
        }
    }

    pub fn pause(&mut self, mixer: &dyn AudioMixer) {
        self.paused = true;
        if self.current_sound != 0 {
            mixer.pause(self.current_sound);
        }
    }

    pub fn change_state<R: Rng>(
        &mut self,
        scripts: &mut ScriptRunner,
        script: ScriptId,
        state: i32,
        mixer: &dyn AudioMixer,
        rng: &mut R,
    ) {
        match state {
            0 => {}
            1 => {
                self.advance_node();
                let mut waits = false;
                match self.nodes[self.current].clone() {
                    TrackNode::Header => warn!("sound track has two headers in a row"),
                    TrackNode::Sound(sound) => {
                        self.current_sound = sound.sound;
                        let skip = sound.randomness != ALWAYS
                            && rng.gen_range(0..=100) > sound.randomness as u32;
                        if !skip {
                            mixer.play(sound.sound, sound.volume, sound.pan, sound.looping);
                        }
                    }
                    TrackNode::Wait { min, max } => {
                        self.current_sound = 0;
                        let seconds = if max > 0 {
                            rng.gen_range(min.min(max)..=max)
                        } else {
                            min
                        };
                        scripts.set_seconds(script, seconds);
                        waits = true;
                    }
                    TrackNode::Prs(sounds) => {
                        let sound = sounds[rng.gen_range(0..sounds.len())];
                        self.current_sound = sound.sound;
                        if rng.gen_range(0..100) <= sound.randomness as u32 {
                            mixer.play(sound.sound, sound.volume, sound.pan, false);
                        }
                    }
                }
                if !waits {
                    scripts.set_cycles(script, 1);
                }
            }
            2 => {
                if self.stopped || self.paused {
                    scripts.set_state(script, HALT);
                } else if mixer.is_playing(self.current_sound) {
                    scripts.set_state(script, 1);
                } else {
                    scripts.set_state(script, 0);
                }
                scripts.set_cycles(script, 1);
            }
            _ => warn!("sound track script reached invalid state {state}"),
        }
    }

    /// Moves to the next node, wrapping to the start and stepping over a
    /// header.
    fn advance_node(&mut self) {
        self.current += 1;
        if self.current >= self.nodes.len() {
            self.current = 0;
        }
        if matches!(self.nodes[self.current], TrackNode::Header) && self.nodes.len() > 1 {
            self.current = (self.current + 1) % self.nodes.len();
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::sound::{MixerEvent, RecordingMixer};
    use crate::system::arena::Arena;
    use crate::system::script::ScriptTarget;

    struct Rig {
        scripts: ScriptRunner,
        tracks: Arena<SoundTrack>,
        mixer: RecordingMixer,
        rng: StdRng,
        id: TrackId,
    }

    impl Rig {
        fn new(track: SoundTrack) -> Self {
            let mut scripts = ScriptRunner::new();
            let mut tracks = Arena::new();
            let id = tracks.insert(track);
            let script = scripts.spawn("track", ScriptTarget::Track(id));
            scripts.set_state(script, HALT);
            tracks.get_mut(id).unwrap().attach_script(script);
            Self {
                scripts,
                tracks,
                mixer: RecordingMixer::new(),
                rng: StdRng::seed_from_u64(7),
                id,
            }
        }

        fn tick(&mut self) {
            for script in self.scripts.collect_due() {
                let Some((ScriptTarget::Track(id), state)) = self.scripts.advance(script) else {
                    continue;
                };
                let track = self.tracks.get_mut(id).unwrap();
                track.change_state(&mut self.scripts, script, state, &self.mixer, &mut self.rng);
            }
        }

        fn track(&mut self) -> &mut SoundTrack {
            self.tracks.get_mut(self.id).unwrap()
        }

        fn plays(&self) -> Vec<u16> {
            self.mixer
                .events()
                .iter()
                .filter_map(|event| match event {
                    MixerEvent::Play { sound, .. } => Some(*sound),
                    _ => None,
                })
                .collect()
        }
    }

    #[test]
    fn consecutive_prs_entries_share_a_node() {
        let mut track = SoundTrack::new();
        track.add_prs(1, 100, 127, 50).add_prs(2, 100, 127, 50).add_wait(1, 0);
        track.add_prs(3, 100, 127, 50);
        assert_eq!(track.nodes().len(), 4);
        assert!(matches!(&track.nodes()[1], TrackNode::Prs(sounds) if sounds.len() == 2));
    }

    #[test]
    fn track_waits_for_play_and_loops_through_nodes() {
        let mut track = SoundTrack::new();
        track.add_sound(20001, 100, false, 50, ALWAYS).add_wait(1, 0);
        let mut rig = Rig::new(track);

        for _ in 0..5 {
            rig.tick();
        }
        assert!(rig.plays().is_empty());

        let Rig { tracks, scripts, id, .. } = &mut rig;
        tracks.get_mut(*id).unwrap().play(scripts);
        rig.tick();
        rig.tick();
        assert_eq!(rig.plays(), vec![20001]);

        // Polls while the sound plays.
        for _ in 0..10 {
            rig.tick();
        }
        assert_eq!(rig.plays(), vec![20001]);

        // Sound ends, the wait node runs for a second, then the list loops.
        rig.mixer.finish(20001);
        for _ in 0..70 {
            rig.tick();
        }
        assert_eq!(rig.plays(), vec![20001, 20001]);
    }

    #[test]
    fn stopping_halts_the_script() {
        let mut track = SoundTrack::new();
        track.add_sound(20002, 100, true, 50, ALWAYS);
        let mut rig = Rig::new(track);
        let Rig { tracks, scripts, id, .. } = &mut rig;
        tracks.get_mut(*id).unwrap().play(scripts);
        rig.tick();
        rig.tick();

        let mixer = rig.mixer.clone();
        rig.track().stop(&mixer);
        for _ in 0..3 {
            rig.tick();
        }
        let script = rig.track().script().unwrap();
        assert!(rig.scripts.is_parked(script));
        assert!(!rig.mixer.is_playing(20002));
    }
}
