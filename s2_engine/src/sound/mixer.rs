use std::{cell::RefCell, collections::BTreeSet, fmt, rc::Rc};

use serde::Serialize;

/// Pan value meaning "centred"; nodes only send pan when it differs.
pub const CENTER_PAN: i16 = 50;

/// Digital audio playback, addressed by audio resource number.
pub trait AudioMixer {
    fn play(&self, sound: u16, volume: i16, pan: i16, looping: bool);
    fn stop(&self, _sound: u16) {}
    fn pause(&self, _sound: u16) {}
    fn resume(&self, _sound: u16) {}
    fn is_playing(&self, sound: u16) -> bool;
}

impl fmt::Debug for dyn AudioMixer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AudioMixer")
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MixerEvent {
    Play {
        sound: u16,
        volume: i16,
        pan: i16,
        looping: bool,
    },
    Stop {
        sound: u16,
    },
    Pause {
        sound: u16,
    },
    Resume {
        sound: u16,
    },
}

/// Mixer stand-in that keeps a call log and a set of "playing" sounds.
/// Sounds keep playing until stopped or `finish`ed.
#[derive(Clone, Default)]
pub struct RecordingMixer {
    events: Rc<RefCell<Vec<MixerEvent>>>,
    playing: Rc<RefCell<BTreeSet<u16>>>,
}

impl RecordingMixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MixerEvent> {
        self.events.borrow().clone()
    }

    /// Marks a sound as having run to its end.
    pub fn finish(&self, sound: u16) {
        self.playing.borrow_mut().remove(&sound);
    }
}

impl AudioMixer for RecordingMixer {
    fn play(&self, sound: u16, volume: i16, pan: i16, looping: bool) {
        self.playing.borrow_mut().insert(sound);
        self.events.borrow_mut().push(MixerEvent::Play {
            sound,
            volume,
            pan,
            looping,
        });
    }

    fn stop(&self, sound: u16) {
        self.playing.borrow_mut().remove(&sound);
        self.events.borrow_mut().push(MixerEvent::Stop { sound });
    }

    fn pause(&self, sound: u16) {
        self.events.borrow_mut().push(MixerEvent::Pause { sound });
    }

    fn resume(&self, sound: u16) {
        self.events.borrow_mut().push(MixerEvent::Resume { sound });
    }

    fn is_playing(&self, sound: u16) -> bool {
        self.playing.borrow().contains(&sound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_mixer_tracks_playback() {
        let mixer = RecordingMixer::new();
        mixer.play(10905, 127, CENTER_PAN, false);
        mixer.play(20001, 80, 20, true);
        assert!(mixer.is_playing(10905));

        mixer.finish(10905);
        mixer.stop(20001);
        assert!(!mixer.is_playing(10905));
        assert!(!mixer.is_playing(20001));
        assert_eq!(mixer.events().len(), 3);
        assert_eq!(mixer.events()[2], MixerEvent::Stop { sound: 20001 });
    }
}
