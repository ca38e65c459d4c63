//! MIDI output and digital audio boundaries.

pub mod device;
pub mod driver;
pub mod genmidi;
pub mod mixer;

pub use device::{
    DeviceError, HwChannel, MidiDevice, MidiMessage, RecordingMidiDevice, RecordingPacer,
    SysExPacer, ThreadPacer,
};
pub use driver::{SciVersion, SoundDriver, SoundError};
pub use genmidi::{ChannelState, GeneralMidiDriver};
pub use mixer::{AudioMixer, MixerEvent, RecordingMixer};
