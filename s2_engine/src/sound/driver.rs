use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resource::ResourceError;

/// Interpreter generations that matter to driver selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SciVersion {
    Sci0,
    Sci01,
    Sci1Early,
    Sci1Middle,
    Sci1Late,
    Sci11,
    Sci2,
    Sci21,
    Sci3,
}

impl SciVersion {
    pub fn is_sci32(self) -> bool {
        self >= SciVersion::Sci2
    }
}

impl fmt::Display for SciVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SciVersion::Sci0 => "SCI0",
            SciVersion::Sci01 => "SCI01",
            SciVersion::Sci1Early => "SCI1 early",
            SciVersion::Sci1Middle => "SCI1 middle",
            SciVersion::Sci1Late => "SCI1 late",
            SciVersion::Sci11 => "SCI1.1",
            SciVersion::Sci2 => "SCI2",
            SciVersion::Sci21 => "SCI2.1",
            SciVersion::Sci3 => "SCI3",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum SoundError {
    #[error("MIDI device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("General MIDI is not supported by {0}")]
    UnsupportedVersion(SciVersion),
    #[error("malformed MIDI stream: {0}")]
    ProtocolViolation(String),
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Channel-level operations the sound engine issues once per event.
pub trait SoundDriver {
    fn device_id(&self) -> u8;

    fn note_on(&mut self, channel: u8, note: u8, velocity: u8);

    fn note_off(&mut self, channel: u8, note: u8, velocity: u8);

    fn controller_change(&mut self, channel: u8, controller: u8, value: u8);

    fn program_change(&mut self, channel: u8, program: u8);

    fn pitch_bend(&mut self, channel: u8, bend: u16);

    /// Sets the master volume and returns the previous one.
    fn set_master_volume(&mut self, volume: u8) -> u8;

    fn master_volume(&self) -> u8;

    fn enable(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Sets the reverb mode and returns the previous one.
    fn set_reverb_mode(&mut self, mode: u8) -> u8;
}
