use std::{cell::RefCell, rc::Rc, thread, time::Duration};

use serde::Serialize;
use thiserror::Error;

pub const STATUS_NOTE_OFF: u8 = 0x80;
pub const STATUS_NOTE_ON: u8 = 0x90;
pub const STATUS_CONTROL_CHANGE: u8 = 0xB0;
pub const STATUS_PROGRAM_CHANGE: u8 = 0xC0;
pub const STATUS_PITCH_BEND: u8 = 0xE0;

/// Channel number on the output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HwChannel(pub u8);

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no MIDI device available")]
    NoDevice,
    #[error("MIDI device failed to open: {0}")]
    OpenFailed(String),
}

/// Output MIDI port. Channel-level calls default to framing a short message
/// through `send`.
pub trait MidiDevice {
    fn open(&mut self) -> Result<(), DeviceError>;

    fn send(&mut self, status: u8, data1: u8, data2: u8);

    /// Sends a system-exclusive payload without its `F0`/`F7` framing.
    fn sys_ex(&mut self, data: &[u8]);

    fn allocate_channel(&mut self) -> Option<HwChannel>;

    fn percussion_channel(&mut self) -> Option<HwChannel>;

    fn note_on(&mut self, channel: HwChannel, note: u8, velocity: u8) {
        self.send(STATUS_NOTE_ON | channel.0, note, velocity);
    }

    fn note_off(&mut self, channel: HwChannel, note: u8, velocity: u8) {
        self.send(STATUS_NOTE_OFF | channel.0, note, velocity);
    }

    fn control_change(&mut self, channel: HwChannel, controller: u8, value: u8) {
        self.send(STATUS_CONTROL_CHANGE | channel.0, controller, value);
    }

    fn program_change(&mut self, channel: HwChannel, program: u8) {
        self.send(STATUS_PROGRAM_CHANGE | channel.0, program, 0);
    }

    fn pitch_bend(&mut self, channel: HwChannel, bend: u16) {
        self.send(
            STATUS_PITCH_BEND | channel.0,
            (bend & 0x7F) as u8,
            ((bend >> 7) & 0x7F) as u8,
        );
    }
}

/// Blocks the pump while a sysex transfer drains at device speed.
pub trait SysExPacer {
    fn pause(&mut self, delay: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl SysExPacer for ThreadPacer {
    fn pause(&mut self, delay: Duration) {
        thread::sleep(delay);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MidiMessage {
    Short { status: u8, data1: u8, data2: u8 },
    SysEx { data: Vec<u8> },
}

impl MidiMessage {
    pub fn is_control(&self, controller: u8) -> bool {
        matches!(
            self,
            MidiMessage::Short { status, data1, .. }
                if status & 0xF0 == STATUS_CONTROL_CHANGE && *data1 == controller
        )
    }
}

/// Device stand-in that records every message; clones share the log.
#[derive(Debug, Clone)]
pub struct RecordingMidiDevice {
    messages: Rc<RefCell<Vec<MidiMessage>>>,
    available: bool,
    next_channel: u8,
    channel_limit: u8,
}

/// General MIDI reserves this hardware channel for drums.
const GM_PERCUSSION: u8 = 9;

impl Default for RecordingMidiDevice {
    fn default() -> Self {
        Self {
            messages: Rc::default(),
            available: true,
            next_channel: 0,
            channel_limit: 16,
        }
    }
}

impl RecordingMidiDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device whose `open` fails, as when no port is attached.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::default()
        }
    }

    /// Limits how many hardware channels `allocate_channel` hands out.
    pub fn with_channel_limit(limit: u8) -> Self {
        Self {
            channel_limit: limit,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<MidiMessage> {
        self.messages.borrow().clone()
    }

    pub fn clear(&self) {
        self.messages.borrow_mut().clear();
    }
}

impl MidiDevice for RecordingMidiDevice {
    fn open(&mut self) -> Result<(), DeviceError> {
        if self.available {
            Ok(())
        } else {
            Err(DeviceError::NoDevice)
        }
    }

    fn send(&mut self, status: u8, data1: u8, data2: u8) {
        self.messages.borrow_mut().push(MidiMessage::Short {
            status,
            data1,
            data2,
        });
    }

    fn sys_ex(&mut self, data: &[u8]) {
        self.messages.borrow_mut().push(MidiMessage::SysEx {
            data: data.to_vec(),
        });
    }

    fn allocate_channel(&mut self) -> Option<HwChannel> {
        if self.next_channel == GM_PERCUSSION {
            self.next_channel += 1;
        }
        if self.next_channel >= self.channel_limit {
            return None;
        }
        let channel = HwChannel(self.next_channel);
        self.next_channel += 1;
        Some(channel)
    }

    fn percussion_channel(&mut self) -> Option<HwChannel> {
        Some(HwChannel(GM_PERCUSSION))
    }
}

/// Pacer that records requested delays instead of sleeping.
#[derive(Debug, Clone, Default)]
pub struct RecordingPacer {
    delays: Rc<RefCell<Vec<Duration>>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.borrow().clone()
    }
}

impl SysExPacer for RecordingPacer {
    fn pause(&mut self, delay: Duration) {
        self.delays.borrow_mut().push(delay);
    }
}
