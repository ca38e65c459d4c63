use std::time::Duration;

use log::{debug, warn};
use s2_formats::gm_patch::{NUM_VELOCITY_MAPS, UNMAPPED};
use s2_formats::{GmPatch, MidiCommand, ResourceKey, ResourceType, parse_midi_commands};

use super::device::{HwChannel, MidiDevice, SysExPacer};
use super::driver::{SciVersion, SoundDriver, SoundError};
use crate::resource::ResourceManager;

pub const NUM_CHANNELS: usize = 16;
/// Logical channel reserved for drums.
pub const PERCUSSION_CHANNEL: u8 = 15;
pub const MAX_VOLUME: u8 = 127;
pub const MAX_MASTER_VOLUME: u8 = 15;
pub const DEFAULT_MASTER_VOLUME: u8 = 12;
/// Patch resource number holding the GM remap tables.
pub const GM_PATCH_NUMBER: u16 = 4;

pub const CONTROLLER_VOLUME: u8 = 7;
pub const CONTROLLER_PAN: u8 = 10;
pub const CONTROLLER_DAMPER: u8 = 64;
pub const CONTROLLER_ALL_NOTES_OFF: u8 = 123;

const PITCH_BEND_CENTER: u16 = 0x2000;

/// Logical state of one game-facing channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    pub hw: HwChannel,
    pub program: u8,
    pub out_program: u8,
    pub note_shift: i8,
    pub volume_shift: i8,
    pub velocity_map: u8,
    pub volume: u8,
    pub pan: u8,
    pub damper_on: bool,
    pub pitch_bend: u16,
    pub enabled: bool,
    /// Last volume value written to the hardware channel.
    hw_volume: Option<u8>,
}

impl ChannelState {
    fn new(hw: HwChannel) -> Self {
        Self {
            hw,
            program: UNMAPPED,
            out_program: 0,
            note_shift: 0,
            volume_shift: 0,
            velocity_map: 0,
            volume: UNMAPPED,
            pan: UNMAPPED,
            damper_on: false,
            pitch_bend: PITCH_BEND_CENTER,
            enabled: true,
            hw_volume: None,
        }
    }

    pub fn hw_volume(&self) -> Option<u8> {
        self.hw_volume
    }
}

/// Scales a channel volume by its shift and the master volume.
///
/// Out-of-range sums clamp to full volume for positive shifts and to 1
/// otherwise. A result of zero, or one that overflowed a byte, is bumped by
/// one so a sounding channel never lands on zero.
pub fn scaled_volume(value: u8, shift: i8, master: u8) -> u8 {
    let mut volume = value as i16 + shift as i16;
    if volume > MAX_VOLUME as i16 || volume < 0 {
        volume = if shift > 0 { MAX_VOLUME as i16 } else { 1 };
    }
    let scaled = volume as u16 * master as u16 / MAX_MASTER_VOLUME as u16;
    let mut out = (scaled & 0xFF) as u8;
    if out == 0 || scaled > 0xFF {
        out = out.wrapping_add(1);
    }
    out
}

/// Milliseconds a device needs to swallow a sysex payload plus framing.
pub fn sys_ex_delay(len: usize) -> Duration {
    Duration::from_millis(((len + 2) * 1000 / 3125) as u64)
}

/// General MIDI output that remaps authored MT-32 style programs, notes,
/// velocities and volumes through the patch 4 tables.
pub struct GeneralMidiDriver {
    device: Box<dyn MidiDevice>,
    pacer: Box<dyn SysExPacer>,
    patch: GmPatch,
    channels: Vec<ChannelState>,
    device_id: u8,
    master_volume: u8,
    enabled: bool,
    reverb_mode: u8,
}

impl GeneralMidiDriver {
    pub fn new(
        resources: &ResourceManager,
        version: SciVersion,
        mut device: Box<dyn MidiDevice>,
        pacer: Box<dyn SysExPacer>,
    ) -> Result<Self, SoundError> {
        let device_id = match version {
            SciVersion::Sci0
            | SciVersion::Sci01
            | SciVersion::Sci1Early
            | SciVersion::Sci1Middle => {
                return Err(SoundError::UnsupportedVersion(version));
            }
            v if v.is_sci32() => 7,
            _ => 12,
        };

        device
            .open()
            .map_err(|err| SoundError::DeviceUnavailable(err.to_string()))?;

        let patch = load_patch(resources);

        let mut channels = Vec::with_capacity(NUM_CHANNELS);
        for index in 0..NUM_CHANNELS as u8 {
            let hw = if index == PERCUSSION_CHANNEL {
                device.percussion_channel()
            } else {
                device.allocate_channel()
            };
            let hw = hw.ok_or_else(|| {
                SoundError::DeviceUnavailable(format!("no hardware channel for channel {index}"))
            })?;
            channels.push(ChannelState::new(hw));
        }
        channels[PERCUSSION_CHANNEL as usize].volume_shift = patch.percussion_volume_shift;

        let mut driver = Self {
            device,
            pacer,
            patch,
            channels,
            device_id,
            master_volume: 0,
            enabled: true,
            reverb_mode: 0,
        };

        let init_stream = driver.patch.init_stream.clone();
        driver.send_bytes(&init_stream)?;
        driver.set_master_volume(DEFAULT_MASTER_VOLUME);
        Ok(driver)
    }

    pub fn patch(&self) -> &GmPatch {
        &self.patch
    }

    pub fn channel(&self, channel: u8) -> Option<&ChannelState> {
        self.channels.get(channel as usize)
    }

    /// Plays a raw MIDI byte stream, pausing after each sysex block.
    pub fn send_bytes(&mut self, data: &[u8]) -> Result<(), SoundError> {
        let commands = parse_midi_commands(data)
            .map_err(|err| SoundError::ProtocolViolation(format!("{err:#}")))?;
        for command in commands {
            match command {
                MidiCommand::Short {
                    status,
                    data1,
                    data2,
                } => self.device.send(status, data1, data2),
                MidiCommand::SysEx { data } => {
                    self.device.sys_ex(&data);
                    self.pacer.pause(sys_ex_delay(data.len()));
                }
            }
        }
        Ok(())
    }

    fn remap_note(&self, channel: u8, note: u8) -> Option<u8> {
        let note = note & 0x7F;
        if channel == PERCUSSION_CHANNEL {
            let mapped = self.patch.percussion_map[note as usize];
            return (mapped != UNMAPPED).then_some(mapped);
        }

        let state = &self.channels[channel as usize];
        if state.out_program == UNMAPPED {
            return None;
        }
        let octave = if state.note_shift > 0 { -12 } else { 12 };
        let mut shifted = note as i16 + state.note_shift as i16;
        while shifted > 127 {
            shifted += octave;
        }
        while shifted < 0 {
            shifted += 12;
        }
        Some(shifted as u8)
    }

    fn remap_velocity(&self, channel: u8, velocity: u8) -> u8 {
        let map = self.channels[channel as usize].velocity_map as usize;
        self.patch
            .velocity_maps
            .get(map.min(NUM_VELOCITY_MAPS - 1))
            .map(|table| table[(velocity & 0x7F) as usize])
            .unwrap_or(velocity)
    }

    fn silence(&mut self, channel: u8) {
        let state = &mut self.channels[channel as usize];
        state.damper_on = false;
        let hw = state.hw;
        self.device.control_change(hw, CONTROLLER_ALL_NOTES_OFF, 0);
        self.device.control_change(hw, CONTROLLER_DAMPER, 0);
    }

    fn valid_channel(&self, channel: u8, op: &str) -> bool {
        if (channel as usize) < NUM_CHANNELS {
            true
        } else {
            debug!("{op} on invalid channel {channel}");
            false
        }
    }
}

fn load_patch(resources: &ResourceManager) -> GmPatch {
    let key = ResourceKey::new(ResourceType::Patch, GM_PATCH_NUMBER);
    let Some(resource) = resources.find_resource(key) else {
        warn!("{key} not found, using identity General MIDI mapping");
        return GmPatch::identity();
    };
    match GmPatch::parse(resource.data()) {
        Ok(patch) => patch,
        Err(err) => {
            warn!("{key} is corrupt ({err:#}), using identity General MIDI mapping");
            GmPatch::identity()
        }
    }
}

impl SoundDriver for GeneralMidiDriver {
    fn device_id(&self) -> u8 {
        self.device_id
    }

    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        if !self.valid_channel(channel, "On") {
            return;
        }
        let Some(mapped) = self.remap_note(channel, note) else {
            debug!("On  {channel:2} n {note:3} unmapped");
            return;
        };
        let velocity = self.remap_velocity(channel, velocity);
        let state = &mut self.channels[channel as usize];
        state.enabled = true;
        let hw = state.hw;
        debug!("On  {channel:2} n {note:3} -> {mapped:3} v {velocity:3}");
        self.device.note_on(hw, mapped, velocity);
    }

    fn note_off(&mut self, channel: u8, note: u8, velocity: u8) {
        if !self.valid_channel(channel, "Off") {
            return;
        }
        let Some(mapped) = self.remap_note(channel, note) else {
            debug!("Off {channel:2} n {note:3} unmapped");
            return;
        };
        let hw = self.channels[channel as usize].hw;
        debug!("Off {channel:2} n {note:3} -> {mapped:3}");
        self.device.note_off(hw, mapped, velocity);
    }

    fn controller_change(&mut self, channel: u8, controller: u8, value: u8) {
        if !self.valid_channel(channel, "CC") {
            return;
        }
        let master = self.master_volume;
        let enabled = self.enabled;
        let state = &mut self.channels[channel as usize];
        let hw = state.hw;

        match controller {
            CONTROLLER_VOLUME => {
                state.volume = value;
                if !enabled {
                    return;
                }
                if channel != PERCUSSION_CHANNEL && state.out_program == UNMAPPED {
                    debug!("CC  {channel:2} volume {value} held, program unmapped");
                    return;
                }
                let out = scaled_volume(value, state.volume_shift, master);
                if state.hw_volume == Some(out) {
                    return;
                }
                state.hw_volume = Some(out);
                debug!("CC  {channel:2} volume {value} -> {out}");
                self.device.control_change(hw, CONTROLLER_VOLUME, out);
            }
            CONTROLLER_PAN => {
                if state.pan == value {
                    return;
                }
                state.pan = value;
                debug!("CC  {channel:2} pan {value}");
                self.device.control_change(hw, CONTROLLER_PAN, value);
            }
            CONTROLLER_DAMPER => {
                let on = value != 0;
                if state.damper_on == on {
                    return;
                }
                state.damper_on = on;
                debug!("CC  {channel:2} damper {on}");
                self.device.control_change(hw, CONTROLLER_DAMPER, value);
            }
            CONTROLLER_ALL_NOTES_OFF => {
                debug!("CC  {channel:2} all notes off");
                state.enabled = false;
            }
            _ => debug!("CC  {channel:2} controller {controller} ignored"),
        }
    }

    fn program_change(&mut self, channel: u8, program: u8) {
        if !self.valid_channel(channel, "PC") {
            return;
        }
        let program = program & 0x7F;
        if channel == PERCUSSION_CHANNEL || self.channels[channel as usize].program == program {
            return;
        }

        let out_program = self.patch.program_map[program as usize];
        let note_shift = self.patch.note_shift[program as usize];
        let volume_shift = self.patch.volume_shift[program as usize];
        let velocity_map = self.patch.program_velocity_map[program as usize];

        let state = &mut self.channels[channel as usize];
        let was_unmapped = state.out_program == UNMAPPED;
        state.program = program;
        state.velocity_map = velocity_map;
        state.out_program = out_program;
        debug!("PC  {channel:2} program {program} -> {out_program}");

        if out_program == UNMAPPED {
            state.enabled = false;
            self.silence(channel);
            return;
        }

        state.enabled = true;
        let mut needs_volume = was_unmapped;
        if state.note_shift != note_shift {
            state.note_shift = note_shift;
            needs_volume = true;
            self.silence(channel);
        }

        let state = &mut self.channels[channel as usize];
        if state.volume_shift != volume_shift {
            state.volume_shift = volume_shift;
            needs_volume = true;
        }
        let hw = state.hw;
        let volume = state.volume;
        if needs_volume && volume != UNMAPPED {
            self.controller_change(channel, CONTROLLER_VOLUME, volume);
        }
        self.device.program_change(hw, out_program);
    }

    fn pitch_bend(&mut self, channel: u8, bend: u16) {
        if !self.valid_channel(channel, "PB") {
            return;
        }
        let state = &mut self.channels[channel as usize];
        if state.pitch_bend == bend {
            return;
        }
        state.pitch_bend = bend;
        let hw = state.hw;
        debug!("PB  {channel:2} {bend:#06x}");
        self.device.pitch_bend(hw, bend);
    }

    fn set_master_volume(&mut self, volume: u8) -> u8 {
        let old = self.master_volume;
        self.master_volume = volume.min(MAX_MASTER_VOLUME);
        debug!("MV  {old} -> {}", self.master_volume);
        if !self.enabled {
            return old;
        }
        for channel in 0..NUM_CHANNELS as u8 {
            let volume = self.channels[channel as usize].volume;
            if volume != UNMAPPED {
                self.controller_change(channel, CONTROLLER_VOLUME, volume);
            }
        }
        old
    }

    fn master_volume(&self) -> u8 {
        self.master_volume
    }

    fn enable(&mut self, enabled: bool) {
        debug!("EN  {enabled}");
        self.enabled = enabled;
        if enabled {
            self.set_master_volume(self.master_volume);
        } else {
            for state in &mut self.channels {
                state.hw_volume = Some(0);
                self.device.control_change(state.hw, CONTROLLER_VOLUME, 0);
            }
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_reverb_mode(&mut self, mode: u8) -> u8 {
        std::mem::replace(&mut self.reverb_mode, mode)
    }
}
