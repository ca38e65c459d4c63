use anyhow::{Result, bail, ensure};
use serde::Serialize;

const SYSEX_END: u8 = 0xF7;

/// One command decoded from a raw MIDI byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MidiCommand {
    Short { status: u8, data1: u8, data2: u8 },
    /// Payload between `F0` and `F7`, framing bytes excluded.
    SysEx { data: Vec<u8> },
}

/// Splits a running-status MIDI byte stream into commands.
///
/// A data byte with no preceding command byte, a truncated message or a
/// system-exclusive block with no `F7` is an error.
pub fn parse_midi_commands(data: &[u8]) -> Result<Vec<MidiCommand>> {
    let mut commands = Vec::new();
    let mut command = 0u8;
    let mut i = 0usize;

    while i < data.len() {
        if data[i] & 0x80 != 0 {
            command = data[i];
            i += 1;
        }

        match command & 0xF0 {
            0xF0 => {
                let Some(len) = data[i..].iter().position(|&b| b == SYSEX_END) else {
                    bail!("system-exclusive block at {i} has no terminator");
                };
                commands.push(MidiCommand::SysEx {
                    data: data[i..i + len].to_vec(),
                });
                i += len + 1;
            }
            0x80 | 0x90 | 0xA0 | 0xB0 | 0xE0 => {
                ensure!(i + 2 <= data.len(), "truncated {command:#04x} message at {i}");
                commands.push(MidiCommand::Short {
                    status: command,
                    data1: data[i],
                    data2: data[i + 1],
                });
                i += 2;
            }
            0xC0 | 0xD0 => {
                ensure!(i < data.len(), "truncated {command:#04x} message at {i}");
                commands.push(MidiCommand::Short {
                    status: command,
                    data1: data[i],
                    data2: 0,
                });
                i += 1;
            }
            _ => bail!("missing MIDI command byte at {i}"),
        }
    }

    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gm_patch::DEFAULT_INIT_STREAM;

    #[test]
    fn running_status_repeats_previous_command() {
        let commands = parse_midi_commands(&[0xB0, 0x07, 0x40, 0x0A, 0x20, 0xC1, 0x05]).unwrap();
        assert_eq!(
            commands,
            vec![
                MidiCommand::Short {
                    status: 0xB0,
                    data1: 0x07,
                    data2: 0x40,
                },
                MidiCommand::Short {
                    status: 0xB0,
                    data1: 0x0A,
                    data2: 0x20,
                },
                MidiCommand::Short {
                    status: 0xC1,
                    data1: 0x05,
                    data2: 0,
                },
            ]
        );
    }

    #[test]
    fn sysex_payload_excludes_framing() {
        let commands = parse_midi_commands(&[0xF0, 0x7E, 0x7F, 0xF7, 0x90, 60, 100]).unwrap();
        assert_eq!(
            commands[0],
            MidiCommand::SysEx {
                data: vec![0x7E, 0x7F]
            }
        );
        assert_eq!(
            commands[1],
            MidiCommand::Short {
                status: 0x90,
                data1: 60,
                data2: 100
            }
        );
    }

    #[test]
    fn malformed_streams_are_rejected() {
        assert!(parse_midi_commands(&[0x10, 0x20]).is_err());
        assert!(parse_midi_commands(&[0xF0, 0x41, 0x10]).is_err());
        assert!(parse_midi_commands(&[0x90, 60]).is_err());
    }

    #[test]
    fn default_stream_is_well_formed() {
        let commands = parse_midi_commands(DEFAULT_INIT_STREAM).unwrap();
        let sysex = commands
            .iter()
            .filter(|command| matches!(command, MidiCommand::SysEx { .. }))
            .count();
        assert_eq!(sysex, 3);
    }
}
