use anyhow::{Result, ensure};

pub const NUM_PROGRAMS: usize = 128;
pub const NUM_NOTES: usize = 128;
pub const NUM_VELOCITIES: usize = 128;
pub const NUM_VELOCITY_MAPS: usize = 4;

/// Remap value meaning "no mapping"; a channel or note mapped here is silent.
pub const UNMAPPED: u8 = 0xFF;

const PROGRAM_MAP_AT: usize = 0;
const NOTE_SHIFT_AT: usize = 128;
const VOLUME_SHIFT_AT: usize = 256;
const PERCUSSION_MAP_AT: usize = 384;
const PERCUSSION_VOLUME_SHIFT_AT: usize = 512;
const PROGRAM_VELOCITY_MAP_AT: usize = 513;
const VELOCITY_MAPS_AT: usize = 641;
const INIT_STREAM_LEN_AT: usize = 1153;
const INIT_STREAM_AT: usize = INIT_STREAM_LEN_AT + 2;

/// MIDI setup sent when no patch resource supplies one: GM system on, a GS
/// reset and reverb macro, then controller/program/bend resets on channel 0.
pub const DEFAULT_INIT_STREAM: &[u8] = &[
    0xF0, 0x7E, 0x7F, 0x09, 0x01, 0xF7, //
    0xF0, 0x41, 0x10, 0x42, 0x12, 0x40, 0x00, 0x7F, 0x00, 0x41, 0xF7, //
    0xF0, 0x41, 0x10, 0x42, 0x12, 0x40, 0x01, 0x30, 0x04, 0x0B, 0xF7, //
    0xB0, 0x79, 0x00, 0x65, 0x00, 0x64, 0x00, 0x06, 0x02, //
    0xC0, 0x00, //
    0xE0, 0x00, 0x40,
];

/// General MIDI remap tables as stored in patch resource 4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GmPatch {
    pub program_map: [u8; NUM_PROGRAMS],
    pub note_shift: [i8; NUM_PROGRAMS],
    pub volume_shift: [i8; NUM_PROGRAMS],
    pub percussion_map: [u8; NUM_NOTES],
    pub percussion_volume_shift: i8,
    pub program_velocity_map: [u8; NUM_PROGRAMS],
    pub velocity_maps: [[u8; NUM_VELOCITIES]; NUM_VELOCITY_MAPS],
    pub init_stream: Vec<u8>,
}

impl GmPatch {
    /// Identity mapping used when the game ships no patch data.
    pub fn identity() -> Self {
        let mut velocity_maps = [[0u8; NUM_VELOCITIES]; NUM_VELOCITY_MAPS];
        velocity_maps[0] = identity_table();
        Self {
            program_map: identity_table(),
            note_shift: [0; NUM_PROGRAMS],
            volume_shift: [0; NUM_PROGRAMS],
            percussion_map: identity_table(),
            percussion_volume_shift: 0,
            program_velocity_map: [0; NUM_PROGRAMS],
            velocity_maps,
            init_stream: DEFAULT_INIT_STREAM.to_vec(),
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        ensure!(
            bytes.len() >= INIT_STREAM_AT,
            "GM patch is {} bytes, need at least {}",
            bytes.len(),
            INIT_STREAM_AT
        );
        let stream_len =
            u16::from_le_bytes([bytes[INIT_STREAM_LEN_AT], bytes[INIT_STREAM_LEN_AT + 1]]) as usize;
        ensure!(
            bytes.len() >= INIT_STREAM_AT + stream_len,
            "GM patch init stream declares {stream_len} bytes past end of data"
        );

        let mut velocity_maps = [[0u8; NUM_VELOCITIES]; NUM_VELOCITY_MAPS];
        for (index, map) in velocity_maps.iter_mut().enumerate() {
            let start = VELOCITY_MAPS_AT + index * NUM_VELOCITIES;
            map.copy_from_slice(&bytes[start..start + NUM_VELOCITIES]);
        }

        Ok(Self {
            program_map: table(bytes, PROGRAM_MAP_AT),
            note_shift: signed_table(bytes, NOTE_SHIFT_AT),
            volume_shift: signed_table(bytes, VOLUME_SHIFT_AT),
            percussion_map: table(bytes, PERCUSSION_MAP_AT),
            percussion_volume_shift: bytes[PERCUSSION_VOLUME_SHIFT_AT] as i8,
            program_velocity_map: table(bytes, PROGRAM_VELOCITY_MAP_AT),
            velocity_maps,
            init_stream: bytes[INIT_STREAM_AT..INIT_STREAM_AT + stream_len].to_vec(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(INIT_STREAM_AT + self.init_stream.len());
        out.extend_from_slice(&self.program_map);
        out.extend(self.note_shift.iter().map(|&v| v as u8));
        out.extend(self.volume_shift.iter().map(|&v| v as u8));
        out.extend_from_slice(&self.percussion_map);
        out.push(self.percussion_volume_shift as u8);
        out.extend_from_slice(&self.program_velocity_map);
        for map in &self.velocity_maps {
            out.extend_from_slice(map);
        }
        out.extend_from_slice(&(self.init_stream.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.init_stream);
        out
    }
}

fn identity_table() -> [u8; 128] {
    std::array::from_fn(|index| index as u8)
}

fn table(bytes: &[u8], at: usize) -> [u8; 128] {
    std::array::from_fn(|index| bytes[at + index])
}

fn signed_table(bytes: &[u8], at: usize) -> [i8; 128] {
    std::array::from_fn(|index| bytes[at + index] as i8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_defaults_map_every_program_to_itself() {
        let patch = GmPatch::identity();
        assert!(patch.program_map.iter().enumerate().all(|(i, &p)| p as usize == i));
        assert!(
            patch.velocity_maps[0]
                .iter()
                .enumerate()
                .all(|(i, &v)| v as usize == i)
        );
        assert!(patch.velocity_maps[1].iter().all(|&v| v == 0));
    }

    #[test]
    fn reads_fields_at_fixed_offsets() {
        let mut patch = GmPatch::identity();
        patch.program_map[3] = UNMAPPED;
        patch.note_shift[3] = -12;
        patch.volume_shift[4] = 20;
        patch.percussion_map[35] = 36;
        patch.percussion_volume_shift = -5;
        patch.program_velocity_map[7] = 2;
        patch.velocity_maps[2][100] = 64;
        patch.init_stream = vec![0xC0, 0x05];

        let bytes = patch.encode();
        assert_eq!(bytes[3], UNMAPPED);
        assert_eq!(bytes[128 + 3], 0xF4);
        assert_eq!(bytes[512], 0xFB);
        assert_eq!(bytes.len(), 1155 + 2);

        let parsed = GmPatch::parse(&bytes).unwrap();
        assert_eq!(parsed, patch);
    }

    #[test]
    fn short_patch_is_rejected() {
        assert!(GmPatch::parse(&[0u8; 600]).is_err());

        let mut bytes = GmPatch::identity().encode();
        bytes.truncate(bytes.len() - 1);
        assert!(GmPatch::parse(&bytes).is_err());
    }
}
