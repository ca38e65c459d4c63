use std::collections::BTreeMap;

use anyhow::{Result, anyhow, bail, ensure};

use crate::resource_type::{ResourceKey, ResourceType};

const DIRECTORY_ROW_LEN: usize = 3;
const MAP_ENTRY_LEN: usize = 6;
const DIRECTORY_END: u8 = 0xFF;
const VOLUME_SHIFT: u32 = 28;
const OFFSET_MASK: u32 = 0x0FFF_FFFF;

/// One row of a `resource.map`: where a key lives inside which volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEntry {
    pub key: ResourceKey,
    pub volume: u8,
    pub offset: u32,
}

/// Parses a SCI1.1/SCI32 map: a `(type, offset)` directory closed by an
/// `0xFF` row, then fixed six-byte `(number, packed offset)` rows per type.
pub fn parse_resource_map(bytes: &[u8]) -> Result<Vec<MapEntry>> {
    let mut directory: Vec<(u8, usize)> = Vec::new();
    let mut cursor = 0usize;
    loop {
        ensure!(
            cursor + DIRECTORY_ROW_LEN <= bytes.len(),
            "map directory truncated at {cursor:#x}"
        );
        let type_byte = bytes[cursor];
        let offset = u16::from_le_bytes([bytes[cursor + 1], bytes[cursor + 2]]) as usize;
        directory.push((type_byte, offset));
        cursor += DIRECTORY_ROW_LEN;
        if type_byte == DIRECTORY_END {
            break;
        }
    }

    let mut entries = Vec::new();
    for window in directory.windows(2) {
        let (type_byte, start) = window[0];
        let (_, end) = window[1];
        let kind = ResourceType::from_byte(type_byte)
            .ok_or_else(|| anyhow!("map lists unknown type byte {type_byte:#04x}"))?;
        if end < start || end > bytes.len() {
            bail!("map table for {kind} spans invalid range {start:#x}..{end:#x}");
        }
        ensure!(
            (end - start) % MAP_ENTRY_LEN == 0,
            "map table for {kind} is not a whole number of entries"
        );

        for row in bytes[start..end].chunks_exact(MAP_ENTRY_LEN) {
            let number = u16::from_le_bytes([row[0], row[1]]);
            let packed = u32::from_le_bytes(row[2..6].try_into().unwrap());
            entries.push(MapEntry {
                key: ResourceKey::new(kind, number),
                volume: (packed >> VOLUME_SHIFT) as u8,
                offset: packed & OFFSET_MASK,
            });
        }
    }

    Ok(entries)
}

/// Builds map bytes for a set of entries; used by tooling that writes
/// resource bundles.
pub fn encode_resource_map(entries: &[MapEntry]) -> Vec<u8> {
    let mut by_type: BTreeMap<ResourceType, Vec<&MapEntry>> = BTreeMap::new();
    for entry in entries {
        by_type.entry(entry.key.kind).or_default().push(entry);
    }

    let directory_len = (by_type.len() + 1) * DIRECTORY_ROW_LEN;
    let mut directory = Vec::with_capacity(directory_len);
    let mut tables = Vec::new();
    for (kind, rows) in &by_type {
        directory.push(kind.as_byte() | 0x80);
        directory.extend_from_slice(&((directory_len + tables.len()) as u16).to_le_bytes());
        for entry in rows {
            tables.extend_from_slice(&entry.key.number.to_le_bytes());
            let packed = ((entry.volume as u32) << VOLUME_SHIFT) | (entry.offset & OFFSET_MASK);
            tables.extend_from_slice(&packed.to_le_bytes());
        }
    }
    directory.push(DIRECTORY_END);
    directory.extend_from_slice(&((directory_len + tables.len()) as u16).to_le_bytes());
    directory.extend_from_slice(&tables);
    directory
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_encoded_map() {
        let entries = vec![
            MapEntry {
                key: ResourceKey::new(ResourceType::Sound, 5),
                volume: 0,
                offset: 0,
            },
            MapEntry {
                key: ResourceKey::new(ResourceType::View, 100),
                volume: 1,
                offset: 0x40,
            },
            MapEntry {
                key: ResourceKey::new(ResourceType::Sound, 6),
                volume: 0,
                offset: 0x20,
            },
        ];
        let bytes = encode_resource_map(&entries);
        let mut parsed = parse_resource_map(&bytes).unwrap();
        parsed.sort_by_key(|entry| entry.key);
        let mut expected = entries.clone();
        expected.sort_by_key(|entry| entry.key);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn rejects_unterminated_directory() {
        let bytes = [0x84, 0x06, 0x00];
        assert!(parse_resource_map(&bytes).is_err());
    }

    #[test]
    fn rejects_ragged_tables() {
        // one type whose table is five bytes long
        let bytes = [0x84, 0x06, 0x00, 0xFF, 0x0B, 0x00, 1, 0, 0, 0, 0];
        assert!(parse_resource_map(&bytes).is_err());
    }
}
