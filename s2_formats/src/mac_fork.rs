use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, ensure};
use byteorder::{BigEndian, ReadBytesExt};
use memmap2::{Mmap, MmapOptions};

use crate::resource_type::ResourceType;

const FORK_HEADER_LEN: usize = 16;
const MAP_HEADER_LEN: usize = 28;
const REF_ENTRY_LEN: usize = 12;

/// SCI resource tags found in Macintosh resource forks.
const TAG_TYPES: &[(&[u8; 4], ResourceType)] = &[
    (b"V56 ", ResourceType::View),
    (b"P56 ", ResourceType::Pic),
    (b"SCR ", ResourceType::Script),
    (b"TEX ", ResourceType::Text),
    (b"SND ", ResourceType::Sound),
    (b"VOC ", ResourceType::Vocab),
    (b"FON ", ResourceType::Font),
    (b"CURS", ResourceType::Cursor),
    (b"crsr", ResourceType::Cursor),
    (b"Pat ", ResourceType::Patch),
    (b"PAL ", ResourceType::Palette),
    (b"MSG ", ResourceType::Message),
    (b"HEP ", ResourceType::Heap),
    (b"snd ", ResourceType::Audio),
    (b"CSND", ResourceType::Audio),
];

pub fn tag_resource_type(tag: [u8; 4]) -> Option<ResourceType> {
    TAG_TYPES
        .iter()
        .find(|(candidate, _)| **candidate == tag)
        .map(|(_, kind)| *kind)
}

pub fn resource_type_tag(kind: ResourceType) -> Option<[u8; 4]> {
    TAG_TYPES
        .iter()
        .find(|(_, candidate)| *candidate == kind)
        .map(|(tag, _)| **tag)
}

#[derive(Debug, Clone)]
pub struct ForkEntry {
    pub tag: [u8; 4],
    pub id: i16,
    pub data: Range<usize>,
}

impl ForkEntry {
    pub fn kind(&self) -> Option<ResourceType> {
        tag_resource_type(self.tag)
    }
}

#[derive(Debug)]
pub struct MacResourceFork {
    path: PathBuf,
    mmap: Mmap,
    entries: Vec<ForkEntry>,
}

impl MacResourceFork {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let file = File::open(&path_buf)
            .with_context(|| format!("opening resource fork at {}", path_buf.display()))?;
        let mmap = unsafe { MmapOptions::new().map(&file) }
            .with_context(|| format!("memory-mapping resource fork {}", path_buf.display()))?;
        let entries = parse_fork_entries(&mmap)
            .with_context(|| format!("parsing resource fork {}", path_buf.display()))?;
        Ok(Self {
            path: path_buf,
            mmap,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[ForkEntry] {
        &self.entries
    }

    pub fn find(&self, kind: ResourceType, number: u16) -> Option<&ForkEntry> {
        self.entries
            .iter()
            .find(|entry| entry.kind() == Some(kind) && entry.id as u16 == number)
    }

    pub fn read_entry_bytes(&self, entry: &ForkEntry) -> &[u8] {
        &self.mmap[entry.data.clone()]
    }
}

pub fn parse_fork_entries(bytes: &[u8]) -> Result<Vec<ForkEntry>> {
    ensure!(bytes.len() >= FORK_HEADER_LEN, "resource fork header truncated");
    let mut header = Cursor::new(bytes);
    let data_offset = header.read_u32::<BigEndian>()? as usize;
    let map_offset = header.read_u32::<BigEndian>()? as usize;
    ensure!(
        map_offset + MAP_HEADER_LEN <= bytes.len(),
        "resource map offset {map_offset:#x} beyond fork"
    );

    let map = &bytes[map_offset..];
    let mut cursor = Cursor::new(map);
    cursor.seek(SeekFrom::Start(24))?;
    let type_list_offset = cursor.read_u16::<BigEndian>()? as usize;
    let type_list = map
        .get(type_list_offset..)
        .ok_or_else(|| anyhow!("type list offset {type_list_offset:#x} beyond map"))?;

    let mut types = Cursor::new(type_list);
    let type_count = types.read_u16::<BigEndian>()?.wrapping_add(1) as usize;
    let mut entries = Vec::new();
    for _ in 0..type_count {
        let mut tag = [0u8; 4];
        types.read_exact(&mut tag).context("reading type list row")?;
        let ref_count = types.read_u16::<BigEndian>()?.wrapping_add(1) as usize;
        let ref_offset = types.read_u16::<BigEndian>()? as usize;

        for index in 0..ref_count {
            let start = ref_offset + index * REF_ENTRY_LEN;
            let row = type_list
                .get(start..start + REF_ENTRY_LEN)
                .ok_or_else(|| anyhow!("reference list for {:?} truncated", tag))?;
            let id = i16::from_be_bytes([row[0], row[1]]);
            let relative = u32::from_be_bytes([0, row[5], row[6], row[7]]) as usize;
            let length_at = data_offset + relative;
            ensure!(
                length_at + 4 <= bytes.len(),
                "resource {id} data offset beyond fork"
            );
            let length = u32::from_be_bytes(bytes[length_at..length_at + 4].try_into().unwrap())
                as usize;
            let data_start = length_at + 4;
            ensure!(
                data_start + length <= bytes.len(),
                "resource {id} data extends beyond fork"
            );
            entries.push(ForkEntry {
                tag,
                id,
                data: data_start..data_start + length,
            });
        }
    }

    Ok(entries)
}

/// Lays out a minimal resource fork holding the given resources.
pub fn build_resource_fork(resources: &[([u8; 4], i16, &[u8])]) -> Vec<u8> {
    let mut grouped: BTreeMap<[u8; 4], Vec<(i16, &[u8])>> = BTreeMap::new();
    for (tag, id, data) in resources {
        grouped.entry(*tag).or_default().push((*id, data));
    }

    let mut data_block = Vec::new();
    let mut type_rows = Vec::new();
    let mut ref_rows = Vec::new();
    let type_list_len = 2 + grouped.len() * 8;
    for (tag, items) in &grouped {
        type_rows.extend_from_slice(tag);
        type_rows.extend_from_slice(&((items.len() as u16).wrapping_sub(1)).to_be_bytes());
        type_rows.extend_from_slice(&((type_list_len + ref_rows.len()) as u16).to_be_bytes());
        for (id, data) in items {
            let offset = data_block.len() as u32;
            data_block.extend_from_slice(&(data.len() as u32).to_be_bytes());
            data_block.extend_from_slice(data);
            ref_rows.extend_from_slice(&id.to_be_bytes());
            ref_rows.extend_from_slice(&0xFFFFu16.to_be_bytes());
            ref_rows.push(0);
            ref_rows.extend_from_slice(&offset.to_be_bytes()[1..]);
            ref_rows.extend_from_slice(&0u32.to_be_bytes());
        }
    }

    let data_offset = FORK_HEADER_LEN as u32;
    let map_offset = data_offset + data_block.len() as u32;
    let mut map = vec![0u8; MAP_HEADER_LEN];
    map[24..26].copy_from_slice(&(MAP_HEADER_LEN as u16).to_be_bytes());
    map.extend_from_slice(&((grouped.len() as u16).wrapping_sub(1)).to_be_bytes());
    map.extend_from_slice(&type_rows);
    map.extend_from_slice(&ref_rows);
    let name_list = map.len() as u16;
    map[26..28].copy_from_slice(&name_list.to_be_bytes());

    let mut out = Vec::new();
    out.extend_from_slice(&data_offset.to_be_bytes());
    out.extend_from_slice(&map_offset.to_be_bytes());
    out.extend_from_slice(&(data_block.len() as u32).to_be_bytes());
    out.extend_from_slice(&(map.len() as u32).to_be_bytes());
    out.extend_from_slice(&data_block);
    out.extend_from_slice(&map);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_resources_by_tag() {
        let fork = build_resource_fork(&[
            (*b"SND ", 5, b"sound"),
            (*b"V56 ", 100, b"view!"),
            (*b"SND ", 6, b"more"),
        ]);
        let entries = parse_fork_entries(&fork).unwrap();
        assert_eq!(entries.len(), 3);

        let sound = entries
            .iter()
            .find(|entry| entry.kind() == Some(ResourceType::Sound) && entry.id == 6)
            .unwrap();
        assert_eq!(&fork[sound.data.clone()], b"more");

        let view = entries
            .iter()
            .find(|entry| entry.kind() == Some(ResourceType::View))
            .unwrap();
        assert_eq!(view.id, 100);
        assert_eq!(&fork[view.data.clone()], b"view!");
    }

    #[test]
    fn unknown_tags_have_no_type() {
        assert_eq!(tag_resource_type(*b"ICN#"), None);
        assert_eq!(tag_resource_type(*b"CSND"), Some(ResourceType::Audio));
        assert_eq!(resource_type_tag(ResourceType::Heap), Some(*b"HEP "));
    }

    #[test]
    fn truncated_fork_is_rejected() {
        let mut fork = build_resource_fork(&[(*b"SND ", 5, b"sound")]);
        fork.truncate(20);
        assert!(parse_fork_entries(&fork).is_err());
    }
}
