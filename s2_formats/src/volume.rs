use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, ensure};
use memmap2::{Mmap, MmapOptions};

use crate::decompress::CompressionMethod;
use crate::resource_type::ResourceType;

/// Size of the SCI32 per-resource header inside a volume file.
pub const VOLUME_HEADER_LEN: usize = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeHeader {
    pub kind: ResourceType,
    pub number: u16,
    pub packed_size: u32,
    pub unpacked_size: u32,
    pub method: u16,
}

impl VolumeHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        ensure!(
            bytes.len() >= VOLUME_HEADER_LEN,
            "volume header truncated ({} bytes)",
            bytes.len()
        );
        let kind = ResourceType::from_byte(bytes[0])
            .ok_or_else(|| anyhow!("unknown resource type byte {:#04x}", bytes[0]))?;
        Ok(Self {
            kind,
            number: u16::from_le_bytes([bytes[1], bytes[2]]),
            packed_size: u32::from_le_bytes(bytes[3..7].try_into().unwrap()),
            unpacked_size: u32::from_le_bytes(bytes[7..11].try_into().unwrap()),
            method: u16::from_le_bytes([bytes[11], bytes[12]]),
        })
    }

    pub fn compression(&self) -> Result<CompressionMethod> {
        CompressionMethod::from_tag(self.method)
    }

    pub fn encode(&self) -> [u8; VOLUME_HEADER_LEN] {
        let mut out = [0u8; VOLUME_HEADER_LEN];
        out[0] = self.kind.as_byte();
        out[1..3].copy_from_slice(&self.number.to_le_bytes());
        out[3..7].copy_from_slice(&self.packed_size.to_le_bytes());
        out[7..11].copy_from_slice(&self.unpacked_size.to_le_bytes());
        out[11..13].copy_from_slice(&self.method.to_le_bytes());
        out
    }
}

/// Reads the header at `offset` and returns it with its packed payload.
pub fn read_volume_entry(volume: &[u8], offset: usize) -> Result<(VolumeHeader, &[u8])> {
    ensure!(
        offset < volume.len(),
        "entry offset {offset} beyond volume of {} bytes",
        volume.len()
    );
    let header = VolumeHeader::parse(&volume[offset..])
        .with_context(|| format!("reading volume header at {offset:#x}"))?;
    let start = offset + VOLUME_HEADER_LEN;
    let end = start
        .checked_add(header.packed_size as usize)
        .ok_or_else(|| anyhow!("packed size overflow at {offset:#x}"))?;
    ensure!(
        end <= volume.len(),
        "{}.{} payload extends beyond volume",
        header.kind,
        header.number
    );
    Ok((header, &volume[start..end]))
}

/// Appends one header + payload record, returning the record's offset.
pub fn append_volume_entry(
    volume: &mut Vec<u8>,
    kind: ResourceType,
    number: u16,
    method: CompressionMethod,
    payload: &[u8],
    unpacked_size: u32,
) -> u32 {
    let offset = volume.len() as u32;
    let header = VolumeHeader {
        kind,
        number,
        packed_size: payload.len() as u32,
        unpacked_size,
        method: method.tag(),
    };
    volume.extend_from_slice(&header.encode());
    volume.extend_from_slice(payload);
    offset
}

/// Memory-mapped `resource.NNN` file.
#[derive(Debug)]
pub struct VolumeFile {
    path: PathBuf,
    mmap: Mmap,
}

impl VolumeFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let file = File::open(&path_buf)
            .with_context(|| format!("opening volume at {}", path_buf.display()))?;
        let mmap = unsafe { MmapOptions::new().map(&file) }
            .with_context(|| format!("memory-mapping volume {}", path_buf.display()))?;
        Ok(Self {
            path: path_buf,
            mmap,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }
}
