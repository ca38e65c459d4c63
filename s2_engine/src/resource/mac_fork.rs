use std::path::Path;

use anyhow::Result;
use log::debug;
use s2_formats::{CompressionMethod, MacResourceFork, ResourceKey, ResourceType, decompress};

use super::error::ResourceError;
use super::source::{ResourceSource, ScanEntry, SourceKind};

/// Reads SCI1.1+ resources from a Macintosh resource fork.
#[derive(Debug)]
pub struct MacForkSource {
    name: String,
    volume_number: u8,
    fork: MacResourceFork,
}

impl MacForkSource {
    pub fn open<P: AsRef<Path>>(path: P, volume_number: u8) -> Result<Self> {
        let fork = MacResourceFork::open(path)?;
        Ok(Self {
            name: fork.path().display().to_string(),
            volume_number,
            fork,
        })
    }
}

/// Types stored with a trailing big-endian uncompressed size; zero means the
/// record is stored as-is.
fn is_compressible(kind: ResourceType) -> bool {
    matches!(
        kind,
        ResourceType::View
            | ResourceType::Pic
            | ResourceType::Script
            | ResourceType::Heap
            | ResourceType::Font
            | ResourceType::Palette
            | ResourceType::Message
    )
}

impl ResourceSource for MacForkSource {
    fn kind(&self) -> SourceKind {
        SourceKind::MacResourceFork
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn volume_number(&self) -> u8 {
        self.volume_number
    }

    fn scan(&self) -> Result<Vec<ScanEntry>> {
        Ok(self
            .fork
            .entries()
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let Some(kind) = entry.kind() else {
                    debug!(
                        "{}: skipping untyped tag {:?} #{}",
                        self.name,
                        String::from_utf8_lossy(&entry.tag),
                        entry.id
                    );
                    return None;
                };
                Some(ScanEntry {
                    key: ResourceKey::new(kind, entry.id as u16),
                    location: index as u64,
                    volume: None,
                })
            })
            .collect())
    }

    fn load(&self, key: ResourceKey, location: u64) -> Result<Vec<u8>, ResourceError> {
        let entry = self
            .fork
            .entries()
            .get(location as usize)
            .ok_or(ResourceError::NotFound(key))?;
        let data = self.fork.read_entry_bytes(entry);

        if !is_compressible(key.kind) {
            return Ok(data.to_vec());
        }
        if data.len() < 4 {
            return Err(ResourceError::corrupt(key, "missing uncompressed size trailer"));
        }

        let (payload, trailer) = data.split_at(data.len() - 4);
        let unpacked =
            u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]) as usize;
        if unpacked == 0 {
            return Ok(payload.to_vec());
        }
        decompress(CompressionMethod::Stacpack, payload, unpacked)
            .map_err(|err| ResourceError::corrupt(key, format!("{err:#}")))
    }
}
