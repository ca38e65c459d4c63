use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use s2_formats::{ResourceKey, VolumeFile, decompress, parse_resource_map, read_volume_entry};

use super::error::ResourceError;
use super::source::{ResourceSource, ScanEntry, SourceId, SourceKind};

/// `resource.map`: an index only. Its entries are served by the volumes
/// paired with it.
#[derive(Debug)]
pub struct MapSource {
    name: String,
    path: PathBuf,
}

impl MapSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: path.display().to_string(),
            path,
        }
    }
}

impl ResourceSource for MapSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Map
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn scan(&self) -> Result<Vec<ScanEntry>> {
        let bytes = fs::read(&self.path)
            .with_context(|| format!("reading resource map {}", self.path.display()))?;
        let entries = parse_resource_map(&bytes)
            .with_context(|| format!("parsing resource map {}", self.path.display()))?;
        Ok(entries
            .into_iter()
            .map(|entry| ScanEntry {
                key: entry.key,
                location: entry.offset as u64,
                volume: Some(entry.volume),
            })
            .collect())
    }

    fn load(&self, key: ResourceKey, _location: u64) -> Result<Vec<u8>, ResourceError> {
        Err(ResourceError::corrupt(
            key,
            format!("map {} holds no resource data", self.name),
        ))
    }
}

/// `resource.NNN`: raw records addressed by offsets from its map.
#[derive(Debug)]
pub struct VolumeSource {
    name: String,
    map: SourceId,
    volume_number: u8,
    file: VolumeFile,
}

impl VolumeSource {
    pub fn open<P: AsRef<Path>>(path: P, map: SourceId, volume_number: u8) -> Result<Self> {
        let file = VolumeFile::open(path)?;
        Ok(Self {
            name: file.path().display().to_string(),
            map,
            volume_number,
            file,
        })
    }
}

impl ResourceSource for VolumeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Volume
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn volume_number(&self) -> u8 {
        self.volume_number
    }

    fn scan(&self) -> Result<Vec<ScanEntry>> {
        Ok(Vec::new())
    }

    fn load(&self, key: ResourceKey, location: u64) -> Result<Vec<u8>, ResourceError> {
        let (header, packed) = read_volume_entry(self.file.bytes(), location as usize)
            .map_err(|err| ResourceError::corrupt(key, format!("{err:#}")))?;

        if header.kind != key.kind || header.number != key.number {
            return Err(ResourceError::corrupt(
                key,
                format!(
                    "volume header at {location:#x} holds {}.{}",
                    header.kind, header.number
                ),
            ));
        }

        let method = header
            .compression()
            .map_err(|err| ResourceError::corrupt(key, err))?;
        decompress(method, packed, header.unpacked_size as usize)
            .map_err(|err| ResourceError::corrupt(key, format!("{err:#}")))
    }

    fn is_volume_for_map(&self, map: SourceId, volume: u8) -> bool {
        self.map == map && self.volume_number == volume
    }
}

#[cfg(test)]
mod tests {
    use s2_formats::volume::append_volume_entry;
    use s2_formats::{CompressionMethod, ResourceType};

    use super::*;

    fn volume_with(build: impl FnOnce(&mut Vec<u8>)) -> Result<(tempfile::TempDir, VolumeSource)> {
        let dir = tempfile::tempdir()?;
        let mut bytes = Vec::new();
        build(&mut bytes);
        let path = dir.path().join("resource.000");
        fs::write(&path, bytes)?;
        let volume = VolumeSource::open(&path, SourceId(0), 0)?;
        Ok((dir, volume))
    }

    #[test]
    fn header_must_echo_the_map_entry() -> Result<()> {
        let (_dir, volume) = volume_with(|bytes| {
            append_volume_entry(bytes, ResourceType::Sound, 6, CompressionMethod::None, b"abc", 3);
        })?;

        assert_eq!(volume.load(ResourceKey::new(ResourceType::Sound, 6), 0)?, b"abc");
        let err = volume
            .load(ResourceKey::new(ResourceType::Sound, 5), 0)
            .unwrap_err();
        assert!(matches!(err, ResourceError::Corrupt { .. }));
        Ok(())
    }

    #[test]
    fn offsets_past_the_end_are_corrupt() -> Result<()> {
        let (_dir, volume) = volume_with(|bytes| {
            append_volume_entry(bytes, ResourceType::View, 1, CompressionMethod::None, b"x", 1);
        })?;
        let err = volume
            .load(ResourceKey::new(ResourceType::View, 1), 4096)
            .unwrap_err();
        assert!(err.is_absent());
        Ok(())
    }

    #[test]
    fn pairing_needs_both_map_and_volume_number() -> Result<()> {
        let (_dir, volume) = volume_with(|bytes| {
            append_volume_entry(bytes, ResourceType::Text, 0, CompressionMethod::None, b"t", 1);
        })?;
        assert!(volume.is_volume_for_map(SourceId(0), 0));
        assert!(!volume.is_volume_for_map(SourceId(1), 0));
        assert!(!volume.is_volume_for_map(SourceId(0), 1));
        Ok(())
    }
}
