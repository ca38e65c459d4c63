use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use s2_formats::{PatchFile, ResourceKey, scan_patch_dir};

use super::error::ResourceError;
use super::source::{ResourceSource, ScanEntry, SourceKind};

/// Loose patch files in the game directory. They override every other
/// source.
#[derive(Debug)]
pub struct PatchSource {
    name: String,
    files: Vec<(ResourceKey, PathBuf)>,
}

impl PatchSource {
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            name: dir.display().to_string(),
            files: scan_patch_dir(dir),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ResourceSource for PatchSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Patch
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn scan(&self) -> Result<Vec<ScanEntry>> {
        Ok(self
            .files
            .iter()
            .enumerate()
            .map(|(index, (key, _))| ScanEntry {
                key: *key,
                location: index as u64,
                volume: None,
            })
            .collect())
    }

    fn load(&self, key: ResourceKey, location: u64) -> Result<Vec<u8>, ResourceError> {
        let (_, path) = self
            .files
            .get(location as usize)
            .ok_or(ResourceError::NotFound(key))?;
        let bytes = fs::read(path).map_err(|source| ResourceError::Io { key, source })?;
        let patch = PatchFile::parse(&bytes).map_err(|err| ResourceError::corrupt(key, err))?;
        if patch.kind != key.kind {
            return Err(ResourceError::corrupt(
                key,
                format!("{} declares type {}", path.display(), patch.kind),
            ));
        }
        Ok(patch.payload(&bytes).to_vec())
    }
}
