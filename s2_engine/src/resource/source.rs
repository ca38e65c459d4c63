use std::fmt;

use anyhow::Result;
use s2_formats::ResourceKey;
use serde::Serialize;

use super::error::ResourceError;

/// Index of a source inside its manager. Stable for the manager's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Patch,
    MacResourceFork,
    Map,
    Volume,
}

impl SourceKind {
    /// Lower wins when two sources claim the same key.
    pub fn priority(self) -> u8 {
        match self {
            SourceKind::Patch => 0,
            SourceKind::MacResourceFork => 1,
            SourceKind::Map | SourceKind::Volume => 2,
        }
    }
}

/// One key reported by a scan. `volume` is set by map sources and names the
/// data-only volume that holds the bytes; `None` means the scanning source
/// serves the load itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanEntry {
    pub key: ResourceKey,
    pub location: u64,
    pub volume: Option<u8>,
}

pub trait ResourceSource: fmt::Debug + Send + Sync {
    fn kind(&self) -> SourceKind;

    fn name(&self) -> &str;

    fn volume_number(&self) -> u8 {
        0
    }

    /// Lists the keys this source can provide.
    fn scan(&self) -> Result<Vec<ScanEntry>>;

    /// Reads and decompresses the resource stored at `location`.
    fn load(&self, key: ResourceKey, location: u64) -> Result<Vec<u8>, ResourceError>;

    /// Data-only sources answer whether they hold `volume` for `map`.
    fn is_volume_for_map(&self, _map: SourceId, _volume: u8) -> bool {
        false
    }
}
