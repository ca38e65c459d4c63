use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::room::INTRO_ROOM;
use crate::sound::genmidi::DEFAULT_MASTER_VOLUME;
use crate::sound::SciVersion;

/// Settings read from an optional JSON file. Missing fields keep their
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub version: SciVersion,
    pub master_volume: u8,
    pub captions: bool,
    pub seed: u64,
    pub start_room: u16,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            version: SciVersion::Sci21,
            master_volume: DEFAULT_MASTER_VOLUME,
            captions: false,
            seed: 0,
            start_room: INTRO_ROOM,
        }
    }
}

impl GameConfig {
    /// Reads the file when given and present, otherwise returns defaults.
    pub fn from_json_file(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config json: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_keep_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("s2.json");
        fs::write(&path, r#"{ "version": "sci2", "captions": true }"#)?;

        let config = GameConfig::from_json_file(Some(&path))?;
        assert_eq!(config.version, SciVersion::Sci2);
        assert!(config.captions);
        assert_eq!(config.master_volume, DEFAULT_MASTER_VOLUME);
        assert_eq!(config.start_room, INTRO_ROOM);
        Ok(())
    }

    #[test]
    fn missing_file_means_defaults() -> Result<()> {
        let config = GameConfig::from_json_file(Some(Path::new("/nonexistent/s2.json")))?;
        assert_eq!(config, GameConfig::default());
        assert_eq!(GameConfig::from_json_file(None)?, GameConfig::default());
        Ok(())
    }

    #[test]
    fn malformed_files_are_errors() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("s2.json");
        fs::write(&path, "{ nope")?;
        assert!(GameConfig::from_json_file(Some(&path)).is_err());
        Ok(())
    }
}
