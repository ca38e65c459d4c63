//! Resource location, decompression and caching.

mod error;
mod mac_fork;
mod manager;
mod patch;
mod source;
mod volume;

pub use error::ResourceError;
pub use mac_fork::MacForkSource;
pub use manager::{Resource, ResourceHandle, ResourceManager};
pub use patch::PatchSource;
pub use source::{ResourceSource, ScanEntry, SourceId, SourceKind};
pub use volume::{MapSource, VolumeSource};

#[cfg(test)]
pub(crate) mod tests_support {
    use anyhow::Result;
    use s2_formats::{ResourceKey, ResourceType};

    use super::{ResourceError, ResourceManager, ResourceSource, ScanEntry, SourceKind};

    /// Patch-priority source serving bytes held in memory.
    #[derive(Debug, Default)]
    pub struct MemorySource {
        entries: Vec<(ResourceKey, Vec<u8>)>,
    }

    impl MemorySource {
        pub fn with(mut self, key: ResourceKey, data: &[u8]) -> Self {
            self.entries.push((key, data.to_vec()));
            self
        }
    }

    impl ResourceSource for MemorySource {
        fn kind(&self) -> SourceKind {
            SourceKind::Patch
        }

        fn name(&self) -> &str {
            "memory"
        }

        fn scan(&self) -> Result<Vec<ScanEntry>> {
            Ok(self
                .entries
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
            self.entries
                .get(location as usize)
                .map(|(_, data)| data.clone())
                .ok_or(ResourceError::NotFound(key))
        }
    }

    pub fn manager_with(source: MemorySource) -> ResourceManager {
        let mut manager = ResourceManager::new();
        manager.add_source(Box::new(source));
        manager
    }

    pub fn manager_with_patch(number: u16, data: &[u8]) -> ResourceManager {
        manager_with(
            MemorySource::default().with(ResourceKey::new(ResourceType::Patch, number), data),
        )
    }
}
