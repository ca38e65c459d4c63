use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use s2_formats::{ResourceKey, ResourceType};
use serde::Serialize;

use super::error::ResourceError;
use super::mac_fork::MacForkSource;
use super::patch::PatchSource;
use super::source::{ResourceSource, SourceId, SourceKind};
use super::volume::{MapSource, VolumeSource};

/// Decompressed resource bytes. Immutable once published to the cache.
#[derive(Debug)]
pub struct Resource {
    pub key: ResourceKey,
    pub origin: SourceKind,
    data: Vec<u8>,
}

impl Resource {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Where a resolved key will be loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceHandle {
    pub key: ResourceKey,
    pub source: SourceId,
    pub kind: SourceKind,
    pub location: u64,
}

type Slot = Arc<OnceCell<Arc<Resource>>>;

/// Owns every registered source and the shared cache of decompressed
/// resources. Safe to share between threads; each key is decompressed by at
/// most one caller at a time and every waiter observes the same buffer.
#[derive(Debug, Default)]
pub struct ResourceManager {
    sources: Vec<Box<dyn ResourceSource>>,
    index: OnceCell<HashMap<ResourceKey, ResourceHandle>>,
    cache: Mutex<HashMap<ResourceKey, Slot>>,
    loads: AtomicUsize,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the standard layout of a game directory: loose patches,
    /// `*.rsrc` resource forks, and `resource.map` with its `resource.NNN`
    /// volumes.
    pub fn from_game_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            bail!("{} is not a directory", dir.display());
        }

        let mut manager = ResourceManager::new();
        let patches = PatchSource::from_dir(dir);
        if !patches.is_empty() {
            manager.add_source(Box::new(patches));
        }

        let mut files: Vec<_> = fs::read_dir(dir)
            .with_context(|| format!("reading game directory {}", dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        let mut fork_number = 0u8;
        for path in &files {
            let is_fork = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("rsrc"))
                .unwrap_or(false);
            if !is_fork {
                continue;
            }
            match MacForkSource::open(path, fork_number) {
                Ok(source) => {
                    manager.add_source(Box::new(source));
                    fork_number = fork_number.wrapping_add(1);
                }
                Err(err) => warn!("failed to open {}: {err:?}", path.display()),
            }
        }

        let map_path = files.iter().find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.eq_ignore_ascii_case("resource.map"))
                .unwrap_or(false)
        });
        if let Some(map_path) = map_path {
            let map = manager.add_source(Box::new(MapSource::new(map_path)));
            for path in &files {
                let Some(volume_number) = volume_number_of(path) else {
                    continue;
                };
                match VolumeSource::open(path, map, volume_number) {
                    Ok(volume) => {
                        manager.add_source(Box::new(volume));
                    }
                    Err(err) => warn!("failed to open {}: {err:?}", path.display()),
                }
            }
        }

        if manager.sources.is_empty() {
            bail!("no resource sources found in {}", dir.display());
        }
        Ok(manager)
    }

    /// Adds a source. Registering after the first lookup triggers a rescan.
    pub fn add_source(&mut self, source: Box<dyn ResourceSource>) -> SourceId {
        let id = SourceId(self.sources.len());
        debug!("registered {:?} source {}", source.kind(), source.name());
        self.sources.push(source);
        self.index.take();
        id
    }

    pub fn source(&self, id: SourceId) -> Option<&dyn ResourceSource> {
        self.sources.get(id.0).map(|source| source.as_ref())
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    fn index(&self) -> &HashMap<ResourceKey, ResourceHandle> {
        self.index.get_or_init(|| self.scan_sources())
    }

    fn scan_sources(&self) -> HashMap<ResourceKey, ResourceHandle> {
        let mut order: Vec<SourceId> = (0..self.sources.len()).map(SourceId).collect();
        order.sort_by_key(|id| self.sources[id.0].kind().priority());

        let mut index: HashMap<ResourceKey, ResourceHandle> = HashMap::new();
        for id in order {
            let source = &self.sources[id.0];
            let entries = match source.scan() {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("skipping source {}: {err:?}", source.name());
                    continue;
                }
            };

            let mut missing_volumes: BTreeMap<u8, usize> = BTreeMap::new();
            for entry in entries {
                if index.contains_key(&entry.key) {
                    continue;
                }
                let owner = match entry.volume {
                    None => id,
                    Some(volume) => match self.volume_for_map(id, volume) {
                        Some(owner) => owner,
                        None => {
                            *missing_volumes.entry(volume).or_default() += 1;
                            continue;
                        }
                    },
                };
                index.insert(
                    entry.key,
                    ResourceHandle {
                        key: entry.key,
                        source: owner,
                        kind: self.sources[owner.0].kind(),
                        location: entry.location,
                    },
                );
            }

            for (volume, count) in missing_volumes {
                warn!(
                    "map {} lists {count} resources in volume {volume}, which is not present",
                    source.name()
                );
            }
        }

        debug!(
            "indexed {} resources from {} sources",
            index.len(),
            self.sources.len()
        );
        index
    }

    fn volume_for_map(&self, map: SourceId, volume: u8) -> Option<SourceId> {
        self.sources
            .iter()
            .position(|source| source.is_volume_for_map(map, volume))
            .map(SourceId)
    }

    /// Finds which source serves `key`. Never touches the cache.
    pub fn resolve(&self, key: ResourceKey) -> Result<ResourceHandle, ResourceError> {
        self.index()
            .get(&key)
            .copied()
            .ok_or(ResourceError::NotFound(key))
    }

    pub fn contains(&self, key: ResourceKey) -> bool {
        self.index().contains_key(&key)
    }

    /// Every known key, sorted.
    pub fn keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = self.index().keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn list(&self, kind: ResourceType) -> Vec<u16> {
        let mut numbers: Vec<u16> = self
            .index()
            .keys()
            .filter(|key| key.kind == kind)
            .map(|key| key.number)
            .collect();
        numbers.sort_unstable();
        numbers
    }

    /// Returns the cached resource, loading it through its source on first
    /// use. Failed loads leave no cache entry behind.
    pub fn load_resource(&self, key: ResourceKey) -> Result<Arc<Resource>, ResourceError> {
        let handle = self.resolve(key)?;
        let slot: Slot = self.cache.lock().entry(key).or_default().clone();

        let result = slot.get_or_try_init(|| {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let source = &self.sources[handle.source.0];
            let data = source.load(key, handle.location)?;
            debug!("loaded {key} ({} bytes) from {}", data.len(), source.name());
            Ok::<_, ResourceError>(Arc::new(Resource {
                key,
                origin: handle.kind,
                data,
            }))
        });

        match result {
            Ok(resource) => Ok(resource.clone()),
            Err(err) => {
                let mut cache = self.cache.lock();
                let stale = cache
                    .get(&key)
                    .map(|existing| Arc::ptr_eq(existing, &slot) && existing.get().is_none())
                    .unwrap_or(false);
                if stale {
                    cache.remove(&key);
                }
                Err(err)
            }
        }
    }

    /// Lookup for callers with a fallback: absent and corrupt resources both
    /// yield `None`.
    pub fn find_resource(&self, key: ResourceKey) -> Option<Arc<Resource>> {
        match self.load_resource(key) {
            Ok(resource) => Some(resource),
            Err(ResourceError::NotFound(_)) => None,
            Err(err) => {
                warn!("{err}");
                None
            }
        }
    }

    pub fn is_cached(&self, key: ResourceKey) -> bool {
        self.cache
            .lock()
            .get(&key)
            .map(|slot| slot.get().is_some())
            .unwrap_or(false)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Drops a cached buffer. Outstanding `Arc`s stay valid.
    pub fn evict(&self, key: ResourceKey) -> bool {
        self.cache.lock().remove(&key).is_some()
    }

    pub fn purge(&self) {
        self.cache.lock().clear();
    }

    /// Number of source loads performed (cache misses that reached a source).
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

fn volume_number_of(path: &Path) -> Option<u8> {
    let name = path.file_name()?.to_str()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if !stem.eq_ignore_ascii_case("resource") || ext.len() != 3 {
        return None;
    }
    ext.parse::<u8>().ok()
}
