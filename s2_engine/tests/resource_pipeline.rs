use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use s2_engine::resource::{ResourceError, ResourceManager, SourceKind};
use s2_formats::patch_file::encode_patch_file;
use s2_formats::resource_map::encode_resource_map;
use s2_formats::volume::append_volume_entry;
use s2_formats::{CompressionMethod, MapEntry, ResourceKey, ResourceType};
use tempfile::tempdir;

const SOUND: ResourceKey = ResourceKey::new(ResourceType::Sound, 5);
const VIEW: ResourceKey = ResourceKey::new(ResourceType::View, 7);

fn write_game_dir(dir: &Path) -> Result<()> {
    let mut volume = Vec::new();
    let sound_offset = append_volume_entry(
        &mut volume,
        SOUND.kind,
        SOUND.number,
        CompressionMethod::None,
        b"sound from the volume",
        21,
    );
    let view_offset = append_volume_entry(
        &mut volume,
        VIEW.kind,
        VIEW.number,
        CompressionMethod::None,
        &[0xAA; 64],
        64,
    );
    let map = encode_resource_map(&[
        MapEntry {
            key: SOUND,
            volume: 0,
            offset: sound_offset,
        },
        MapEntry {
            key: VIEW,
            volume: 0,
            offset: view_offset,
        },
    ]);
    fs::write(dir.join("resource.map"), map)?;
    fs::write(dir.join("resource.000"), volume)?;
    Ok(())
}

#[test]
fn volume_resources_load_byte_exact() -> Result<()> {
    let dir = tempdir()?;
    write_game_dir(dir.path())?;
    let resources = ResourceManager::from_game_dir(dir.path())?;

    let mut keys = resources.keys();
    keys.sort();
    assert_eq!(keys, vec![VIEW, SOUND]);
    assert_eq!(resources.list(ResourceType::Sound), vec![5]);

    let view = resources.load_resource(VIEW)?;
    assert_eq!(view.data(), &[0xAA; 64][..]);
    let sound = resources.load_resource(SOUND)?;
    assert_eq!(sound.data(), b"sound from the volume");
    assert_eq!(sound.origin, SourceKind::Volume);
    Ok(())
}

#[test]
fn patch_files_override_the_volume() -> Result<()> {
    let dir = tempdir()?;
    write_game_dir(dir.path())?;
    let ext = ResourceType::Sound.patch_extension().expect("sound patches exist");
    fs::write(
        dir.path().join(format!("5.{ext}")),
        encode_patch_file(ResourceType::Sound, b"patched"),
    )?;

    let resources = ResourceManager::from_game_dir(dir.path())?;
    assert_eq!(resources.resolve(SOUND)?.kind, SourceKind::Patch);
    let sound = resources.load_resource(SOUND)?;
    assert_eq!(sound.data(), b"patched");
    assert_eq!(resources.resolve(VIEW)?.kind, SourceKind::Volume);
    Ok(())
}

#[test]
fn missing_resources_are_not_cached() -> Result<()> {
    let dir = tempdir()?;
    write_game_dir(dir.path())?;
    let resources = ResourceManager::from_game_dir(dir.path())?;
    let missing = ResourceKey::new(ResourceType::Sound, 999);

    let err = resources.load_resource(missing).unwrap_err();
    assert!(matches!(err, ResourceError::NotFound(key) if key == missing));
    assert!(err.is_absent());
    assert!(!resources.is_cached(missing));
    assert!(resources.find_resource(missing).is_none());
    assert_eq!(resources.cache_len(), 0);
    Ok(())
}

#[test]
fn threads_share_one_cached_buffer() -> Result<()> {
    let dir = tempdir()?;
    write_game_dir(dir.path())?;
    let resources = Arc::new(ResourceManager::from_game_dir(dir.path())?);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let resources = Arc::clone(&resources);
            thread::spawn(move || resources.load_resource(VIEW))
        })
        .collect();
    let loaded: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("loader thread panicked"))
        .collect::<Result<_, _>>()?;

    for resource in &loaded[1..] {
        assert!(Arc::ptr_eq(&loaded[0], resource));
    }
    assert_eq!(resources.load_count(), 1);
    Ok(())
}

#[test]
fn evicted_resources_reload_from_disk() -> Result<()> {
    let dir = tempdir()?;
    write_game_dir(dir.path())?;
    let resources = ResourceManager::from_game_dir(dir.path())?;

    let first = resources.load_resource(SOUND)?;
    assert!(resources.evict(SOUND));
    assert!(!resources.is_cached(SOUND));
    let second = resources.load_resource(SOUND)?;
    assert_eq!(first.data(), second.data());
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(resources.load_count(), 2);
    Ok(())
}

#[test]
fn empty_directories_are_rejected() -> Result<()> {
    let dir = tempdir()?;
    assert!(ResourceManager::from_game_dir(dir.path()).is_err());
    Ok(())
}
