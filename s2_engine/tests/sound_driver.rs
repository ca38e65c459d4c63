use std::fs;
use std::sync::Arc;

use anyhow::Result;
use s2_engine::config::GameConfig;
use s2_engine::game::Game;
use s2_engine::interface::{InterfaceButton, OPTIONS_ROOM};
use s2_engine::resource::ResourceManager;
use s2_engine::room::{ALTAR_ROOM, VAULT_ROOM};
use s2_engine::sound::{
    GeneralMidiDriver, MidiMessage, RecordingMidiDevice, RecordingMixer, RecordingPacer,
    SciVersion, SoundDriver, SoundError,
};
use s2_engine::system::{Event, Key, Point};
use s2_engine::GameRequest;
use s2_formats::patch_file::encode_patch_file;
use s2_formats::{GmPatch, ResourceType};
use tempfile::tempdir;

fn driver_for(resources: &ResourceManager, device: &RecordingMidiDevice) -> GeneralMidiDriver {
    GeneralMidiDriver::new(
        resources,
        SciVersion::Sci21,
        Box::new(device.clone()),
        Box::new(RecordingPacer::new()),
    )
    .expect("driver opens on a recording device")
}

#[test]
fn patch_file_in_the_game_dir_drives_program_remapping() -> Result<()> {
    let dir = tempdir()?;
    let mut patch = GmPatch::identity();
    patch.program_map[10] = 20;
    fs::write(
        dir.path().join("4.pat"),
        encode_patch_file(ResourceType::Patch, &patch.encode()),
    )?;
    let resources = ResourceManager::from_game_dir(dir.path())?;

    let device = RecordingMidiDevice::new();
    let mut driver = driver_for(&resources, &device);
    assert_eq!(driver.patch().program_map[10], 20);

    device.clear();
    driver.program_change(0, 10);
    let hw = driver.channel(0).expect("channel 0").hw.0;
    let programs: Vec<_> = device
        .messages()
        .into_iter()
        .filter(|message| {
            matches!(message, MidiMessage::Short { status, .. } if status & 0xF0 == 0xC0)
        })
        .collect();
    assert_eq!(
        programs,
        vec![MidiMessage::Short {
            status: 0xC0 | hw,
            data1: 20,
            data2: 0
        }]
    );
    Ok(())
}

#[test]
fn corrupt_patch_falls_back_to_identity() -> Result<()> {
    let dir = tempdir()?;
    fs::write(
        dir.path().join("4.pat"),
        encode_patch_file(ResourceType::Patch, &[1, 2, 3]),
    )?;
    let resources = ResourceManager::from_game_dir(dir.path())?;
    let device = RecordingMidiDevice::new();
    let driver = driver_for(&resources, &device);
    assert_eq!(driver.patch(), &GmPatch::identity());
    Ok(())
}

#[test]
fn unavailable_device_is_reported() {
    let resources = ResourceManager::new();
    let result = GeneralMidiDriver::new(
        &resources,
        SciVersion::Sci21,
        Box::new(RecordingMidiDevice::unavailable()),
        Box::new(RecordingPacer::new()),
    );
    assert!(matches!(result, Err(SoundError::DeviceUnavailable(_))));
}

#[test]
fn game_applies_the_configured_master_volume() {
    let resources = Arc::new(ResourceManager::new());
    let device = RecordingMidiDevice::new();
    let driver = driver_for(&resources, &device);
    let config = GameConfig {
        master_volume: 15,
        ..GameConfig::default()
    };
    let game = Game::new(resources, Box::new(RecordingMixer::new()), config)
        .with_midi(Box::new(driver));

    let midi = game.kernel.midi.as_ref().expect("driver attached");
    assert_eq!(midi.master_volume(), 15);
    assert_eq!(midi.device_id(), 7);
}

#[test]
fn room_music_and_options_reach_the_driver() -> Result<()> {
    let dir = tempdir()?;
    let music = [0xC0, 10, 0x90, 60, 100, 0x80, 60, 0];
    fs::write(
        dir.path().join(format!("{VAULT_ROOM}.snd")),
        encode_patch_file(ResourceType::Sound, &music),
    )?;
    let resources = Arc::new(ResourceManager::from_game_dir(dir.path())?);
    let device = RecordingMidiDevice::new();
    let driver = driver_for(&resources, &device);
    let config = GameConfig {
        start_room: ALTAR_ROOM,
        ..GameConfig::default()
    };
    let mut game = Game::new(resources, Box::new(RecordingMixer::new()), config)
        .with_midi(Box::new(driver));

    device.clear();
    game.kernel.request(GameRequest::LoadRoom(VAULT_ROOM));
    game.tick();
    let notes: Vec<u8> = device
        .messages()
        .into_iter()
        .filter_map(|message| match message {
            MidiMessage::Short { status, data1, .. } if status & 0xF0 == 0x90 => Some(data1),
            _ => None,
        })
        .collect();
    assert_eq!(notes, vec![60]);
    assert!(game
        .kernel
        .events()
        .iter()
        .any(|event| event == &format!("music.play {VAULT_ROOM}")));

    let options = InterfaceButton::Options.rect();
    let at = Point::new(options.left + 5, options.top + 5);
    game.handle_event(Event::mouse_press(at));
    game.handle_event(Event::mouse_release(at));
    assert_eq!(game.rooms.status().global_room, Some(OPTIONS_ROOM));

    assert!(game.handle_event(Event::key_down(Key::Char('-'))));
    assert_eq!(game.kernel.music_volume(), Some(11));
    assert!(game.handle_event(Event::key_down(Key::Char('m'))));
    let midi = game.kernel.midi.as_ref().expect("driver attached");
    assert!(!midi.is_enabled());
    Ok(())
}
