use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use log::{info, warn};
use s2_engine::config::GameConfig;
use s2_engine::game::Game;
use s2_engine::resource::ResourceManager;
use s2_engine::sound::{GeneralMidiDriver, RecordingMidiDevice, RecordingMixer, ThreadPacer};
use s2_engine::system::Event;
use serde::{Deserialize, Serialize};

mod cli;

#[derive(Debug, Deserialize)]
struct ScriptedInput {
    tick: u64,
    event: Event,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    ticks: u64,
    room: u16,
    previous_room: u16,
    life: i32,
    events: &'a [String],
}

fn load_inputs(path: &Path) -> Result<Vec<ScriptedInput>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read input script: {}", path.display()))?;
    let mut inputs: Vec<ScriptedInput> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse input script: {}", path.display()))?;
    inputs.sort_by_key(|input| input.tick);
    Ok(inputs)
}

fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path, what: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("writing {what} to {}", path.display()))?;
    println!("Saved {what} to {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = cli::parse()?;

    let mut config =
        GameConfig::from_json_file(args.config.as_deref()).context("loading game config")?;
    if let Some(room) = args.room {
        config.start_room = room;
    }

    let resources = Arc::new(
        ResourceManager::from_game_dir(&args.game_dir)
            .with_context(|| format!("indexing resources in {}", args.game_dir.display()))?,
    );
    info!("indexed {} resources", resources.keys().len());

    let mixer = RecordingMixer::new();
    let midi_device = RecordingMidiDevice::new();
    let mut game = Game::new(resources.clone(), Box::new(mixer.clone()), config.clone());
    if args.midi {
        match GeneralMidiDriver::new(
            &resources,
            config.version,
            Box::new(midi_device.clone()),
            Box::new(ThreadPacer),
        ) {
            Ok(driver) => game = game.with_midi(Box::new(driver)),
            Err(err) => warn!("continuing without MIDI: {err}"),
        }
    }

    if let Some(path) = &args.load_save {
        let data = fs::read(path)
            .with_context(|| format!("failed to read saved game: {}", path.display()))?;
        game.load(&data)
            .with_context(|| format!("restoring {}", path.display()))?;
    }

    let inputs = match &args.input_json {
        Some(path) => load_inputs(path)?,
        None => Vec::new(),
    };
    let mut pending = inputs.into_iter().peekable();
    for tick in 0..args.ticks {
        while let Some(input) = pending.next_if(|input| input.tick <= tick) {
            game.handle_event(input.event);
        }
        game.tick();
    }

    let summary = RunSummary {
        ticks: game.kernel.ticks(),
        room: game.rooms.current_number(),
        previous_room: game.rooms.previous_number(),
        life: game.interface.life(),
        events: game.kernel.events(),
    };
    println!(
        "Ran {} ticks; now in room {} (from {}), life {}",
        summary.ticks, summary.room, summary.previous_room, summary.life
    );

    if let Some(path) = &args.event_log_json {
        write_json(&summary, path, "event log")?;
    }
    if let Some(path) = &args.audio_log_json {
        write_json(&mixer.events(), path, "audio log")?;
    }
    if let Some(path) = &args.midi_log_json {
        write_json(&midi_device.messages(), path, "MIDI log")?;
    }
    if let Some(path) = &args.save_path {
        let data = game.save().context("serializing saved game")?;
        fs::write(path, &data)
            .with_context(|| format!("writing saved game to {}", path.display()))?;
        println!("Saved game to {}", path.display());
    }

    Ok(())
}
