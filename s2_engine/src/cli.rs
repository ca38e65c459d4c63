use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "Headless runtime host that pumps rooms, scripts and sound for a number of ticks",
    version
)]
pub struct Args {
    /// Directory holding resource.map, resource.* volumes and patch files
    #[arg(long, default_value = ".")]
    pub game_dir: PathBuf,

    /// Optional JSON config file (missing fields keep their defaults)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of 60Hz ticks to run
    #[arg(long, default_value_t = 600)]
    pub ticks: u64,

    /// Room to start in instead of the configured one
    #[arg(long)]
    pub room: Option<u16>,

    /// Drive a General MIDI driver on a recording device
    #[arg(long)]
    pub midi: bool,

    /// Path to write the MIDI messages sent to the device as JSON (requires --midi)
    #[arg(long)]
    pub midi_log_json: Option<PathBuf>,

    /// JSON file of `{ "tick": N, "event": {...} }` entries to inject
    #[arg(long)]
    pub input_json: Option<PathBuf>,

    /// Path to write the runtime event log as JSON
    #[arg(long)]
    pub event_log_json: Option<PathBuf>,

    /// Path to write the digital audio log as JSON
    #[arg(long)]
    pub audio_log_json: Option<PathBuf>,

    /// Saved game to restore before running
    #[arg(long)]
    pub load_save: Option<PathBuf>,

    /// Path to write a saved game once the run ends
    #[arg(long)]
    pub save_path: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RunArgs {
    pub game_dir: PathBuf,
    pub config: Option<PathBuf>,
    pub ticks: u64,
    pub room: Option<u16>,
    pub midi: bool,
    pub midi_log_json: Option<PathBuf>,
    pub input_json: Option<PathBuf>,
    pub event_log_json: Option<PathBuf>,
    pub audio_log_json: Option<PathBuf>,
    pub load_save: Option<PathBuf>,
    pub save_path: Option<PathBuf>,
}

pub fn parse() -> Result<RunArgs> {
    let args = Args::parse();
    args.into_run_args()
}

impl Args {
    fn into_run_args(self) -> Result<RunArgs> {
        if !self.midi && self.midi_log_json.is_some() {
            bail!("--midi-log-json requires --midi");
        }
        if self.room == Some(0) {
            bail!("--room must name a real room");
        }
        if self.room.is_some() && self.load_save.is_some() {
            bail!("--room and --load-save cannot be combined");
        }

        Ok(RunArgs {
            game_dir: self.game_dir,
            config: self.config,
            ticks: self.ticks,
            room: self.room,
            midi: self.midi,
            midi_log_json: self.midi_log_json,
            input_json: self.input_json,
            event_log_json: self.event_log_json,
            audio_log_json: self.audio_log_json,
            load_save: self.load_save,
            save_path: self.save_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["s2_engine"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn defaults_run_six_hundred_ticks() {
        let run = args(&[]).into_run_args().unwrap();
        assert_eq!(run.ticks, 600);
        assert_eq!(run.game_dir, PathBuf::from("."));
        assert!(!run.midi);
    }

    #[test]
    fn midi_log_needs_a_driver() {
        assert!(args(&["--midi-log-json", "midi.json"]).into_run_args().is_err());
        let run = args(&["--midi", "--midi-log-json", "midi.json"])
            .into_run_args()
            .unwrap();
        assert_eq!(run.midi_log_json, Some(PathBuf::from("midi.json")));
    }

    #[test]
    fn room_zero_is_rejected() {
        assert!(args(&["--room", "0"]).into_run_args().is_err());
        assert!(args(&["--room", "26000", "--load-save", "s.sav"])
            .into_run_args()
            .is_err());
    }
}
