use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use s2_formats::{SaveHeader, Serializer};

use crate::config::GameConfig;
use crate::interface::{Interface, SavedInterface, MAX_LIFE};
use crate::kernel::{GameRequest, Kernel};
use crate::resource::ResourceManager;
use crate::room::RoomManager;
use crate::sound::{AudioMixer, SoundDriver};
use crate::system::{Event, ScriptTarget};

/// Top-level loop: pumps scripts and animators once per tick, routes their
/// transitions and applies the requests handlers queued along the way.
pub struct Game {
    pub kernel: Kernel,
    pub rooms: RoomManager,
    pub interface: Interface,
    config: GameConfig,
    last_save: Option<Vec<u8>>,
}

impl Game {
    pub fn new(
        resources: Arc<ResourceManager>,
        mixer: Box<dyn AudioMixer>,
        config: GameConfig,
    ) -> Self {
        let mut kernel = Kernel::new(resources, mixer, config.seed);
        let mut interface = Interface::new(&mut kernel);
        interface.set_captioning(config.captions);
        let mut game = Self {
            kernel,
            rooms: RoomManager::new(),
            interface,
            config,
            last_save: None,
        };
        game.load_room(game.config.start_room);
        game
    }

    /// Attaches a MIDI driver and applies the configured master volume.
    pub fn with_midi(mut self, driver: Box<dyn SoundDriver>) -> Self {
        self.kernel.midi = Some(driver);
        self.kernel.set_music_volume(self.config.master_volume);
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn last_save(&self) -> Option<&[u8]> {
        self.last_save.as_deref()
    }

    pub fn tick(&mut self) {
        self.kernel.animate();
        for script in self.kernel.scripts.collect_due() {
            let Some((target, state)) = self.kernel.scripts.advance(script) else {
                continue;
            };
            match target {
                ScriptTarget::Track(track) => self.kernel.drive_track(track, script, state),
                ScriptTarget::Interface(tag) => {
                    self.interface
                        .change_state(&mut self.kernel, tag, script, state)
                }
                target => self
                    .rooms
                    .change_state(&mut self.kernel, target, script, state),
            }
        }
        self.rooms.tick(&mut self.kernel);
        self.interface.tick(&mut self.kernel);
        self.apply_requests();
        self.kernel.advance_tick();
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Rooms see the event first, then the interface. The interface still
    /// sees releases the rooms claimed so a pressed button can disarm.
    pub fn handle_event(&mut self, mut event: Event) -> bool {
        self.rooms.handle_event(&mut event, &mut self.kernel);
        let status = self.rooms.status();
        let claimed = self
            .interface
            .handle_event(&mut event, &mut self.kernel, &status);
        self.apply_requests();
        claimed
    }

    fn apply_requests(&mut self) {
        while let Some(request) = self.kernel.take_request() {
            self.apply(request);
        }
    }

    fn apply(&mut self, request: GameRequest) {
        let kernel = &mut self.kernel;
        match request {
            GameRequest::LoadRoom(number) => {
                self.rooms.unload_global_room(kernel);
                self.load_room(number);
            }
            GameRequest::LoadGlobalRoom(number) => self.rooms.load_global_room(kernel, number),
            GameRequest::UnloadGlobalRoom => {
                self.rooms.unload_global_room(kernel);
                let status = self.rooms.status();
                self.interface.reset_buttons(kernel, &status);
            }
            GameRequest::OpenSubRoom(number) => {
                self.rooms.open_sub_room(kernel, number);
            }
            GameRequest::CloseSubRoom => {
                self.rooms.close_sub_room(kernel);
            }
            GameRequest::ChangeLife(amount) => self.interface.change_life(kernel, amount, false),
            GameRequest::ToggleAutoHighlight => {
                let on = self.rooms.toggle_auto_highlight();
                kernel.log_event(format!("game.auto_highlight {on}"));
            }
            GameRequest::Save => match self.save() {
                Ok(bytes) => self.last_save = Some(bytes),
                Err(err) => warn!("save failed: {err:#}"),
            },
            GameRequest::Restart => {
                info!("restarting at room {}", self.config.start_room);
                self.rooms.dispose_all(kernel);
                self.interface.change_life(kernel, MAX_LIFE, true);
                self.load_room(self.config.start_room);
            }
        }
    }

    fn load_room(&mut self, number: u16) {
        self.rooms.load_room(&mut self.kernel, number);
        let status = self.rooms.status();
        if status.is_interactive() {
            self.interface.reset_buttons(&mut self.kernel, &status);
        } else {
            self.interface.disable_buttons(&mut self.kernel);
        }
    }

    /// Header, current room, then interface state.
    pub fn save(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut header = SaveHeader::default();
        let mut room = self.rooms.current_number();
        let mut interface = self.interface.saved_state();
        {
            let mut s = Serializer::saver(&mut out);
            header.sync(&mut s)?;
            s.sync_as_u16_le(&mut room)?;
            interface.sync(&mut s)?;
        }
        self.kernel.log_event(format!("game.save {} bytes", out.len()));
        Ok(out)
    }

    /// Reads the whole record before touching the running game, so a
    /// rejected save leaves it as it was.
    pub fn load(&mut self, data: &[u8]) -> Result<()> {
        if !SaveHeader::detect(data) {
            bail!("data is not a saved game");
        }
        let mut s = Serializer::loader(data);
        let mut header = SaveHeader::default();
        header.sync(&mut s).context("reading save header")?;
        let mut room = 0u16;
        s.sync_as_u16_le(&mut room).context("reading room number")?;
        let mut interface = SavedInterface::default();
        interface.sync(&mut s).context("reading interface state")?;

        self.rooms.dispose_all(&mut self.kernel);
        self.load_room(room);
        let status = self.rooms.status();
        self.interface.restore(&mut self.kernel, interface, &status);
        self.kernel.log_event(format!("game.load room {room}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::GAME_OVER_ROOM;
    use crate::room::{ALTAR_ROOM, INTRO_ROOM, VAULT_ROOM};
    use crate::sound::RecordingMixer;
    use crate::system::{Key, Point};

    fn game(start_room: u16) -> Game {
        let config = GameConfig {
            start_room,
            ..GameConfig::default()
        };
        Game::new(
            Arc::new(ResourceManager::new()),
            Box::new(RecordingMixer::new()),
            config,
        )
    }

    #[test]
    fn starts_in_the_configured_room() {
        let game = game(ALTAR_ROOM);
        assert_eq!(game.rooms.current_number(), ALTAR_ROOM);
        assert_eq!(game.interface.life(), MAX_LIFE);
    }

    #[test]
    fn intro_keeps_global_buttons_disabled() {
        let game = game(INTRO_ROOM);
        for which in [
            crate::interface::InterfaceButton::Options,
            crate::interface::InterfaceButton::Map,
        ] {
            assert!(!game.interface.button(which).is_enabled());
        }
    }

    #[test]
    fn life_running_out_opens_game_over_and_restart_recovers() {
        let mut game = game(VAULT_ROOM);
        game.kernel.request(GameRequest::ChangeLife(-MAX_LIFE));
        game.tick();
        assert_eq!(game.rooms.status().global_room, Some(GAME_OVER_ROOM));

        assert!(game.handle_event(Event::key_down(Key::Char('r'))));
        assert_eq!(game.rooms.status().global_room, None);
        assert_eq!(game.rooms.current_number(), VAULT_ROOM);
        assert_eq!(game.interface.life(), MAX_LIFE);
    }

    #[test]
    fn save_then_load_restores_room_and_life() -> Result<()> {
        let mut game = game(VAULT_ROOM);
        game.kernel.request(GameRequest::ChangeLife(-30));
        game.tick();
        let saved = game.save()?;

        game.kernel.request(GameRequest::LoadRoom(ALTAR_ROOM));
        game.kernel.request(GameRequest::ChangeLife(20));
        game.tick();
        assert_eq!(game.interface.life(), 90);

        game.load(&saved)?;
        assert_eq!(game.rooms.current_number(), VAULT_ROOM);
        assert_eq!(game.interface.life(), 70);
        Ok(())
    }

    #[test]
    fn truncated_save_leaves_the_game_untouched() -> Result<()> {
        let mut saved = game(VAULT_ROOM).save()?;
        saved.truncate(saved.len() - 2);

        let mut game = game(ALTAR_ROOM);
        game.kernel.request(GameRequest::ChangeLife(-40));
        game.tick();
        let err = game.load(&saved).unwrap_err();
        assert!(format!("{err:#}").contains("reading interface state"));
        assert_eq!(game.rooms.current_number(), ALTAR_ROOM);
        assert_eq!(game.interface.life(), 60);
        Ok(())
    }

    #[test]
    fn garbage_is_not_loaded() {
        let mut game = game(VAULT_ROOM);
        assert!(game.load(&[0, 1, 2, 3]).is_err());
        assert_eq!(game.rooms.current_number(), VAULT_ROOM);
    }

    #[test]
    fn map_travel_unloads_the_overlay_first() {
        let mut game = game(VAULT_ROOM);
        assert!(game.handle_event(Event::key_down(Key::Tab)));
        assert!(game.rooms.status().global_room.is_some());
        assert!(game.handle_event(Event::mouse_press(Point::new(150, 150))));
        assert_eq!(game.rooms.status().global_room, None);
        assert_eq!(game.rooms.current_number(), ALTAR_ROOM);
        assert_eq!(game.kernel.plane.peak_room_overlap(), 1);
    }
}
