pub mod button;
pub mod config;
pub mod game;
pub mod hotspot;
pub mod interface;
pub mod kernel;
pub mod panorama;
pub mod resource;
pub mod room;
pub mod sound;
pub mod system;

pub use config::GameConfig;
pub use game::Game;
pub use kernel::{GameRequest, Kernel};
