//! Cooperative runtime: scripts, animators, sound tracks and the display
//! plane they act on.

pub mod arena;
pub mod cycler;
pub mod event;
pub mod mover;
pub mod plane;
pub mod script;
pub mod track;
pub mod types;

pub use arena::{Arena, Id};
pub use cycler::{AnimTarget, CycleKind, Cycler, CyclerId, Progress};
pub use event::{Event, EventKind, Key};
pub use mover::{MoveKind, Mover, MoverId};
pub use plane::{ItemOwner, Plane, PlaneEvent, ScreenItem, ScreenItemId};
pub use script::{HALT, Script, ScriptId, ScriptRunner, ScriptTarget, TICKS_PER_SECOND};
pub use track::{SoundTrack, TrackId, TrackNode, TrackSound};
pub use types::{Animated, CelRes, Point, Rect};
