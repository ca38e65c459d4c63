//! The persistent toolbar along the bottom of the screen.
//!
//! It owns the flashback, options, map and eye buttons, the health gauge and
//! the caption area. Only one global room button can be active at a time:
//! activating one disables the others until the same button closes the
//! global room again.

use anyhow::Result;
use log::debug;
use s2_formats::Serializer;
use serde::Serialize;

use crate::button::{Button, ButtonAction, ButtonFaces};
use crate::kernel::{GameRequest, Kernel};
use crate::room::RoomStatus;
use crate::system::{
    CelRes, Event, EventKind, ItemOwner, Key, Point, Rect, ScreenItem, ScreenItemId, ScriptId,
    ScriptTarget,
};

pub const INTERFACE_VIEW: u16 = 999;
pub const MAX_LIFE: i32 = 100;

pub const OPTIONS_ROOM: u16 = 4100;
pub const FLASHBACK_ROOM: u16 = 4110;
pub const MAP_ROOM: u16 = 4130;
pub const GAME_OVER_ROOM: u16 = 4200;

/// Rooms where the toolbar buttons do nothing.
const LOCKED_ROOMS: [u16; 2] = [1015, 6667];

const CAPTION_SCRIPT: u16 = 0;
const CAPTION_LINE_CHARS: usize = 64;
const CAPTION_PAGE_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceButton {
    Eye,
    Flashback,
    Options,
    Map,
}

impl InterfaceButton {
    const ALL: [InterfaceButton; 4] = [
        InterfaceButton::Eye,
        InterfaceButton::Flashback,
        InterfaceButton::Options,
        InterfaceButton::Map,
    ];

    fn loop_no(self) -> i16 {
        match self {
            InterfaceButton::Flashback => 4,
            InterfaceButton::Options => 5,
            InterfaceButton::Map => 6,
            InterfaceButton::Eye => 7,
        }
    }

    pub fn rect(self) -> Rect {
        match self {
            InterfaceButton::Eye => Rect::new(20, 400, 80, 470),
            InterfaceButton::Flashback => Rect::new(140, 400, 180, 470),
            InterfaceButton::Options => Rect::new(190, 400, 230, 470),
            InterfaceButton::Map => Rect::new(240, 400, 280, 470),
        }
    }

    pub fn global_room(self) -> Option<u16> {
        match self {
            InterfaceButton::Flashback => Some(FLASHBACK_ROOM),
            InterfaceButton::Options => Some(OPTIONS_ROOM),
            InterfaceButton::Map => Some(MAP_ROOM),
            InterfaceButton::Eye => None,
        }
    }

    pub fn sound(self) -> u16 {
        match self {
            InterfaceButton::Flashback => 10911,
            InterfaceButton::Options => 10912,
            InterfaceButton::Map | InterfaceButton::Eye => 10905,
        }
    }
}

#[derive(Debug)]
pub struct Interface {
    eye: Button,
    flashback: Button,
    options: Button,
    map: Button,
    toolbar: ScreenItemId,
    health_mask: ScreenItemId,
    life: i32,
    captioning: bool,
    caption: String,
    pages: Vec<String>,
    next_page: usize,
    caption_finished: bool,
    caption_script: Option<ScriptId>,
    displayed: Option<String>,
}

impl Interface {
    pub fn new(kernel: &mut Kernel) -> Self {
        let plane = &mut kernel.plane;
        let toolbar = plane.add(ScreenItem::new(
            ItemOwner::Interface,
            CelRes::new(INTERFACE_VIEW, 0, 0),
            Point::new(0, 479),
            3,
        ));
        plane.add(ScreenItem::new(
            ItemOwner::Interface,
            CelRes::new(INTERFACE_VIEW, 1, 0),
            Point::new(0, 479),
            1,
        ));
        let health_mask = plane.add(ScreenItem::new(
            ItemOwner::Interface,
            CelRes::new(INTERFACE_VIEW, 2, 0),
            Point::new(MAX_LIFE as i16 * 5, 479),
            2,
        ));
        let mut make = |button: InterfaceButton| {
            Button::new(
                plane,
                ItemOwner::Interface,
                ButtonFaces::from_loop(INTERFACE_VIEW, button.loop_no()),
                button.rect(),
            )
        };
        let interface = Self {
            eye: make(InterfaceButton::Eye),
            flashback: make(InterfaceButton::Flashback),
            options: make(InterfaceButton::Options),
            map: make(InterfaceButton::Map),
            toolbar,
            health_mask,
            life: MAX_LIFE,
            captioning: false,
            caption: String::new(),
            pages: Vec::new(),
            next_page: 0,
            caption_finished: false,
            caption_script: None,
            displayed: None,
        };
        kernel.log_event("interface.init");
        interface
    }

    pub fn toolbar(&self) -> ScreenItemId {
        self.toolbar
    }

    pub fn button(&self, which: InterfaceButton) -> &Button {
        match which {
            InterfaceButton::Eye => &self.eye,
            InterfaceButton::Flashback => &self.flashback,
            InterfaceButton::Options => &self.options,
            InterfaceButton::Map => &self.map,
        }
    }

    fn button_mut(&mut self, which: InterfaceButton) -> &mut Button {
        match which {
            InterfaceButton::Eye => &mut self.eye,
            InterfaceButton::Flashback => &mut self.flashback,
            InterfaceButton::Options => &mut self.options,
            InterfaceButton::Map => &mut self.map,
        }
    }

    pub fn life(&self) -> i32 {
        self.life
    }

    pub fn is_captioning(&self) -> bool {
        self.captioning
    }

    pub fn set_captioning(&mut self, on: bool) {
        self.captioning = on;
    }

    /// Text currently shown in the caption area.
    pub fn displayed_text(&self) -> Option<&str> {
        self.displayed.as_deref()
    }

    /// Adjusts health, clamped to `0..=100`. Running out opens the game over
    /// global room.
    pub fn change_life(&mut self, kernel: &mut Kernel, amount: i32, absolute: bool) {
        let life = if absolute { amount } else { self.life + amount };
        self.life = life.clamp(0, MAX_LIFE);
        if self.life == 0 {
            kernel.log_event("interface.life 0");
            kernel.request(GameRequest::LoadGlobalRoom(GAME_OVER_ROOM));
        } else if let Some(mask) = kernel.plane.get_mut(self.health_mask) {
            mask.position = Point::new(self.life as i16 * 5, 479);
        }
    }

    pub fn disable_buttons(&mut self, kernel: &mut Kernel) {
        for which in [
            InterfaceButton::Flashback,
            InterfaceButton::Options,
            InterfaceButton::Map,
        ] {
            self.button_mut(which).disable(&mut kernel.plane);
        }
    }

    /// Re-enables the global room buttons when the player is somewhere
    /// interactive.
    pub fn reset_buttons(&mut self, kernel: &mut Kernel, status: &RoomStatus) {
        if !status.is_interactive() {
            return;
        }
        for which in [
            InterfaceButton::Options,
            InterfaceButton::Map,
            InterfaceButton::Flashback,
        ] {
            self.button_mut(which).enable(&mut kernel.plane);
        }
    }

    pub fn handle_event(
        &mut self,
        event: &mut Event,
        kernel: &mut Kernel,
        status: &RoomStatus,
    ) -> bool {
        if event.is_claimed() {
            if event.kind == EventKind::MouseRelease {
                for which in InterfaceButton::ALL {
                    self.button_mut(which).handle(event, &mut kernel.plane);
                }
            }
            return true;
        }
        match event.kind {
            EventKind::KeyDown => self.handle_key(event, kernel, status),
            EventKind::MousePress | EventKind::MouseRelease => {
                if !LOCKED_ROOMS.contains(&status.room) {
                    for which in InterfaceButton::ALL {
                        let action = self.button_mut(which).handle(event, &mut kernel.plane);
                        if action == ButtonAction::Activated {
                            self.activate(which, kernel);
                        }
                        if event.is_claimed() {
                            break;
                        }
                    }
                }
            }
        }
        event.is_claimed()
    }

    fn handle_key(&mut self, event: &mut Event, kernel: &mut Kernel, status: &RoomStatus) {
        match event.key {
            Some(Key::Tab) => {
                match status.global_room {
                    None => {
                        self.flashback.disable(&mut kernel.plane);
                        self.options.disable(&mut kernel.plane);
                        kernel.request(GameRequest::LoadGlobalRoom(MAP_ROOM));
                    }
                    Some(MAP_ROOM) => {
                        kernel.request(GameRequest::UnloadGlobalRoom);
                        self.reset_buttons(kernel, status);
                    }
                    Some(_) => {}
                }
                event.claim();
            }
            Some(Key::F3) => {
                self.captioning = !self.captioning;
                debug!("captioning {}", if self.captioning { "on" } else { "off" });
                event.claim();
            }
            Some(Key::F4) => {
                kernel.request(GameRequest::ToggleAutoHighlight);
                event.claim();
            }
            Some(Key::CtrlS) => {
                kernel.request(GameRequest::Save);
                event.claim();
            }
            _ => {}
        }
    }

    fn activate(&mut self, which: InterfaceButton, kernel: &mut Kernel) {
        if let Some(room) = which.global_room() {
            let contra = if which == InterfaceButton::Flashback {
                InterfaceButton::Options
            } else {
                InterfaceButton::Flashback
            };
            let opening = self.button(contra).is_enabled();
            if opening {
                kernel.request(GameRequest::LoadGlobalRoom(room));
            } else {
                kernel.request(GameRequest::UnloadGlobalRoom);
            }
            for other in [
                InterfaceButton::Flashback,
                InterfaceButton::Options,
                InterfaceButton::Map,
            ] {
                if other == which {
                    continue;
                }
                let button = self.button_mut(other);
                if opening {
                    button.disable(&mut kernel.plane);
                } else {
                    button.enable(&mut kernel.plane);
                }
            }
        }
        kernel.log_event(format!("interface.button {which:?}"));
        kernel.play_sound(which.sound(), 100, false);
    }

    /// Shows a caption when captioning is on. Long text is paged by the
    /// caption script.
    pub fn put_text(&mut self, kernel: &mut Kernel, text: &str, append: bool) {
        if !self.captioning {
            self.clear_text();
            return;
        }
        if text.is_empty() {
            self.caption_finished = true;
            self.clear_text();
            return;
        }
        if append {
            self.caption.push_str(text);
        } else {
            self.caption = text.to_owned();
        }
        self.stop_text(kernel);
        self.caption_script =
            Some(kernel.spawn_script("caption", ScriptTarget::Interface(CAPTION_SCRIPT)));
    }

    pub fn stop_text(&mut self, kernel: &mut Kernel) {
        if let Some(script) = self.caption_script.take() {
            kernel.dispose_script(script);
        }
    }

    fn clear_text(&mut self) {
        self.caption.clear();
        self.displayed = None;
    }

    pub fn tick(&mut self, kernel: &mut Kernel) {
        let done = self
            .caption_script
            .and_then(|script| kernel.scripts.state(script))
            .is_some_and(|state| state >= 3);
        if self.caption_finished && done {
            self.stop_text(kernel);
        }
    }

    pub fn change_state(&mut self, kernel: &mut Kernel, tag: u16, script: ScriptId, state: i32) {
        if tag != CAPTION_SCRIPT {
            debug!("interface has no script tagged {tag}");
            return;
        }
        match state {
            0 => {
                kernel.scripts.set_cycles(script, 1);
                self.pages = paginate(&self.caption);
                self.next_page = 0;
                self.caption_finished = false;
            }
            1 => {
                if self.caption_finished {
                    kernel.scripts.set_state(script, 2);
                    kernel.scripts.set_cycles(script, 1);
                    return;
                }
                let page = self.pages.get(self.next_page).cloned().unwrap_or_default();
                self.next_page += 1;
                if self.next_page >= self.pages.len() {
                    self.caption_finished = true;
                }
                kernel.log_event(format!("caption.show {page}"));
                self.displayed = Some(page);
                kernel.scripts.set_cycles(script, 1);
            }
            2 => {
                let lines = self
                    .displayed
                    .as_deref()
                    .map_or(0, |page| page.lines().count());
                let seconds = if lines > 2 { 15 } else { 10 };
                kernel.scripts.set_seconds(script, seconds);
                kernel.scripts.set_state(script, 0);
            }
            3 => self.clear_text(),
            _ => {}
        }
    }

    pub fn saved_state(&self) -> SavedInterface {
        SavedInterface {
            captioning: self.captioning,
            life: self.life,
        }
    }

    /// Applies a restored state, then reapplies the health gauge and the
    /// button states.
    pub fn restore(&mut self, kernel: &mut Kernel, state: SavedInterface, status: &RoomStatus) {
        self.captioning = state.captioning;
        self.change_life(kernel, state.life, true);
        self.reset_buttons(kernel, status);
        self.eye.enable(&mut kernel.plane);
    }
}

/// Interface fields kept in a saved game: captioning then life.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SavedInterface {
    pub captioning: bool,
    pub life: i32,
}

impl SavedInterface {
    pub fn sync(&mut self, s: &mut Serializer<'_>) -> Result<()> {
        s.sync_bool(&mut self.captioning)?;
        s.sync_as_i32_le(&mut self.life)
    }
}

/// Word-wraps text to the caption width and groups the lines into pages.
fn paginate(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.len() + 1 + word.len() > CAPTION_LINE_CHARS {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
        .chunks(CAPTION_PAGE_LINES)
        .map(|page| page.join("\n"))
        .collect()
}
