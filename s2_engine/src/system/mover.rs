use serde::Serialize;

use super::arena::Id;
use super::cycler::{AnimTarget, Progress};
use super::script::ScriptId;
use super::types::{Animated, Point};

pub type MoverId = Id<Mover>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveKind {
    /// Straight line; the longer axis advances by its step size each move.
    Line,
    /// Same path as `Line`, lifted by a parabola peaking at `height`.
    Arc { height: i16 },
}

/// Carries a position to `destination` one step every `move_speed` ticks and
/// cues its caller on arrival.
#[derive(Debug, Clone)]
pub struct Mover {
    pub kind: MoveKind,
    pub target: AnimTarget,
    pub caller: Option<ScriptId>,
    destination: Point,
    origin: Point,
    steps: u32,
    step: u32,
    counter: u32,
}

fn steps_along(delta: i32, step_size: i16) -> u32 {
    let step_size = step_size.max(1) as i32;
    ((delta.abs() + step_size - 1) / step_size) as u32
}

impl Mover {
    pub fn new(
        kind: MoveKind,
        target: AnimTarget,
        destination: Point,
        caller: Option<ScriptId>,
    ) -> Self {
        Self {
            kind,
            target,
            caller,
            destination,
            origin: destination,
            steps: 0,
            step: 0,
            counter: 0,
        }
    }

    pub fn destination(&self) -> Point {
        self.destination
    }

    pub fn total_steps(&self) -> u32 {
        self.steps
    }

    /// Captures the starting point and plans the step count.
    pub fn start(&mut self, sprite: &dyn Animated) {
        self.origin = sprite.position();
        let step_size = sprite.step_size();
        let dx = self.destination.x as i32 - self.origin.x as i32;
        let dy = self.destination.y as i32 - self.origin.y as i32;
        self.steps = steps_along(dx, step_size.x).max(steps_along(dy, step_size.y));
        if let MoveKind::Arc { .. } = self.kind {
            self.steps = self.steps.max(2);
        }
        self.step = 0;
        self.counter = 0;
    }

    fn position_at(&self, step: u32) -> Point {
        let steps = self.steps.max(1) as i32;
        let step = step as i32;
        let lerp = |from: i16, to: i16| from as i32 + (to as i32 - from as i32) * step / steps;
        let x = lerp(self.origin.x, self.destination.x);
        let mut y = lerp(self.origin.y, self.destination.y);
        if let MoveKind::Arc { height } = self.kind {
            y -= 4 * height as i32 * step * (steps - step) / (steps * steps);
        }
        Point::new(x as i16, y as i16)
    }

    pub fn step(&mut self, sprite: &mut dyn Animated) -> Progress {
        if self.step >= self.steps {
            sprite.set_position(self.destination);
            return Progress::Done;
        }
        self.counter += 1;
        if self.counter < sprite.move_speed().max(1) {
            return Progress::Idle;
        }
        self.counter = 0;
        self.step += 1;
        sprite.set_position(self.position_at(self.step));
        if self.step == self.steps {
            Progress::Done
        } else {
            Progress::Stepped
        }
    }
}
