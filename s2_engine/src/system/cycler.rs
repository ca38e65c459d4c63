use serde::Serialize;

use super::arena::Id;
use super::plane::ScreenItemId;
use super::script::ScriptId;
use super::types::Animated;
use crate::panorama::PanoramaSpriteId;

pub type CyclerId = Id<Cycler>;

/// Object an animator drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AnimTarget {
    Screen(ScreenItemId),
    Panorama(PanoramaSpriteId),
}

/// Result of one animator tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Idle,
    Stepped,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "cel", rename_all = "snake_case")]
pub enum CycleKind {
    /// Loops forever.
    Forward,
    EndForward,
    EndBack,
    /// Runs to the last cel and back to the first.
    EndForwardBackward,
    /// Runs forward from cel 0, then snaps back to 0.
    StartReset,
    /// Runs backward from the last cel, then snaps back to it.
    EndReset,
    CycleTo(i16),
}

/// Steps a cel index every `cycle_speed` ticks and cues its caller when the
/// cycle completes.
#[derive(Debug, Clone)]
pub struct Cycler {
    pub kind: CycleKind,
    pub target: AnimTarget,
    pub caller: Option<ScriptId>,
    counter: u32,
    reversing: bool,
}

impl Cycler {
    pub fn new(kind: CycleKind, target: AnimTarget, caller: Option<ScriptId>) -> Self {
        Self {
            kind,
            target,
            caller,
            counter: 0,
            reversing: false,
        }
    }

    /// Puts the cel where the cycle begins.
    pub fn start(&mut self, sprite: &mut dyn Animated) {
        match self.kind {
            CycleKind::EndForward | CycleKind::StartReset => sprite.set_cel(0),
            CycleKind::EndBack | CycleKind::EndReset => sprite.set_cel(sprite.last_cel()),
            CycleKind::Forward | CycleKind::EndForwardBackward | CycleKind::CycleTo(_) => {}
        }
        self.counter = 0;
        self.reversing = false;
    }

    pub fn step(&mut self, sprite: &mut dyn Animated) -> Progress {
        self.counter += 1;
        if self.counter < sprite.cycle_speed().max(1) {
            return Progress::Idle;
        }
        self.counter = 0;

        let cel = sprite.cel();
        let last = sprite.last_cel();
        match self.kind {
            CycleKind::Forward => {
                sprite.set_cel(if cel >= last { 0 } else { cel + 1 });
                Progress::Stepped
            }
            CycleKind::EndForward => toward(sprite, cel, last),
            CycleKind::EndBack => toward(sprite, cel, 0),
            CycleKind::EndForwardBackward => {
                if !self.reversing {
                    if cel < last {
                        sprite.set_cel(cel + 1);
                        return Progress::Stepped;
                    }
                    self.reversing = true;
                }
                toward(sprite, cel, 0)
            }
            CycleKind::StartReset => {
                if cel < last {
                    sprite.set_cel(cel + 1);
                    Progress::Stepped
                } else {
                    sprite.set_cel(0);
                    Progress::Done
                }
            }
            CycleKind::EndReset => {
                if cel > 0 {
                    sprite.set_cel(cel - 1);
                    Progress::Stepped
                } else {
                    sprite.set_cel(last);
                    Progress::Done
                }
            }
            CycleKind::CycleTo(goal) => toward(sprite, cel, goal.clamp(0, last)),
        }
    }
}

/// Moves one cel toward `goal`, finishing on arrival.
fn toward(sprite: &mut dyn Animated, cel: i16, goal: i16) -> Progress {
    if cel == goal {
        return Progress::Done;
    }
    let next = if goal > cel { cel + 1 } else { cel - 1 };
    sprite.set_cel(next);
    if next == goal {
        Progress::Done
    } else {
        Progress::Stepped
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::system::types::Point;

    #[derive(Debug, Default)]
    pub(crate) struct Dummy {
        pub cel: i16,
        pub cels: i16,
        pub speed: u32,
        pub position: Point,
        pub step: Point,
    }

    impl Animated for Dummy {
        fn cel(&self) -> i16 {
            self.cel
        }
        fn set_cel(&mut self, cel: i16) {
            self.cel = cel;
        }
        fn last_cel(&self) -> i16 {
            self.cels - 1
        }
        fn cycle_speed(&self) -> u32 {
            self.speed
        }
        fn position(&self) -> Point {
            self.position
        }
        fn set_position(&mut self, position: Point) {
            self.position = position;
        }
        fn move_speed(&self) -> u32 {
            self.speed
        }
        fn step_size(&self) -> Point {
            self.step
        }
    }

    fn sprite(cels: i16) -> Dummy {
        Dummy {
            cels,
            speed: 1,
            ..Dummy::default()
        }
    }

    fn target() -> AnimTarget {
        let mut plane = crate::system::plane::Plane::new();
        AnimTarget::Screen(plane.add(crate::system::plane::ScreenItem::new(
            crate::system::plane::ItemOwner::Interface,
            Default::default(),
            Point::default(),
            0,
        )))
    }

    fn run(kind: CycleKind, sprite: &mut Dummy) -> Vec<i16> {
        let mut cycler = Cycler::new(kind, target(), None);
        cycler.start(sprite);
        let mut cels = vec![sprite.cel];
        for _ in 0..32 {
            let progress = cycler.step(sprite);
            cels.push(sprite.cel);
            if progress == Progress::Done {
                return cels;
            }
        }
        panic!("cycle never finished: {cels:?}");
    }

    #[test]
    fn end_cyclers_stop_at_their_end_cel() {
        assert_eq!(run(CycleKind::EndForward, &mut sprite(4)), vec![0, 1, 2, 3]);
        assert_eq!(run(CycleKind::EndBack, &mut sprite(4)), vec![3, 2, 1, 0]);
        assert_eq!(
            run(CycleKind::EndForwardBackward, &mut sprite(3)),
            vec![0, 1, 2, 1, 0]
        );
    }

    #[test]
    fn reset_cyclers_snap_back() {
        assert_eq!(run(CycleKind::StartReset, &mut sprite(3)), vec![0, 1, 2, 0]);
        assert_eq!(run(CycleKind::EndReset, &mut sprite(3)), vec![2, 1, 0, 2]);
    }

    #[test]
    fn cycle_to_walks_in_either_direction() {
        let mut up = sprite(6);
        up.cel = 1;
        assert_eq!(run(CycleKind::CycleTo(4), &mut up), vec![1, 2, 3, 4]);

        let mut down = sprite(6);
        down.cel = 5;
        assert_eq!(run(CycleKind::CycleTo(3), &mut down), vec![5, 4, 3]);

        let mut clamped = sprite(3);
        assert_eq!(run(CycleKind::CycleTo(9), &mut clamped), vec![0, 1, 2]);
    }

    #[test]
    fn forward_loops_and_respects_speed() {
        let mut looping = sprite(2);
        looping.speed = 2;
        let mut cycler = Cycler::new(CycleKind::Forward, target(), None);
        cycler.start(&mut looping);

        let mut seen = Vec::new();
        for _ in 0..6 {
            assert_ne!(cycler.step(&mut looping), Progress::Done);
            seen.push(looping.cel);
        }
        assert_eq!(seen, vec![0, 1, 1, 0, 0, 1]);
    }
}
