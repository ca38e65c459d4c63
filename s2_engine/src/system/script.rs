use serde::Serialize;

use super::arena::{Arena, Id};
use super::track::TrackId;

pub const TICKS_PER_SECOND: u32 = 60;

/// State value that parks a script until it is cued.
pub const HALT: i32 = -1;

pub type ScriptId = Id<Script>;

/// Object whose `change_state` receives a script's transitions. Room-side
/// targets carry a tag naming which of the owner's scripts fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "tag", rename_all = "snake_case")]
pub enum ScriptTarget {
    Room(u16),
    SubRoom(u16),
    GlobalRoom(u16),
    Interface(u16),
    Track(TrackId),
}

/// Resumable state machine advanced by the tick pump.
#[derive(Debug, Clone)]
pub struct Script {
    label: String,
    target: ScriptTarget,
    state: i32,
    cycles: u32,
    ticks: u32,
    parked: bool,
}

impl Script {
    fn is_waiting(&self) -> bool {
        self.parked || self.cycles > 0 || self.ticks > 0
    }
}

/// Owns every live script. Handles are generation counted, so disposing a
/// script (even from inside its own transition) makes all copies of its
/// handle stale at once.
#[derive(Debug, Default)]
pub struct ScriptRunner {
    scripts: Arena<Script>,
}

impl ScriptRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a script whose first transition delivers state 0 on the next
    /// tick.
    pub fn spawn(&mut self, label: impl Into<String>, target: ScriptTarget) -> ScriptId {
        self.spawn_at(label, target, 0)
    }

    /// Creates a script whose first transition delivers `state`.
    pub fn spawn_at(
        &mut self,
        label: impl Into<String>,
        target: ScriptTarget,
        state: i32,
    ) -> ScriptId {
        self.scripts.insert(Script {
            label: label.into(),
            target,
            state: state - 1,
            cycles: 0,
            ticks: 0,
            parked: false,
        })
    }

    pub fn dispose(&mut self, id: ScriptId) -> bool {
        self.scripts.remove(id).is_some()
    }

    /// Disposes every script aimed at a matching target.
    pub fn dispose_where(&mut self, mut matches: impl FnMut(ScriptTarget) -> bool) -> usize {
        let doomed: Vec<ScriptId> = self
            .scripts
            .iter()
            .filter(|(_, script)| matches(script.target))
            .map(|(id, _)| id)
            .collect();
        for id in &doomed {
            self.scripts.remove(*id);
        }
        doomed.len()
    }

    pub fn is_alive(&self, id: ScriptId) -> bool {
        self.scripts.contains(id)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn label(&self, id: ScriptId) -> Option<&str> {
        self.scripts.get(id).map(|script| script.label.as_str())
    }

    pub fn target(&self, id: ScriptId) -> Option<ScriptTarget> {
        self.scripts.get(id).map(|script| script.target)
    }

    /// State delivered by the most recent transition.
    pub fn state(&self, id: ScriptId) -> Option<i32> {
        self.scripts.get(id).map(|script| script.state)
    }

    pub fn is_parked(&self, id: ScriptId) -> bool {
        self.scripts.get(id).is_some_and(|script| script.parked)
    }

    /// The next transition delivers `state + 1`. [`HALT`] parks the script
    /// until [`ScriptRunner::cue`], which then resumes at state 0.
    pub fn set_state(&mut self, id: ScriptId, state: i32) {
        if let Some(script) = self.scripts.get_mut(id) {
            script.state = state;
            if state == HALT {
                script.parked = true;
            }
        }
    }

    pub fn set_cycles(&mut self, id: ScriptId, cycles: u32) {
        if let Some(script) = self.scripts.get_mut(id) {
            script.cycles = cycles;
            script.ticks = 0;
        }
    }

    pub fn set_ticks(&mut self, id: ScriptId, ticks: u32) {
        if let Some(script) = self.scripts.get_mut(id) {
            script.ticks = ticks;
            script.cycles = 0;
        }
    }

    pub fn set_seconds(&mut self, id: ScriptId, seconds: u32) {
        self.set_ticks(id, seconds.saturating_mul(TICKS_PER_SECOND));
    }

    /// Holds the script until something cues it, such as a finishing cycler.
    pub fn park(&mut self, id: ScriptId) {
        if let Some(script) = self.scripts.get_mut(id) {
            script.parked = true;
        }
    }

    /// Clears any wait so the script transitions on the next tick.
    pub fn cue(&mut self, id: ScriptId) -> bool {
        match self.scripts.get_mut(id) {
            Some(script) => {
                script.parked = false;
                script.cycles = 0;
                script.ticks = 0;
                true
            }
            None => false,
        }
    }

    /// Counts down every running wait by one tick and returns the scripts
    /// that are due. The list is a snapshot; callers advance each entry
    /// through [`ScriptRunner::advance`], which skips entries made stale by
    /// earlier dispatches.
    pub fn collect_due(&mut self) -> Vec<ScriptId> {
        let mut due = Vec::new();
        for (id, script) in self.scripts.iter_mut() {
            if script.parked {
                continue;
            }
            if script.cycles > 0 {
                script.cycles -= 1;
            } else if script.ticks > 0 {
                script.ticks -= 1;
            }
            if script.cycles == 0 && script.ticks == 0 {
                due.push(id);
            }
        }
        due
    }

    /// Performs one transition, returning the target and the new state.
    pub fn advance(&mut self, id: ScriptId) -> Option<(ScriptTarget, i32)> {
        let script = self.scripts.get_mut(id)?;
        if script.is_waiting() {
            return None;
        }
        script.state += 1;
        Some((script.target, script.state))
    }

    pub fn ids(&self) -> Vec<ScriptId> {
        self.scripts.ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_tick(runner: &mut ScriptRunner) -> Vec<(ScriptId, i32)> {
        runner
            .collect_due()
            .into_iter()
            .filter_map(|id| runner.advance(id).map(|(_, state)| (id, state)))
            .collect()
    }

    #[test]
    fn idle_script_advances_once_per_tick() {
        let mut runner = ScriptRunner::new();
        let id = runner.spawn("idle", ScriptTarget::Room(0));
        assert_eq!(run_tick(&mut runner), vec![(id, 0)]);
        assert_eq!(run_tick(&mut runner), vec![(id, 1)]);
        assert_eq!(run_tick(&mut runner), vec![(id, 2)]);
    }

    #[test]
    fn cycles_and_seconds_delay_the_next_transition() {
        let mut runner = ScriptRunner::new();
        let id = runner.spawn("wait", ScriptTarget::Room(0));
        run_tick(&mut runner);
        runner.set_cycles(id, 2);
        assert!(run_tick(&mut runner).is_empty());
        assert_eq!(run_tick(&mut runner), vec![(id, 1)]);

        runner.set_seconds(id, 1);
        for _ in 0..59 {
            assert!(run_tick(&mut runner).is_empty());
        }
        assert_eq!(run_tick(&mut runner), vec![(id, 2)]);
    }

    #[test]
    fn set_state_picks_the_next_delivered_state() {
        let mut runner = ScriptRunner::new();
        let id = runner.spawn("jump", ScriptTarget::Room(0));
        run_tick(&mut runner);
        runner.set_state(id, 2);
        assert_eq!(run_tick(&mut runner), vec![(id, 3)]);
    }

    #[test]
    fn halt_parks_until_cued_and_resumes_at_zero() {
        let mut runner = ScriptRunner::new();
        let id = runner.spawn("halt", ScriptTarget::Room(0));
        run_tick(&mut runner);
        runner.set_state(id, HALT);
        runner.set_cycles(id, 1);
        for _ in 0..5 {
            assert!(run_tick(&mut runner).is_empty());
        }
        assert!(runner.cue(id));
        assert_eq!(run_tick(&mut runner), vec![(id, 0)]);
    }

    #[test]
    fn disposal_mid_dispatch_skips_stale_entries() {
        let mut runner = ScriptRunner::new();
        let first = runner.spawn("first", ScriptTarget::Room(1));
        let second = runner.spawn("second", ScriptTarget::Room(2));

        let due = runner.collect_due();
        assert_eq!(due, vec![first, second]);
        assert!(runner.advance(first).is_some());
        runner.dispose(second);
        assert!(runner.advance(second).is_none());

        let replacement = runner.spawn("replacement", ScriptTarget::Room(3));
        assert_eq!(replacement.index(), second.index());
        assert!(runner.advance(second).is_none());
        assert!(!runner.is_alive(second));
    }

    #[test]
    fn dispose_where_matches_targets() {
        let mut runner = ScriptRunner::new();
        runner.spawn("a", ScriptTarget::SubRoom(1));
        runner.spawn("b", ScriptTarget::SubRoom(2));
        let kept = runner.spawn("c", ScriptTarget::Interface(0));
        assert_eq!(
            runner.dispose_where(|target| matches!(target, ScriptTarget::SubRoom(_))),
            2
        );
        assert_eq!(runner.ids(), vec![kept]);
    }
}
