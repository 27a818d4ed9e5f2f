//! Linear undo/redo tape of whole-document snapshots.
//!
//! Every entry is a deep copy of the flowchart taken *after* the change it is
//! named for. Undo and redo never replay operations; they hand back a copy of
//! the snapshot at the new position and the editor swaps it in.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::{
    config::HistoryConfig,
    error::{EditorError, Result},
    ids::now_millis,
    model::Flowchart,
};

pub const INITIAL_LABEL: &str = "Empty Canvas";

/// An immutable history entry.
#[derive(Debug, Clone)]
pub struct Snapshot {
    label: String,
    timestamp: u64,
    state: Flowchart,
}

impl Snapshot {
    fn capture(label: impl Into<String>, state: &Flowchart) -> Self {
        Self {
            label: label.into(),
            timestamp: now_millis(),
            state: state.clone(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn state(&self) -> &Flowchart {
        &self.state
    }
}

#[derive(Debug, Clone)]
struct PendingCommit {
    label: String,
    due: Instant,
}

#[derive(Debug)]
pub struct History {
    entries: Vec<Snapshot>,
    index: usize,
    capacity: usize,
    debounce: Duration,
    restoring: bool,
    pending: Option<PendingCommit>,
}

impl History {
    pub fn new(config: &HistoryConfig, initial: &Flowchart) -> Self {
        Self {
            entries: vec![Snapshot::capture(INITIAL_LABEL, initial)],
            index: 0,
            capacity: config.capacity.max(1),
            debounce: config.debounce(),
            restoring: false,
            pending: None,
        }
    }

    /// Drops the whole tape and starts over from `state`.
    pub fn reset(&mut self, label: impl Into<String>, state: &Flowchart) {
        self.entries = vec![Snapshot::capture(label, state)];
        self.index = 0;
        self.pending = None;
    }

    /// Records `state` as the result of `label`. Anything that was undone is
    /// discarded. Returns false when recording is suspended by a restore.
    pub fn execute(&mut self, label: impl Into<String>, state: &Flowchart) -> bool {
        if self.restoring {
            return false;
        }
        // A pending debounced commit is covered by this snapshot.
        self.pending = None;
        self.push(label.into(), state);
        true
    }

    fn push(&mut self, label: String, state: &Flowchart) {
        self.entries.truncate(self.index + 1);
        debug!(%label, index = self.index + 1, "recording history entry");
        self.entries.push(Snapshot::capture(label, state));
        if self.entries.len() > self.capacity {
            self.entries.remove(0);
        } else {
            self.index += 1;
        }
    }

    /// Schedules a commit named `label` once edits pause for the debounce
    /// delay. Each call restarts the delay.
    pub fn execute_debounced(&mut self, label: impl Into<String>, now: Instant) {
        if self.restoring {
            return;
        }
        self.pending = Some(PendingCommit {
            label: label.into(),
            due: now + self.debounce,
        });
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Commits a pending debounced entry if its delay has elapsed.
    pub fn poll(&mut self, now: Instant, state: &Flowchart) -> bool {
        match &self.pending {
            Some(pending) if now >= pending.due => self.flush(state),
            _ => false,
        }
    }

    /// Commits a pending debounced entry right away.
    pub fn flush(&mut self, state: &Flowchart) -> bool {
        match self.pending.take() {
            Some(pending) if !self.restoring => {
                self.push(pending.label, state);
                true
            }
            _ => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Moves one step back and returns a deep copy of that snapshot.
    pub fn undo(&mut self) -> Option<Flowchart> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        Some(self.entries[self.index].state.clone())
    }

    /// Moves one step forward and returns a deep copy of that snapshot.
    pub fn redo(&mut self) -> Option<Flowchart> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        Some(self.entries[self.index].state.clone())
    }

    /// Jumps to any entry. Out-of-range steps leave the tape untouched.
    pub fn restore_to_step(&mut self, index: usize) -> Result<Flowchart> {
        let Some(entry) = self.entries.get(index) else {
            warn!(index, len = self.entries.len(), "restore to missing history step");
            return Err(EditorError::HistoryStep {
                index,
                len: self.entries.len(),
            });
        };
        let state = entry.state.clone();
        self.index = index;
        Ok(state)
    }

    /// Suspends recording while a snapshot is being applied.
    pub fn begin_restore(&mut self) {
        self.restoring = true;
    }

    pub fn end_restore(&mut self) {
        self.restoring = false;
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn current(&self) -> &Snapshot {
        &self.entries[self.index]
    }

    pub fn current_label(&self) -> &str {
        self.current().label()
    }

    /// Every entry, oldest first, flagged when it is the active one.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &Snapshot, bool)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(move |(i, s)| (i, s, i == self.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(name: &str) -> Flowchart {
        Flowchart::new(name)
    }

    fn history(capacity: usize) -> History {
        let config = HistoryConfig {
            capacity,
            debounce_ms: 1000,
        };
        History::new(&config, &chart("initial"))
    }

    #[test]
    fn test_initial_floor() {
        let mut h = history(50);
        assert_eq!(h.len(), 1);
        assert_eq!(h.current_label(), INITIAL_LABEL);
        assert!(!h.can_undo());
        assert!(h.undo().is_none());
    }

    #[test]
    fn test_undo_redo_walks_the_tape() {
        let mut h = history(50);
        h.execute("one", &chart("1"));
        h.execute("two", &chart("2"));
        assert_eq!(h.undo().unwrap().name, "1");
        assert_eq!(h.undo().unwrap().name, "initial");
        assert!(h.undo().is_none());
        assert_eq!(h.redo().unwrap().name, "1");
        assert_eq!(h.redo().unwrap().name, "2");
        assert!(h.redo().is_none());
    }

    #[test]
    fn test_new_action_truncates_future() {
        let mut h = history(50);
        h.execute("one", &chart("1"));
        h.execute("two", &chart("2"));
        h.undo();
        h.execute("three", &chart("3"));
        assert!(!h.can_redo());
        assert_eq!(h.len(), 3);
        assert_eq!(h.current_label(), "three");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut h = history(3);
        for i in 0..5 {
            h.execute(format!("edit {i}"), &chart(&i.to_string()));
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.index(), 2);
        let labels: Vec<_> = h.entries().map(|(_, s, _)| s.label().to_string()).collect();
        assert_eq!(labels, ["edit 2", "edit 3", "edit 4"]);
    }

    #[test]
    fn test_restoring_blocks_recording() {
        let mut h = history(50);
        h.begin_restore();
        assert!(!h.execute("nested", &chart("x")));
        h.execute_debounced("typed", Instant::now());
        assert!(!h.has_pending());
        h.end_restore();
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_debounce_coalesces_until_quiet() {
        let mut h = history(50);
        let t0 = Instant::now();
        h.execute_debounced("Edit node property", t0);
        h.execute_debounced("Edit node property", t0 + Duration::from_millis(600));
        assert!(!h.poll(t0 + Duration::from_millis(1200), &chart("typing")));
        assert!(h.poll(t0 + Duration::from_millis(1700), &chart("typed")));
        assert_eq!(h.len(), 2);
        assert_eq!(h.current().state().name, "typed");
        assert!(!h.has_pending());
    }

    #[test]
    fn test_restore_to_step_bounds() {
        let mut h = history(50);
        h.execute("one", &chart("1"));
        assert!(matches!(
            h.restore_to_step(5),
            Err(EditorError::HistoryStep { index: 5, len: 2 })
        ));
        assert_eq!(h.index(), 1);
        assert_eq!(h.restore_to_step(0).unwrap().name, "initial");
        assert_eq!(h.index(), 0);
    }
}
