//! Undo/redo history of serialized scene snapshots.
//!
//! `past` holds committed snapshots oldest to newest; its last entry is the
//! present state. Undo moves the present onto `future` and exposes the entry
//! before it; redo moves it back. Both sequences are capped at
//! `max_entries`, dropping the oldest on overflow.
//!
//! Snapshots must be saved after the scene mutation they describe, never
//! before, or undo restores the wrong state.

pub mod store;

pub use store::HistoryStore;

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[cfg(target_arch = "wasm32")]
use web_time::{SystemTime, UNIX_EPOCH};
#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};

/// One committed scene state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Opaque serialized scene.
    pub snapshot: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

impl HistoryEntry {
    pub fn new(snapshot: impl Into<String>) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            snapshot: snapshot.into(),
            timestamp_ms,
        }
    }
}

/// Bounded linear undo/redo history.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    past: VecDeque<HistoryEntry>,
    future: VecDeque<HistoryEntry>,
    max_entries: usize,
}

impl HistoryStack {
    /// A history keeping at most `max_entries` per direction (at least one).
    pub fn new(max_entries: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: VecDeque::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Rebuild a history from persisted entries, keeping the newest.
    pub fn from_entries(entries: Vec<HistoryEntry>, max_entries: usize) -> Self {
        let mut history = Self::new(max_entries);
        history.past = entries.into();
        trim_front(&mut history.past, history.max_entries);
        history
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn past(&self) -> &VecDeque<HistoryEntry> {
        &self.past
    }

    pub fn future(&self) -> &VecDeque<HistoryEntry> {
        &self.future
    }

    /// The present state, if anything has been saved.
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.past.back()
    }

    /// Commit a new present state. Any redo branch is discarded.
    pub fn save_state(&mut self, snapshot: impl Into<String>) {
        self.past.push_back(HistoryEntry::new(snapshot));
        trim_front(&mut self.past, self.max_entries);
        self.future.clear();
    }

    /// The state [`undo`](Self::undo) would restore, without moving.
    pub fn peek_undo(&self) -> Option<&HistoryEntry> {
        if !self.can_undo() {
            return None;
        }
        self.past.get(self.past.len() - 2)
    }

    /// The state [`redo`](Self::redo) would restore, without moving.
    pub fn peek_redo(&self) -> Option<&HistoryEntry> {
        self.future.back()
    }

    /// Step back. Returns the state to restore, or `None` if there is nothing earlier.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if !self.can_undo() {
            return None;
        }
        let present = self.past.pop_back()?;
        self.future.push_back(present);
        trim_front(&mut self.future, self.max_entries);
        self.past.back()
    }

    /// Step forward again. Returns the state to restore, or `None` if nothing was undone.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        let next = self.future.pop_back()?;
        self.past.push_back(next);
        trim_front(&mut self.past, self.max_entries);
        self.past.back()
    }

    pub fn can_undo(&self) -> bool {
        self.past.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

fn trim_front(entries: &mut VecDeque<HistoryEntry>, max: usize) {
    while entries.len() > max {
        entries.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(n: usize) -> String {
        format!("state-{n}")
    }

    #[test]
    fn test_empty_history_is_noop() {
        let mut history = HistoryStack::new(10);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
        assert!(history.current().is_none());
    }

    #[test]
    fn test_single_state_cannot_undo() {
        let mut history = HistoryStack::new(10);
        history.save_state(snapshot(0));
        assert!(!history.can_undo());
        assert!(history.undo().is_none());
        assert_eq!(history.current().map(|e| e.snapshot.as_str()), Some("state-0"));
    }

    #[test]
    fn test_undo_redo() {
        let mut history = HistoryStack::new(10);
        for i in 0..3 {
            history.save_state(snapshot(i));
        }

        assert_eq!(history.undo().map(|e| e.snapshot.clone()), Some(snapshot(1)));
        assert_eq!(history.undo().map(|e| e.snapshot.clone()), Some(snapshot(0)));
        assert!(history.undo().is_none());
        assert!(history.can_redo());

        assert_eq!(history.redo().map(|e| e.snapshot.clone()), Some(snapshot(1)));
        assert_eq!(history.redo().map(|e| e.snapshot.clone()), Some(snapshot(2)));
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_undo_then_redo_restores_state() {
        for saves in 2..8 {
            let mut history = HistoryStack::new(5);
            for i in 0..saves {
                history.save_state(snapshot(i));
            }
            let before = history.current().cloned();
            history.undo();
            history.redo();
            assert_eq!(history.current().cloned(), before);
        }
    }

    #[test]
    fn test_peek_matches_move() {
        let mut history = HistoryStack::new(10);
        assert!(history.peek_undo().is_none());
        for i in 0..3 {
            history.save_state(snapshot(i));
        }
        assert!(history.peek_redo().is_none());

        let peeked = history.peek_undo().cloned();
        assert_eq!(peeked.as_ref().map(|e| e.snapshot.as_str()), Some("state-1"));
        assert_eq!(history.past().len(), 3);
        assert_eq!(history.undo().cloned(), peeked);

        let peeked = history.peek_redo().cloned();
        assert_eq!(peeked.as_ref().map(|e| e.snapshot.as_str()), Some("state-2"));
        assert_eq!(history.redo().cloned(), peeked);
    }

    #[test]
    fn test_save_clears_redo_branch() {
        let mut history = HistoryStack::new(10);
        history.save_state(snapshot(0));
        history.save_state(snapshot(1));
        history.undo();
        assert!(history.can_redo());

        history.save_state(snapshot(2));
        assert!(!history.can_redo());
        assert_eq!(history.past().len(), 2);
    }

    #[test]
    fn test_bounded_past() {
        let max = 5;
        let saves = 12;
        let mut history = HistoryStack::new(max);
        for i in 1..=saves {
            history.save_state(snapshot(i));
        }
        assert_eq!(history.past().len(), max);
        assert_eq!(history.past()[0].snapshot, snapshot(saves - max + 1));
        assert_eq!(history.current().map(|e| e.snapshot.clone()), Some(snapshot(saves)));
    }

    #[test]
    fn test_bounded_future() {
        let mut history = HistoryStack::new(3);
        for i in 0..3 {
            history.save_state(snapshot(i));
        }
        while history.undo().is_some() {}
        assert_eq!(history.future().len(), 2);
        assert_eq!(history.past().len(), 1);
    }

    #[test]
    fn test_from_entries_keeps_newest() {
        let entries: Vec<HistoryEntry> = (0..6).map(|i| HistoryEntry::new(snapshot(i))).collect();
        let history = HistoryStack::from_entries(entries, 4);
        assert_eq!(history.past().len(), 4);
        assert_eq!(history.past()[0].snapshot, snapshot(2));
        assert_eq!(history.current().map(|e| e.snapshot.clone()), Some(snapshot(5)));
    }

    #[test]
    fn test_zero_capacity_keeps_present() {
        let mut history = HistoryStack::new(0);
        history.save_state(snapshot(0));
        history.save_state(snapshot(1));
        assert_eq!(history.max_entries(), 1);
        assert_eq!(history.current().map(|e| e.snapshot.clone()), Some(snapshot(1)));
    }
}
