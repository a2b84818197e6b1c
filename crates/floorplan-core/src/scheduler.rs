//! Deferred task queue.
//!
//! Tasks are `(due, action)` pairs held in a min-heap on due time. Nothing
//! runs on its own: a driver calls [`Scheduler::poll_due`] with the current
//! time and executes whatever is returned. Tasks due at the same instant come
//! out in the order they were scheduled.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};
#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

/// Stand-in for "never" when a delay does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `now + delay`, saturating to a far-future instant instead of overflowing.
pub fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Handle to a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Debug)]
struct Entry<A> {
    due: Instant,
    id: TaskId,
    action: A,
}

impl<A> PartialEq for Entry<A> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.id == other.id
    }
}

impl<A> Eq for Entry<A> {}

impl<A> PartialOrd for Entry<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A> Ord for Entry<A> {
    // Reversed: BinaryHeap is a max-heap, we want earliest (due, id) first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.due.cmp(&self.due).then_with(|| other.id.cmp(&self.id))
    }
}

/// Min-heap of pending actions keyed by due time.
#[derive(Debug)]
pub struct Scheduler<A> {
    queue: BinaryHeap<Entry<A>>,
    next_id: u64,
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Scheduler<A> {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            next_id: 0,
        }
    }

    /// Queue `action` to run once `due` has passed.
    pub fn schedule_at(&mut self, due: Instant, action: A) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.queue.push(Entry { due, id, action });
        id
    }

    pub fn schedule_after(&mut self, now: Instant, delay: Duration, action: A) -> TaskId {
        self.schedule_at(deadline_after(now, delay), action)
    }

    /// Remove a pending task. Returns false if it already ran or never existed.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.queue.len();
        let entries = std::mem::take(&mut self.queue).into_vec();
        self.queue = entries.into_iter().filter(|e| e.id != id).collect();
        self.queue.len() != before
    }

    /// Remove and return every action due at or before `now`, earliest first.
    pub fn poll_due(&mut self, now: Instant) -> Vec<A> {
        let mut due = Vec::new();
        while self.queue.peek().is_some_and(|e| e.due <= now) {
            if let Some(entry) = self.queue.pop() {
                due.push(entry.action);
            }
        }
        due
    }

    /// Due time of the earliest pending task.
    pub fn next_due(&self) -> Option<Instant> {
        self.queue.peek().map(|e| e.due)
    }

    /// True if any pending task matches `pred`.
    pub fn any_pending(&self, mut pred: impl FnMut(&A) -> bool) -> bool {
        self.queue.iter().any(|e| pred(&e.action))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_poll_in_due_order() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule_at(t0 + ms(30), "c");
        scheduler.schedule_at(t0 + ms(10), "a");
        scheduler.schedule_at(t0 + ms(20), "b");

        assert_eq!(scheduler.next_due(), Some(t0 + ms(10)));
        assert!(scheduler.poll_due(t0).is_empty());
        assert_eq!(scheduler.poll_due(t0 + ms(25)), vec!["a", "b"]);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.poll_due(t0 + ms(30)), vec!["c"]);
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.next_due(), None);
    }

    #[test]
    fn test_fifo_for_equal_due() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        for i in 0..5 {
            scheduler.schedule_at(t0, i);
        }
        assert_eq!(scheduler.poll_due(t0), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_cancel() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        let keep = scheduler.schedule_after(t0, ms(5), "keep");
        let dropped = scheduler.schedule_after(t0, ms(5), "drop");

        assert!(scheduler.cancel(dropped));
        assert!(!scheduler.cancel(dropped));
        assert_ne!(keep, dropped);
        assert_eq!(scheduler.poll_due(t0 + ms(5)), vec!["keep"]);
        assert!(!scheduler.cancel(keep));
    }

    #[test]
    fn test_huge_delay_saturates() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule_after(t0, Duration::MAX, "never");
        scheduler.schedule_after(t0, Duration::from_millis(u64::MAX), "never");

        assert_eq!(scheduler.len(), 2);
        assert!(scheduler.next_due().is_some_and(|due| due > t0));
        assert!(scheduler.poll_due(t0 + Duration::from_secs(86_400)).is_empty());
        assert_eq!(deadline_after(t0, ms(5)), t0 + ms(5));
    }

    #[test]
    fn test_any_pending_and_clear() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule_at(t0, 1);
        scheduler.schedule_at(t0, 2);
        assert!(scheduler.any_pending(|a| *a == 2));
        assert!(!scheduler.any_pending(|a| *a == 3));

        scheduler.clear();
        assert!(scheduler.is_empty());
        assert!(scheduler.poll_due(t0 + ms(1000)).is_empty());
    }
}
