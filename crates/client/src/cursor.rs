// Cursor tracker: oldest/newest timestamp watermarks over the transcript.
//
// Bounds only ever move outward. Unparsable timestamps are never observed, so
// a malformed message cannot wedge a cursor.

use chatsync_common::{Message, Timestamp};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorTracker {
    oldest: Option<Timestamp>,
    newest: Option<Timestamp>,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn oldest(&self) -> Option<&Timestamp> {
        self.oldest.as_ref()
    }

    pub fn newest(&self) -> Option<&Timestamp> {
        self.newest.as_ref()
    }

    /// Widen the bounds to cover a batch sorted oldest-first.
    ///
    /// Uses the first and last comparable timestamps of the batch. Observing
    /// the same batch twice is a no-op. Returns whether either bound moved.
    pub fn observe(&mut self, batch: &[Message]) -> bool {
        let first = batch.iter().map(|m| &m.timestamp).find(|ts| ts.is_comparable());
        let last = batch.iter().rev().map(|m| &m.timestamp).find(|ts| ts.is_comparable());

        let mut moved = false;
        if let Some(first) = first {
            moved |= lower(&mut self.oldest, first);
        }
        if let Some(last) = last {
            moved |= raise(&mut self.newest, last);
        }
        moved
    }

    /// Widen the bounds to cover a single timestamp.
    pub fn observe_one(&mut self, timestamp: &Timestamp) -> bool {
        if !timestamp.is_comparable() {
            return false;
        }
        let lowered = lower(&mut self.oldest, timestamp);
        let raised = raise(&mut self.newest, timestamp);
        lowered || raised
    }

    pub fn reset(&mut self) {
        self.oldest = None;
        self.newest = None;
    }
}

fn lower(bound: &mut Option<Timestamp>, candidate: &Timestamp) -> bool {
    if let Some(current) = bound.as_ref() {
        if !candidate.is_before(current) {
            return false;
        }
    }
    *bound = Some(candidate.clone());
    true
}

fn raise(bound: &mut Option<Timestamp>, candidate: &Timestamp) -> bool {
    if let Some(current) = bound.as_ref() {
        if !candidate.is_after(current) {
            return false;
        }
    }
    *bound = Some(candidate.clone());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(ts: &str) -> Message {
        Message::new("s", format!("at {ts}"), Timestamp::new(ts))
    }

    #[test]
    fn first_observation_sets_both_bounds() {
        let mut cursors = CursorTracker::new();
        assert!(cursors.observe(&[msg("2024-01-01 10:00:00"), msg("2024-01-01 10:05:00")]));
        assert_eq!(cursors.oldest().map(Timestamp::as_str), Some("2024-01-01 10:00:00"));
        assert_eq!(cursors.newest().map(Timestamp::as_str), Some("2024-01-01 10:05:00"));
    }

    #[test]
    fn bounds_only_move_outward() {
        let mut cursors = CursorTracker::new();
        cursors.observe(&[msg("2024-01-01 10:00:00"), msg("2024-01-01 10:05:00")]);

        // Strictly inside the current window: nothing moves.
        assert!(!cursors.observe(&[msg("2024-01-01 10:01:00"), msg("2024-01-01 10:02:00")]));
        assert_eq!(cursors.oldest().map(Timestamp::as_str), Some("2024-01-01 10:00:00"));

        cursors.observe(&[msg("2024-01-01 09:00:00")]);
        assert_eq!(cursors.oldest().map(Timestamp::as_str), Some("2024-01-01 09:00:00"));
        assert_eq!(cursors.newest().map(Timestamp::as_str), Some("2024-01-01 10:05:00"));
    }

    #[test]
    fn observing_same_batch_twice_is_idempotent() {
        let batch = [msg("2024-01-01 10:00:00"), msg("2024-01-01 10:05:00")];
        let mut cursors = CursorTracker::new();
        assert!(cursors.observe(&batch));
        let snapshot = cursors.clone();
        assert!(!cursors.observe(&batch));
        assert_eq!(cursors, snapshot);
    }

    #[test]
    fn unparsable_timestamps_are_skipped() {
        let mut cursors = CursorTracker::new();
        let batch = [msg("garbage"), msg("2024-01-01 10:00:00"), msg("also garbage")];
        cursors.observe(&batch);
        assert_eq!(cursors.oldest().map(Timestamp::as_str), Some("2024-01-01 10:00:00"));
        assert_eq!(cursors.newest().map(Timestamp::as_str), Some("2024-01-01 10:00:00"));

        assert!(!cursors.observe_one(&Timestamp::new("nope")));
    }

    #[test]
    fn empty_batch_changes_nothing() {
        let mut cursors = CursorTracker::new();
        assert!(!cursors.observe(&[]));
        assert_eq!(cursors.oldest(), None);
        assert_eq!(cursors.newest(), None);
    }

    #[test]
    fn reset_clears_bounds() {
        let mut cursors = CursorTracker::new();
        cursors.observe_one(&Timestamp::new("2024-01-01 10:00:00"));
        cursors.reset();
        assert_eq!(cursors, CursorTracker::default());
    }
}
