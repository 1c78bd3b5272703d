use serde::{Deserialize, Serialize};

use crate::event::TimelineEvent;
use crate::timestamp::Timestamp;

/// The mutable, in-progress recording buffer.
///
/// Exactly one draft exists per recording subject and only the capture
/// pipeline appends to it. Events are kept non-decreasing by timestamp at all
/// times; `add_event` inserts at the binary-searched position and the
/// invariant is re-checked after every mutation rather than trusted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftTimeline {
    events: Vec<TimelineEvent>,
}

impl DraftTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event at its sorted position: O(log n) to find, O(n)
    /// worst-case to shift. Events with equal timestamps keep insertion
    /// order (the new event lands after existing equals).
    pub fn add_event(&mut self, event: TimelineEvent) {
        let idx = self
            .events
            .partition_point(|e| e.at.value() <= event.at.value());
        self.events.insert(idx, event);
        debug_assert!(self.is_sorted(), "draft unsorted after add_event");
    }

    /// True when events are non-decreasing by timestamp.
    pub fn is_sorted(&self) -> bool {
        self.events
            .windows(2)
            .all(|w| w[0].at.value() <= w[1].at.value())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// Timestamp of the latest event, if any.
    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.events.last().map(|e| e.at)
    }

    /// Discard all captured events, keeping the allocation.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Consume the draft, handing its backing storage to the caller.
    /// Used by `PublishedTimeline::from_draft`; after this the draft is gone
    /// and nothing can alias the buffer.
    pub(crate) fn into_events(self) -> Vec<TimelineEvent> {
        self.events
    }
}
