use serde::{Deserialize, Serialize};

use crate::draft::DraftTimeline;
use crate::event::TimelineEvent;
use crate::timestamp::Timestamp;

/// An immutable, finalized recording.
///
/// Produced exactly once from a [`DraftTimeline`] by ownership transfer: the
/// draft's backing `Vec` is moved, never copied element-by-element, and the
/// draft ceases to exist. No `&mut` accessor is provided anywhere on this
/// type, so a published buffer can be shared (behind `Arc`) by any number of
/// replay agents without aliasing a mutable buffer. All queries below are
/// read-only and allocation-free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedTimeline {
    events: Vec<TimelineEvent>,
}

impl PublishedTimeline {
    /// Consume a draft into its published form. Zero-copy: the storage is
    /// transferred.
    pub fn from_draft(draft: DraftTimeline) -> Self {
        debug_assert!(draft.is_sorted(), "draft must be sorted at publish");
        PublishedTimeline {
            events: draft.into_events(),
        }
    }

    /// Rebuild from an already-sorted event list (decompression and the wire
    /// decoder). Not public: external callers must go through a draft.
    pub(crate) fn from_sorted_events(events: Vec<TimelineEvent>) -> Self {
        debug_assert!(
            events.windows(2).all(|w| w[0].at.value() <= w[1].at.value()),
            "published timeline built from unsorted events"
        );
        PublishedTimeline { events }
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

    /// Events with `start <= at < end`, lazily.
    ///
    /// When `start > end` the interval crosses the cycle boundary and the
    /// result is empty: wraparound is the caller's responsibility, handled by
    /// issuing two queries (`[start, CYCLE_LENGTH)` and `[0, end)`).
    pub fn events_in_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> impl Iterator<Item = &TimelineEvent> {
        let lo = self.events.partition_point(|e| e.at.value() < start.value());
        let hi = self.events.partition_point(|e| e.at.value() < end.value());
        self.events[lo..hi.max(lo)].iter()
    }

    /// First event strictly after `at`, if any.
    pub fn next_event_after(&self, at: Timestamp) -> Option<&TimelineEvent> {
        let idx = self.events.partition_point(|e| e.at.value() <= at.value());
        self.events.get(idx)
    }

    /// Last event strictly before `at`, if any.
    pub fn prev_event_before(&self, at: Timestamp) -> Option<&TimelineEvent> {
        let idx = self.events.partition_point(|e| e.at.value() < at.value());
        idx.checked_sub(1).and_then(|i| self.events.get(i))
    }

    /// Raw index view with both bounds clamped to the event count.
    pub fn slice(&self, start_idx: usize, end_idx: usize) -> &[TimelineEvent] {
        let end = end_idx.min(self.events.len());
        let start = start_idx.min(end);
        &self.events[start..end]
    }
}
