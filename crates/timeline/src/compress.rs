//! Storage compression for long-lived timelines.
//!
//! Intent capture already replaced absolute transforms with (direction,
//! timestamp) intent, so the compact form only has to pack what is left: each
//! movement sample becomes a direction byte plus a time delta from the
//! previous retained sample, quantized to [`TIME_QUANTUM`] and stored in a
//! `u16`. The direction is itself the delta-encoded position — replaying
//! base + Σ dir·dt reconstructs the path. Ability and death events are
//! retained verbatim; only intermediate movement samples may be dropped when
//! the retention cap is exceeded.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::event::{EventKind, MoveDir, TimelineEvent};
use crate::published::PublishedTimeline;
use crate::timestamp::Timestamp;

/// Time quantization step: 1/20th of a time-unit. Decompressed timestamps
/// differ from the originals by at most half of this.
pub const TIME_QUANTUM: f32 = 0.05;

/// Maximum movement samples retained by compression. Ability and death
/// events never count against this.
pub const MAX_RETAINED_MOVES: usize = 256;

/// One packed movement sample: quantized time delta from the previous
/// retained sample, plus the held direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
struct PackedMove {
    dt_q: u16,
    dir: MoveDir,
}

/// The compact storage form of a [`PublishedTimeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct CompressedTimeline {
    /// First movement timestamp, in quanta.
    base_q: u32,
    /// Movement samples, delta-encoded from `base_q` onward. The first
    /// entry's `dt_q` is zero.
    moves: Vec<PackedMove>,
    /// Ability and death events, verbatim and sorted.
    specials: Vec<TimelineEvent>,
}

impl CompressedTimeline {
    /// Retained movement samples plus verbatim specials.
    pub fn len(&self) -> usize {
        self.moves.len() + self.specials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty() && self.specials.is_empty()
    }

    /// Reconstruct a timeline observably equivalent to the original:
    /// movement timestamps within the quantization error, ability and death
    /// events identical. The result is sorted by construction and re-checked.
    pub fn decompress(&self) -> PublishedTimeline {
        let mut movements = Vec::with_capacity(self.moves.len());
        let mut q = self.base_q;
        for (i, packed) in self.moves.iter().enumerate() {
            if i > 0 {
                q += u32::from(packed.dt_q);
            }
            movements.push(TimelineEvent::new(
                Timestamp::wrap(q as f32 * TIME_QUANTUM),
                EventKind::Movement(packed.dir),
            ));
        }

        // Merge the two sorted runs; movement wins ties so a cast recorded at
        // the same instant still sees the latest direction during replay.
        let mut events = Vec::with_capacity(movements.len() + self.specials.len());
        let (mut mi, mut si) = (0, 0);
        while mi < movements.len() && si < self.specials.len() {
            if movements[mi].at.value() <= self.specials[si].at.value() {
                events.push(movements[mi]);
                mi += 1;
            } else {
                events.push(self.specials[si]);
                si += 1;
            }
        }
        events.extend_from_slice(&movements[mi..]);
        events.extend_from_slice(&self.specials[si..]);

        PublishedTimeline::from_sorted_events(events)
    }
}

/// Compress a published timeline into its compact storage form.
pub fn compress(timeline: &PublishedTimeline) -> CompressedTimeline {
    let mut samples: Vec<(Timestamp, MoveDir)> = Vec::new();
    let mut specials: Vec<TimelineEvent> = Vec::new();
    for event in timeline.events() {
        match event.kind {
            EventKind::Movement(dir) => samples.push((event.at, dir)),
            _ => specials.push(*event),
        }
    }

    drop_least_informative(&mut samples, MAX_RETAINED_MOVES);

    let base_q = samples
        .first()
        .map(|(at, _)| quantize(at.value()))
        .unwrap_or(0);
    let mut prev_q = base_q;
    let moves = samples
        .iter()
        .map(|(at, dir)| {
            let q = quantize(at.value());
            let dt_q = (q - prev_q) as u16;
            prev_q = q;
            PackedMove { dt_q, dir: *dir }
        })
        .collect();

    CompressedTimeline {
        base_q,
        moves,
        specials,
    }
}

fn quantize(value: f32) -> u32 {
    (value / TIME_QUANTUM).round() as u32
}

/// Trim `samples` down to `cap` entries by repeatedly dropping the interior
/// sample with the shortest dwell (time since its predecessor) — the one
/// whose removal perturbs the reconstructed path the least. The first and
/// last samples are always kept.
fn drop_least_informative(samples: &mut Vec<(Timestamp, MoveDir)>, cap: usize) {
    while samples.len() > cap.max(2) {
        let mut victim = 1;
        let mut shortest = f32::MAX;
        for i in 1..samples.len() - 1 {
            let dwell = samples[i].0.value() - samples[i - 1].0.value();
            if dwell < shortest {
                shortest = dwell;
                victim = i;
            }
        }
        samples.remove(victim);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::DraftTimeline;
    use crate::event::AbilityId;

    fn publish(events: Vec<(f32, EventKind)>) -> PublishedTimeline {
        let mut draft = DraftTimeline::new();
        for (at, kind) in events {
            draft.add_event(TimelineEvent::new(Timestamp::new(at), kind));
        }
        PublishedTimeline::from_draft(draft)
    }

    fn cast(id: u16) -> EventKind {
        EventKind::AbilityCast {
            ability: AbilityId(id),
            target: None,
        }
    }

    #[test]
    fn test_round_trip_within_quantization_error() {
        let original = publish(vec![
            (0.0, EventKind::Movement(MoveDir::North)),
            (5.013, EventKind::Movement(MoveDir::East)),
            (7.0, cast(3)),
            (10.48, EventKind::Movement(MoveDir::None)),
            (12.0, EventKind::Death),
        ]);
        let restored = compress(&original).decompress();

        assert_eq!(restored.len(), original.len());
        for (a, b) in original.events().iter().zip(restored.events()) {
            assert!(
                (a.at.value() - b.at.value()).abs() <= TIME_QUANTUM / 2.0 + 1e-5,
                "timestamp drifted past quantization error: {} vs {}",
                a.at.value(),
                b.at.value()
            );
        }
    }

    #[test]
    fn test_specials_survive_verbatim() {
        let original = publish(vec![
            (1.0, EventKind::Movement(MoveDir::West)),
            (
                2.25,
                EventKind::AbilityCast {
                    ability: AbilityId(9),
                    target: Some(crate::event::CastTarget::Cell { x: 3, y: 4 }),
                },
            ),
            (3.5, EventKind::Death),
        ]);
        let restored = compress(&original).decompress();

        let specials: Vec<TimelineEvent> = restored
            .events()
            .iter()
            .filter(|e| !e.kind.is_movement())
            .copied()
            .collect();
        let original_specials: Vec<TimelineEvent> = original
            .events()
            .iter()
            .filter(|e| !e.kind.is_movement())
            .copied()
            .collect();
        assert_eq!(specials, original_specials);
    }

    #[test]
    fn test_retention_cap_drops_only_interior_movement() {
        let mut events: Vec<(f32, EventKind)> = (0..400)
            .map(|i| (i as f32 * 0.25, EventKind::Movement(MoveDir::North)))
            .collect();
        events.push((50.0, cast(1)));
        let original = publish(events);

        let compressed = compress(&original);
        let restored = compressed.decompress();

        let moves = restored.events().iter().filter(|e| e.kind.is_movement());
        assert_eq!(moves.count(), MAX_RETAINED_MOVES);
        assert_eq!(
            restored
                .events()
                .iter()
                .filter(|e| !e.kind.is_movement())
                .count(),
            1,
            "ability must never be dropped"
        );
        // Endpoints kept.
        assert_eq!(restored.events()[0].at.value(), 0.0);
        assert!(restored
            .events()
            .iter()
            .any(|e| (e.at.value() - 99.75).abs() < TIME_QUANTUM));
    }

    #[test]
    fn test_decompressed_timeline_stays_sorted() {
        let original = publish(vec![
            (3.0, EventKind::Movement(MoveDir::South)),
            (3.0, cast(2)),
            (8.0, EventKind::Movement(MoveDir::None)),
            (9.0, EventKind::Death),
        ]);
        let restored = compress(&original).decompress();
        assert!(restored
            .events()
            .windows(2)
            .all(|w| w[0].at.value() <= w[1].at.value()));
    }

    #[test]
    fn test_empty_timeline_round_trips() {
        let original = publish(vec![]);
        let compressed = compress(&original);
        assert!(compressed.is_empty());
        assert!(compressed.decompress().is_empty());
    }
}
