//! Ghost playback: driving replay agents from published timelines.
//!
//! A ghost is stateless beyond its cursor: its pose is a pure function of
//! `(timeline, cursor)`, recomputed from the cycle start every update, so
//! replay is deterministic and a ghost can always be resynced from scratch.
//! The cursor snaps to the owning zone's clock — never wall time — so pauses
//! and frame-rate changes cannot desynchronize a replay.

use std::sync::Arc;

use bevy::prelude::*;
use timeline::{AbilityId, CastTarget, EventKind, MoveDir, PublishedTimeline, Timestamp,
    TimelineEvent, CYCLE_LENGTH};

use crate::config::GHOST_SPEED;
use crate::lod::zone_due;
use crate::registry::GhostRegistry;
use crate::zones::{ZoneId, Zones};
use crate::{GlobalPause, SimulationSet, TickCounter};

/// A replay agent: a shared immutable timeline, the one zone whose clock
/// drives it, and where it stood when recording began.
#[derive(Component)]
pub struct Ghost {
    pub timeline: Arc<PublishedTimeline>,
    pub zone: ZoneId,
    pub origin: Vec2,
    /// Zone-clock instant the recording began. Anchors replay: the event
    /// list is stored sorted by wrapped timestamp, so a recording that
    /// crossed the cycle boundary has its tail at the *front* of the list
    /// and must be folded in recording order, not storage order.
    pub started_at: Timestamp,
}

/// Playback position on the zone cycle. `prev` is the cursor at the last
/// update this ghost received (which may be several ticks ago in a
/// throttled zone).
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct GhostCursor {
    pub prev: Timestamp,
    pub cursor: Timestamp,
}

/// Render-facing output, refreshed every scheduled update. Presentation
/// reads this; nothing in the engine does.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct GhostPose {
    pub pos: Vec2,
    pub dir: MoveDir,
    /// Death reached: motion stopped, ghost still visible until an external
    /// collaborator despawns it.
    pub halted: bool,
}

/// Presentation event: a replayed ability went off.
#[derive(Event, Debug, Clone, Copy)]
pub struct GhostAbilityFired {
    pub ghost: Entity,
    pub ability: AbilityId,
    pub target: Option<CastTarget>,
}

/// Spawn a replay agent at `origin`, cursor synced to the zone clock. The
/// caller is responsible for registry admission.
pub fn spawn_ghost(
    commands: &mut Commands,
    timeline: Arc<PublishedTimeline>,
    zone: ZoneId,
    origin: Vec2,
    start: Timestamp,
) -> Entity {
    commands
        .spawn((
            Ghost {
                timeline,
                zone,
                origin,
                started_at: start,
            },
            GhostCursor {
                prev: start,
                cursor: start,
            },
            GhostPose {
                pos: origin,
                dir: MoveDir::None,
                halted: false,
            },
        ))
        .id()
}

fn integrate(pos: Vec2, dir: MoveDir, dt: f32) -> Vec2 {
    let (x, y) = dir.vector();
    pos + Vec2::new(x, y) * GHOST_SPEED * dt.max(0.0)
}

/// Derive a ghost's pose purely from its timeline and cursor by folding the
/// events in recording order: iteration starts at the first event at-or-after
/// `started_at` (events before it in storage order are the wrapped tail of a
/// boundary-crossing recording), `origin` is anchored at `started_at`, and
/// every gap is a wraparound-aware forward distance. Recomputed from the
/// recording start every update, so the result never depends on history.
pub fn pose_at(
    timeline: &PublishedTimeline,
    origin: Vec2,
    started_at: Timestamp,
    cursor: Timestamp,
) -> GhostPose {
    let events = timeline.events();
    let split = events.partition_point(|e| e.at.value() < started_at.value());
    let rotated = events[split..].iter().chain(events[..split].iter());

    let total = started_at.duration_to(cursor);
    let mut pos = origin;
    let mut dir = MoveDir::None;
    let mut last = 0.0f32;

    for event in rotated {
        let at = started_at.duration_to(event.at);
        if at > total {
            break;
        }
        match event.kind {
            EventKind::Movement(d) => {
                pos = integrate(pos, dir, at - last);
                dir = d;
                last = at;
            }
            EventKind::Death => {
                pos = integrate(pos, dir, at - last);
                return GhostPose {
                    pos,
                    dir: MoveDir::None,
                    halted: true,
                };
            }
            EventKind::AbilityCast { .. } => {}
        }
    }

    pos = integrate(pos, dir, total - last);
    GhostPose {
        pos,
        dir,
        halted: false,
    }
}

/// Events with timestamp in the open-closed interval `(start, end]`.
fn slice_open_closed(events: &[TimelineEvent], start: f32, end: f32) -> &[TimelineEvent] {
    let lo = events.partition_point(|e| e.at.value() <= start);
    let hi = events.partition_point(|e| e.at.value() <= end);
    &events[lo..hi.max(lo)]
}

/// Events due in `(prev, cursor]`. When the cursor wrapped past the cycle
/// boundary the interval is split into `(prev, CYCLE_LENGTH)` and
/// `[0, cursor]` so every event triggers exactly once — no duplicates, no
/// misses.
pub fn due_events<'a>(
    timeline: &'a PublishedTimeline,
    prev: Timestamp,
    cursor: Timestamp,
) -> impl Iterator<Item = &'a TimelineEvent> {
    let events = timeline.events();
    let (head, tail) = if cursor.value() >= prev.value() {
        (
            slice_open_closed(events, prev.value(), cursor.value()),
            &events[0..0],
        )
    } else {
        (
            slice_open_closed(events, prev.value(), CYCLE_LENGTH),
            slice_open_closed(events, -1.0, cursor.value()),
        )
    };
    head.iter().chain(tail.iter())
}

/// Per-zone batched playback pass. The focused zone runs every tick; other
/// zones at their LOD stride. A throttled ghost catches up on skipped
/// ability triggers the next time its zone is due — late, but still exactly
/// once.
pub fn update_ghosts(
    pause: Res<GlobalPause>,
    tick: Res<TickCounter>,
    zones: Res<Zones>,
    registry: Res<GhostRegistry>,
    mut ghosts: Query<(&Ghost, &mut GhostCursor, &mut GhostPose)>,
    mut fired: EventWriter<GhostAbilityFired>,
) {
    if pause.paused {
        return;
    }
    for zone in ZoneId::all() {
        if !zone_due(zone, zones.focused, tick.0) {
            continue;
        }
        let now = zones.now(zone);
        for entity in registry.iter_zone(zone) {
            let Ok((ghost, mut cursor, mut pose)) = ghosts.get_mut(entity) else {
                continue;
            };
            cursor.prev = cursor.cursor;
            cursor.cursor = now;

            if pose.halted {
                continue;
            }
            for event in due_events(&ghost.timeline, cursor.prev, cursor.cursor) {
                if let EventKind::AbilityCast { ability, target } = event.kind {
                    fired.send(GhostAbilityFired {
                        ghost: entity,
                        ability,
                        target,
                    });
                }
            }
            *pose = pose_at(&ghost.timeline, ghost.origin, ghost.started_at, cursor.cursor);
        }
    }
}

pub struct PlaybackPlugin;

impl Plugin for PlaybackPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<GhostAbilityFired>().add_systems(
            FixedUpdate,
            update_ghosts
                .after(crate::capture::capture_intent)
                .in_set(SimulationSet::Simulate),
        );
    }
}
