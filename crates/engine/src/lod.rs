//! Level-of-detail scheduling and storage compaction.
//!
//! Two independent mechanisms, both gated on the global pause flag:
//!
//! - *Update-frequency LOD*: the focused zone updates every tick; other
//!   zones at a stride derived from their Chebyshev distance to it, down to
//!   a floor rate two zones out. Strides are driven by [`TickCounter`],
//!   which freezes while paused, so paused time never advances a throttled
//!   timer.
//! - *Storage compaction*: a slow pass that swaps oversized live timelines
//!   for their compressed round-trip. The shared handle is replaced, never
//!   the published buffer mutated; ghosts sharing the old handle simply keep
//!   it until they are compacted themselves.

use std::sync::Arc;

use bevy::prelude::*;
use timeline::compress;

use crate::config::{COMPACT_INTERVAL, COMPACT_THRESHOLD, LOD_STRIDES};
use crate::ghost::Ghost;
use crate::zones::ZoneId;
use crate::{GlobalPause, SimulationSet, TickCounter};

/// Update stride in ticks for a zone at the given distance from the focused
/// zone. Distances past the table clamp to the floor rate.
pub fn stride_for_distance(distance: u32) -> u64 {
    LOD_STRIDES[(distance as usize).min(LOD_STRIDES.len() - 1)]
}

/// Whether `zone` is due for a playback update this tick. Zone index is
/// mixed into the phase so distant zones don't all burst on the same tick.
pub fn zone_due(zone: ZoneId, focused: ZoneId, tick: u64) -> bool {
    let stride = stride_for_distance(focused.distance(zone));
    (tick + zone.index() as u64).is_multiple_of(stride)
}

/// Marks ghosts whose timeline has been through the compaction pass.
#[derive(Component)]
pub struct Compacted;

/// Slow pass: compress-and-rebuild timelines that grew past the retention
/// threshold. Runs every [`COMPACT_INTERVAL`] ticks.
pub fn compact_timelines(
    pause: Res<GlobalPause>,
    tick: Res<TickCounter>,
    mut commands: Commands,
    mut ghosts: Query<(Entity, &mut Ghost), Without<Compacted>>,
) {
    if pause.paused || !tick.0.is_multiple_of(COMPACT_INTERVAL) {
        return;
    }
    for (entity, mut ghost) in &mut ghosts {
        if ghost.timeline.len() <= COMPACT_THRESHOLD {
            commands.entity(entity).insert(Compacted);
            continue;
        }
        let compact = compress(&ghost.timeline).decompress();
        debug!(
            "compacted ghost {:?} timeline: {} -> {} events",
            entity,
            ghost.timeline.len(),
            compact.len()
        );
        ghost.timeline = Arc::new(compact);
        commands.entity(entity).insert(Compacted);
    }
}

pub struct LodPlugin;

impl Plugin for LodPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            compact_timelines.in_set(SimulationSet::Optimize),
        );
    }
}
