//! The fixed 3x3 grid of independently clocked simulation zones.
//!
//! Each zone owns one [`ZoneClock`] that advances by [`TICK_DT`] every fixed
//! tick unless the global pause flag is set, wrapping at the cycle length.
//! Clocks are mutated only by the clock-update pass in the `Detect` phase;
//! the only other legal change is an explicit reset to zero, requested
//! through [`ResetZoneClock`]. The zone count is small and fixed, so zones
//! live in a dense array indexed by [`ZoneId`] rather than any dynamic map.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use timeline::Timestamp;

use crate::config::{TICK_DT, ZONE_COLS, ZONE_COUNT, ZONE_ROWS};
use crate::{GlobalPause, SimulationSet};

/// Index of one zone in the 3x3 layout, row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneId(u8);

impl ZoneId {
    /// The center zone, where play begins.
    pub const CENTER: ZoneId = ZoneId(4);

    pub fn new(index: usize) -> Option<ZoneId> {
        (index < ZONE_COUNT).then_some(ZoneId(index as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn grid_pos(self) -> (usize, usize) {
        (self.0 as usize % ZONE_COLS, self.0 as usize / ZONE_COLS)
    }

    pub fn from_grid(col: usize, row: usize) -> Option<ZoneId> {
        (col < ZONE_COLS && row < ZONE_ROWS).then_some(ZoneId((row * ZONE_COLS + col) as u8))
    }

    /// Chebyshev distance between two zones on the grid — the coarse metric
    /// the update scheduler throttles by.
    pub fn distance(self, other: ZoneId) -> u32 {
        let (ax, ay) = self.grid_pos();
        let (bx, by) = other.grid_pos();
        ax.abs_diff(bx).max(ay.abs_diff(by)) as u32
    }

    pub fn all() -> impl Iterator<Item = ZoneId> {
        (0..ZONE_COUNT).map(|i| ZoneId(i as u8))
    }
}

/// One zone's simulation clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneClock {
    pub now: Timestamp,
}

impl ZoneClock {
    fn tick(&mut self) {
        self.now = self.now.advanced(TICK_DT);
    }
}

/// All zone clocks plus the zone currently in player focus. The focused
/// zone is written by the presentation layer; everything else in here is
/// owned by the clock-update pass.
#[derive(Resource)]
pub struct Zones {
    clocks: [ZoneClock; ZONE_COUNT],
    pub focused: ZoneId,
}

impl Default for Zones {
    fn default() -> Self {
        Zones {
            clocks: [ZoneClock::default(); ZONE_COUNT],
            focused: ZoneId::CENTER,
        }
    }
}

impl Zones {
    pub fn now(&self, zone: ZoneId) -> Timestamp {
        self.clocks[zone.index()].now
    }

    pub fn clock(&self, zone: ZoneId) -> &ZoneClock {
        &self.clocks[zone.index()]
    }
}

/// Request to reset one zone's clock to zero — the only way a clock ever
/// moves to anything but the next tick value.
#[derive(Event, Debug, Clone, Copy)]
pub struct ResetZoneClock(pub ZoneId);

/// The clock-update pass: applies pending resets, then advances every clock
/// unless globally paused. Resets apply even while paused — an explicit
/// request is not "time advancing".
pub fn advance_zone_clocks(
    pause: Res<GlobalPause>,
    mut zones: ResMut<Zones>,
    mut resets: EventReader<ResetZoneClock>,
) {
    for ResetZoneClock(zone) in resets.read() {
        info!("zone {:?}: clock reset to zero", zone);
        zones.clocks[zone.index()].now = Timestamp::ZERO;
    }
    if pause.paused {
        return;
    }
    for clock in &mut zones.clocks {
        clock.tick();
    }
}

pub struct ZonesPlugin;

impl Plugin for ZonesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Zones>()
            .add_event::<ResetZoneClock>()
            .add_systems(
                FixedUpdate,
                advance_zone_clocks.in_set(SimulationSet::Detect),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline::CYCLE_LENGTH;

    #[test]
    fn test_zone_id_grid_round_trip() {
        for zone in ZoneId::all() {
            let (col, row) = zone.grid_pos();
            assert_eq!(ZoneId::from_grid(col, row), Some(zone));
        }
        assert_eq!(ZoneId::new(ZONE_COUNT), None);
        assert_eq!(ZoneId::from_grid(3, 0), None);
    }

    #[test]
    fn test_center_distance() {
        let center = ZoneId::CENTER;
        assert_eq!(center.distance(center), 0);
        // Every other zone is adjacent to the center in a 3x3 layout.
        for zone in ZoneId::all() {
            if zone != center {
                assert_eq!(center.distance(zone), 1);
            }
        }
        // Opposite corners are two apart.
        let a = ZoneId::from_grid(0, 0).unwrap();
        let b = ZoneId::from_grid(2, 2).unwrap();
        assert_eq!(a.distance(b), 2);
    }

    #[test]
    fn test_clock_wraps_at_cycle_length() {
        let mut clock = ZoneClock {
            now: Timestamp::new(CYCLE_LENGTH - TICK_DT / 2.0),
        };
        clock.tick();
        assert!(
            clock.now.value() < TICK_DT,
            "expected wrap, got {}",
            clock.now.value()
        );
    }

    #[test]
    fn test_clock_advances_monotonically_within_cycle() {
        let mut clock = ZoneClock::default();
        let mut prev = clock.now;
        for _ in 0..100 {
            clock.tick();
            assert!(clock.now > prev);
            prev = clock.now;
        }
    }
}
