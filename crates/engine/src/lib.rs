//! Live simulation layer of the record-and-replay engine.
//!
//! Everything runs inside a single-threaded, tick-based `FixedUpdate` loop.
//! Within one tick the four phases execute in a fixed order:
//!
//!   Detect -> Orchestrate -> Simulate -> Optimize
//!
//! Detectors (countdown, time limit, external input) only *enqueue* session
//! requests; the one orchestrator consumes them and performs transitions, so
//! a transition requested this tick is fully applied before capture and
//! playback read the resulting state. Nothing here blocks and nothing here
//! is fatal: invalid requests are dropped with a warning and the simulation
//! keeps running.

use bevy::prelude::*;

pub mod capture;
pub mod config;
pub mod ghost;
pub mod lod;
pub mod registry;
pub mod session;
pub mod zones;

#[cfg(test)]
mod integration_tests;

/// Fixed execution phases of one simulation tick.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Clock advance and condition detectors (enqueue only).
    Detect,
    /// The single session orchestrator consuming the request inbox.
    Orchestrate,
    /// Intent capture and ghost playback.
    Simulate,
    /// Storage compaction and other deferrable passes.
    Optimize,
}

/// Global tick counter; drives LOD strides and slow passes. Frozen while
/// paused so throttled timers never silently advance.
#[derive(Resource, Default)]
pub struct TickCounter(pub u64);

/// The single pause flag every time-dependent system consults before
/// advancing any internal counter.
#[derive(Resource, Default)]
pub struct GlobalPause {
    pub paused: bool,
}

pub fn tick_counter(pause: Res<GlobalPause>, mut tick: ResMut<TickCounter>) {
    if pause.paused {
        return;
    }
    tick.0 = tick.0.wrapping_add(1);
}

pub struct EnginePlugin;

impl Plugin for EnginePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TickCounter>()
            .init_resource::<GlobalPause>();

        app.configure_sets(
            FixedUpdate,
            (
                SimulationSet::Detect,
                SimulationSet::Orchestrate,
                SimulationSet::Simulate,
                SimulationSet::Optimize,
            )
                .chain(),
        );

        app.add_systems(
            FixedUpdate,
            tick_counter
                .in_set(SimulationSet::Detect)
                .before(zones::advance_zone_clocks),
        );

        app.add_plugins((
            zones::ZonesPlugin,
            registry::RegistryPlugin,
            session::SessionPlugin,
            capture::CapturePlugin,
            ghost::PlaybackPlugin,
            lod::LodPlugin,
        ));
    }
}
