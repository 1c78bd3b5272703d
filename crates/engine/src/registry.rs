//! Zone-indexed registry of live replay agents.
//!
//! Membership is O(1) to add or remove and O(k) to iterate per zone, so the
//! playback pass can batch work zone-by-zone and skip throttled zones
//! cheaply. Admission is checked against the global and per-zone population
//! ceilings *before* a ghost is spawned; a refusal is a reported, non-fatal
//! condition — existing agents are never evicted.

use std::collections::{HashMap, HashSet};

use bevy::prelude::*;

use crate::config::{MAX_GHOSTS_PER_ZONE, MAX_GHOSTS_TOTAL, ZONE_COUNT};
use crate::ghost::Ghost;
use crate::zones::ZoneId;
use crate::SimulationSet;

/// Why an admission request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    /// The global population ceiling is reached.
    WorldFull { ceiling: usize },
    /// The target zone's sub-ceiling is reached.
    ZoneFull { zone: ZoneId, ceiling: usize },
}

impl std::fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionError::WorldFull { ceiling } => {
                write!(f, "global ghost ceiling reached ({ceiling})")
            }
            AdmissionError::ZoneFull { zone, ceiling } => {
                write!(f, "zone {zone:?} ghost ceiling reached ({ceiling})")
            }
        }
    }
}

/// Maps each zone to its set of live ghost entities.
#[derive(Resource)]
pub struct GhostRegistry {
    zones: [HashSet<Entity>; ZONE_COUNT],
    index: HashMap<Entity, ZoneId>,
}

impl Default for GhostRegistry {
    fn default() -> Self {
        GhostRegistry {
            zones: std::array::from_fn(|_| HashSet::new()),
            index: HashMap::new(),
        }
    }
}

impl GhostRegistry {
    /// Check whether one more ghost may enter `zone`. Call before spawning.
    pub fn try_admit(&self, zone: ZoneId) -> Result<(), AdmissionError> {
        if self.index.len() >= MAX_GHOSTS_TOTAL {
            return Err(AdmissionError::WorldFull {
                ceiling: MAX_GHOSTS_TOTAL,
            });
        }
        if self.zones[zone.index()].len() >= MAX_GHOSTS_PER_ZONE {
            return Err(AdmissionError::ZoneFull {
                zone,
                ceiling: MAX_GHOSTS_PER_ZONE,
            });
        }
        Ok(())
    }

    /// Register a spawned ghost. The caller must have passed `try_admit`.
    pub fn insert(&mut self, entity: Entity, zone: ZoneId) {
        debug_assert!(self.try_admit(zone).is_ok(), "insert without admission");
        self.zones[zone.index()].insert(entity);
        self.index.insert(entity, zone);
    }

    /// Remove a ghost, returning the zone it lived in.
    pub fn remove(&mut self, entity: Entity) -> Option<ZoneId> {
        let zone = self.index.remove(&entity)?;
        self.zones[zone.index()].remove(&entity);
        Some(zone)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.index.contains_key(&entity)
    }

    pub fn zone_of(&self, entity: Entity) -> Option<ZoneId> {
        self.index.get(&entity).copied()
    }

    pub fn population(&self) -> usize {
        self.index.len()
    }

    pub fn zone_population(&self, zone: ZoneId) -> usize {
        self.zones[zone.index()].len()
    }

    pub fn iter_zone(&self, zone: ZoneId) -> impl Iterator<Item = Entity> + '_ {
        self.zones[zone.index()].iter().copied()
    }
}

/// Reconcile the registry when ghost entities are despawned by the outside
/// world (presentation removes a dead ghost, a zone unloads, ...).
pub fn sync_registry_on_despawn(
    mut removed: RemovedComponents<Ghost>,
    mut registry: ResMut<GhostRegistry>,
) {
    for entity in removed.read() {
        if let Some(zone) = registry.remove(entity) {
            debug!("ghost {:?} removed from zone {:?}", entity, zone);
        }
    }
}

pub struct RegistryPlugin;

impl Plugin for RegistryPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GhostRegistry>().add_systems(
            FixedUpdate,
            sync_registry_on_despawn.in_set(SimulationSet::Detect),
        );
    }
}
