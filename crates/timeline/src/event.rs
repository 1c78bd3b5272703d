use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

/// Quantized movement intent: the 8-way direction the player is holding this
/// tick, or `None` when all directional keys are released.
///
/// Only the intent is ever recorded — never the resulting transform — so a
/// replay survives changes to the movement implementation and externally
/// imposed motion (knockback) is invisible to the recording by construction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode,
)]
pub enum MoveDir {
    #[default]
    None,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl MoveDir {
    /// Unit direction vector in grid space (+x east, +y north).
    pub fn vector(self) -> (f32, f32) {
        const DIAG: f32 = std::f32::consts::FRAC_1_SQRT_2;
        match self {
            MoveDir::None => (0.0, 0.0),
            MoveDir::North => (0.0, 1.0),
            MoveDir::NorthEast => (DIAG, DIAG),
            MoveDir::East => (1.0, 0.0),
            MoveDir::SouthEast => (DIAG, -DIAG),
            MoveDir::South => (0.0, -1.0),
            MoveDir::SouthWest => (-DIAG, -DIAG),
            MoveDir::West => (-1.0, 0.0),
            MoveDir::NorthWest => (-DIAG, DIAG),
        }
    }

    /// Quantize raw held-axis input to the nearest of the 8 directions.
    /// `(0, 0)` means no keys held.
    pub fn from_axes(x: i8, y: i8) -> Self {
        match (x.signum(), y.signum()) {
            (0, 0) => MoveDir::None,
            (0, 1) => MoveDir::North,
            (1, 1) => MoveDir::NorthEast,
            (1, 0) => MoveDir::East,
            (1, -1) => MoveDir::SouthEast,
            (0, -1) => MoveDir::South,
            (-1, -1) => MoveDir::SouthWest,
            (-1, 0) => MoveDir::West,
            (-1, 1) => MoveDir::NorthWest,
            _ => unreachable!("signum returns -1, 0, or 1"),
        }
    }
}

/// Identifier for an ability definition. Ability semantics (cooldowns,
/// effects, flavor) live outside the engine; the recording only needs a
/// stable id to re-fire the cast.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode,
)]
pub struct AbilityId(pub u16);

/// Target resolved at the moment of cast, when the ability had one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum CastTarget {
    /// Another agent, by the externally assigned entity id.
    Agent(u32),
    /// A grid cell.
    Cell { x: i32, y: i32 },
}

/// What happened at one instant of the recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum EventKind {
    /// Held direction changed (or keys were released: `MoveDir::None`).
    Movement(MoveDir),
    /// An ability input was edge-pressed.
    AbilityCast {
        ability: AbilityId,
        target: Option<CastTarget>,
    },
    /// The subject died. Terminates replay-driven motion.
    Death,
}

impl EventKind {
    /// Movement samples may be coalesced or dropped by compression;
    /// everything else must survive verbatim.
    pub fn is_movement(&self) -> bool {
        matches!(self, EventKind::Movement(_))
    }
}

/// One entry in a timeline: an intent event and the zone-clock instant it
/// was captured at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct TimelineEvent {
    pub at: Timestamp,
    pub kind: EventKind,
}

impl TimelineEvent {
    pub fn new(at: Timestamp, kind: EventKind) -> Self {
        TimelineEvent { at, kind }
    }
}
