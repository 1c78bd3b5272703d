//! Engine-wide tuning constants. Cycle length and compression parameters
//! live in the `timeline` crate next to the types they bound.

/// Zone layout: a fixed 3x3 grid of independently clocked simulation spaces.
pub const ZONE_COLS: usize = 3;
pub const ZONE_ROWS: usize = 3;
pub const ZONE_COUNT: usize = ZONE_COLS * ZONE_ROWS;

/// Time-units a zone clock advances per fixed simulation tick.
pub const TICK_DT: f32 = 0.1;

/// Replay agent movement speed, in grid cells per time-unit.
pub const GHOST_SPEED: f32 = 4.0;

/// Global replay-agent population ceiling. Admission past this is refused,
/// never evicted.
pub const MAX_GHOSTS_TOTAL: usize = 320;

/// Per-zone population sub-ceiling.
pub const MAX_GHOSTS_PER_ZONE: usize = 64;

/// Countdown before capture begins, in time-units.
pub const COUNTDOWN_DURATION: f32 = 3.0;

/// Maximum length of one recording, in time-units. Kept well under a cycle
/// so a recording can never overlap itself after the clock wraps.
pub const RECORD_TIME_LIMIT: f32 = 30.0;

/// Minimum dwell between recorded movement samples, in time-units. Direction
/// changes inside this window are coalesced.
pub const CAPTURE_DWELL: f32 = 0.25;

/// Pending-request capacity of the session inbox. Overflow is dropped with a
/// warning; the inbox never blocks.
pub const SESSION_INBOX_CAP: usize = 32;

/// Update stride (in ticks) by Chebyshev zone distance from the focused
/// zone: full rate in focus, floor rate two or more zones out.
pub const LOD_STRIDES: [u64; 3] = [1, 4, 16];

/// Live timelines longer than this get compacted by the optimize pass.
pub const COMPACT_THRESHOLD: usize = 384;

/// How often (in ticks) the compaction pass scans for oversized timelines.
pub const COMPACT_INTERVAL: u64 = 100;
