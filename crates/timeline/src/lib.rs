//! Data model for recorded player intent: bounded wrapping timestamps,
//! timeline events, draft/published buffers, storage compression, and the
//! flat wire codec.
//!
//! This crate is deliberately ECS-free. The live simulation layer (the
//! `engine` crate) owns clocks, sessions, and ghosts; everything here is a
//! plain value type that can be tested, serialized, and shared without a
//! `World`.

pub mod compress;
pub mod draft;
pub mod event;
pub mod published;
pub mod timestamp;
pub mod wire;

pub use compress::{compress, CompressedTimeline, MAX_RETAINED_MOVES, TIME_QUANTUM};
pub use draft::DraftTimeline;
pub use event::{AbilityId, CastTarget, EventKind, MoveDir, TimelineEvent};
pub use published::PublishedTimeline;
pub use timestamp::{Timestamp, CYCLE_LENGTH};
pub use wire::{decode_timeline, encode_timeline, WireError};
