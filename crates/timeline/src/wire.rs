//! Flat wire codec for published timelines.
//!
//! Layout: a fixed-size little-endian header followed by the payload — the
//! bitcode-encoded event list, lz4-compressed when that actually shrinks it.
//!
//! Header (20 bytes):
//!   [0..4]   Magic bytes: "AFTR"
//!   [4..8]   Format version (u32)
//!   [8..12]  Flags (u32: bit 0 = lz4-compressed payload)
//!   [12..16] Uncompressed payload size (u32)
//!   [16..20] xxHash32 checksum of the stored payload
//!
//! No on-disk location or format beyond this is mandated; persistence is an
//! external collaborator. Decoding never panics — every failure mode is a
//! [`WireError`] the caller can log and ignore.

use bitcode::{Decode, Encode};
use xxhash_rust::xxh32::xxh32;

use crate::event::TimelineEvent;
use crate::published::PublishedTimeline;

/// Magic bytes identifying an afterimage timeline blob.
pub const MAGIC: [u8; 4] = *b"AFTR";

/// Size of the wire header in bytes.
pub const HEADER_SIZE: usize = 20;

/// Current wire format version.
pub const WIRE_VERSION: u32 = 1;

const FLAG_COMPRESSED: u32 = 1;
const XXHASH_SEED: u32 = 0;

/// Every way a timeline blob can fail to decode. None of these are fatal to
/// the engine; the worst case is "that recording is unusable".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Blob shorter than the header.
    TooShort,
    /// First four bytes are not [`MAGIC`].
    BadMagic,
    /// Header version is newer than this build understands.
    UnsupportedVersion(u32),
    /// Stored payload does not match its checksum.
    ChecksumMismatch { expected: u32, actual: u32 },
    /// lz4 decompression failed or produced the wrong size.
    Decompress,
    /// Payload bytes did not decode to a sorted event list.
    Corrupt,
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireError::TooShort => write!(f, "blob shorter than wire header"),
            WireError::BadMagic => write!(f, "missing AFTR magic bytes"),
            WireError::UnsupportedVersion(v) => write!(f, "unsupported wire version {v}"),
            WireError::ChecksumMismatch { expected, actual } => write!(
                f,
                "payload checksum mismatch (expected {expected:#010x}, got {actual:#010x})"
            ),
            WireError::Decompress => write!(f, "payload decompression failed"),
            WireError::Corrupt => write!(f, "payload is not a sorted event list"),
        }
    }
}

impl std::error::Error for WireError {}

#[derive(Encode, Decode)]
struct WirePayload {
    events: Vec<TimelineEvent>,
}

/// Serialize a published timeline to a flat, self-describing blob.
pub fn encode_timeline(timeline: &PublishedTimeline) -> Vec<u8> {
    let raw = bitcode::encode(&WirePayload {
        events: timeline.events().to_vec(),
    });

    let raw_len = raw.len();
    let compressed = lz4_flex::compress_prepend_size(&raw);
    let (payload, flags) = if compressed.len() < raw_len {
        (compressed, FLAG_COMPRESSED)
    } else {
        (raw, 0)
    };

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&WIRE_VERSION.to_le_bytes());
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&(raw_len as u32).to_le_bytes());
    out.extend_from_slice(&xxh32(&payload, XXHASH_SEED).to_le_bytes());
    out.extend_from_slice(&payload);
    out
}

/// Decode a blob produced by [`encode_timeline`].
pub fn decode_timeline(bytes: &[u8]) -> Result<PublishedTimeline, WireError> {
    if bytes.len() < HEADER_SIZE {
        return Err(WireError::TooShort);
    }
    if bytes[0..4] != MAGIC {
        return Err(WireError::BadMagic);
    }

    let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap_or([0; 4]));
    if version > WIRE_VERSION {
        return Err(WireError::UnsupportedVersion(version));
    }
    let flags = u32::from_le_bytes(bytes[8..12].try_into().unwrap_or([0; 4]));
    let raw_size = u32::from_le_bytes(bytes[12..16].try_into().unwrap_or([0; 4])) as usize;
    let expected = u32::from_le_bytes(bytes[16..20].try_into().unwrap_or([0; 4]));

    let payload = &bytes[HEADER_SIZE..];
    let actual = xxh32(payload, XXHASH_SEED);
    if actual != expected {
        return Err(WireError::ChecksumMismatch { expected, actual });
    }

    let raw = if flags & FLAG_COMPRESSED != 0 {
        let decompressed =
            lz4_flex::decompress_size_prepended(payload).map_err(|_| WireError::Decompress)?;
        if decompressed.len() != raw_size {
            return Err(WireError::Decompress);
        }
        decompressed
    } else {
        payload.to_vec()
    };

    let payload: WirePayload = bitcode::decode(&raw).map_err(|_| WireError::Corrupt)?;
    if !payload
        .events
        .windows(2)
        .all(|w| w[0].at.value() <= w[1].at.value())
    {
        return Err(WireError::Corrupt);
    }
    Ok(PublishedTimeline::from_sorted_events(payload.events))
}
