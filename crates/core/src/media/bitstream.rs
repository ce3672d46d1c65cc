//! Storage-to-transport reformatting of access units.
//!
//! MP4-style containers store NAL-unit codecs as a sequence of records:
//!
//! ```text
//! +----------------+-------------+----------------+-------------+
//! | len (4, BE)    | NAL payload | len (4, BE)    | NAL payload | ...
//! +----------------+-------------+----------------+-------------+
//! ```
//!
//! The RTP payloaders expect Annex B, where each NAL unit is preceded by
//! `00 00 00 01`. Both framings use four bytes per NAL unit, so the rewrite
//! keeps every payload byte at its offset and the total length unchanged.

use crate::error::{Result, SourceError};
use crate::media::TransportCodec;

/// Annex B start code that replaces each 4-byte length prefix.
pub const START_CODE: [u8; 4] = [0, 0, 0, 1];

const LENGTH_PREFIX: usize = 4;

/// Convert `unit` from storage framing into transport framing for `codec`.
///
/// `track` only labels errors. Audio codecs pass through unchanged.
pub fn to_transport(codec: TransportCodec, track: usize, unit: &[u8]) -> Result<Vec<u8>> {
    if codec.is_length_prefixed() {
        length_prefixed_to_annex_b(track, unit)
    } else {
        Ok(unit.to_vec())
    }
}

/// Rewrite every 4-byte big-endian length prefix into [`START_CODE`].
///
/// Records are walked with checked bounds; a record that claims more bytes
/// than remain is reported as [`SourceError::MalformedAccessUnit`].
pub fn length_prefixed_to_annex_b(track: usize, unit: &[u8]) -> Result<Vec<u8>> {
    let mut out = unit.to_vec();
    let mut offset = 0usize;

    while offset < out.len() {
        let malformed = || SourceError::MalformedAccessUnit { track, offset };
        let prefix: [u8; LENGTH_PREFIX] = out
            .get(offset..offset + LENGTH_PREFIX)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(malformed)?;
        let len = u32::from_be_bytes(prefix) as usize;
        let end = offset
            .checked_add(LENGTH_PREFIX + len)
            .filter(|&end| end <= out.len())
            .ok_or_else(malformed)?;

        out[offset..offset + LENGTH_PREFIX].copy_from_slice(&START_CODE);
        offset = end;
    }

    Ok(out)
}
