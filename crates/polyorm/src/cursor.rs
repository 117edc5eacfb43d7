//! Opaque pagination cursors.
//!
//! A token is URL-safe base64 (no padding) of:
//!
//! ```text
//! [version: u8][offset: LEB128 varint][reserved: any trailing bytes]
//! ```
//!
//! Decoders ignore trailing bytes so later versions can append fields without
//! invalidating tokens already handed out.

use crate::error::{OrmError, OrmResult};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

const VERSION: u8 = 1;

/// Encode a row offset as a cursor token.
pub fn encode(offset: u64) -> String {
    let mut buf = Vec::with_capacity(11);
    buf.push(VERSION);
    let mut rest = offset;
    loop {
        let byte = (rest & 0x7f) as u8;
        rest >>= 7;
        if rest == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
    URL_SAFE_NO_PAD.encode(buf)
}

/// Decode a cursor token back into its row offset.
pub fn decode(token: &str) -> OrmResult<u64> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|e| OrmError::InvalidCursor(format!("not base64: {e}")))?;
    let (&version, body) = bytes
        .split_first()
        .ok_or_else(|| OrmError::InvalidCursor("empty token".to_string()))?;
    if version == 0 {
        return Err(OrmError::InvalidCursor("unknown version 0".to_string()));
    }

    let mut offset: u64 = 0;
    for (i, &byte) in body.iter().enumerate() {
        let shift = 7 * i as u32;
        let bits = u64::from(byte & 0x7f);
        if shift >= 64 || (shift == 63 && bits > 1) {
            return Err(OrmError::InvalidCursor("offset overflows u64".to_string()));
        }
        offset |= bits << shift;
        if byte & 0x80 == 0 {
            return Ok(offset);
        }
    }
    Err(OrmError::InvalidCursor("truncated offset".to_string()))
}
