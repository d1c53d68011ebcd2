//! Binary encoding for embedding vectors.
//!
//! Blobs are a fixed 12-byte header followed by the raw elements, all
//! little-endian:
//!
//! ```text
//! 0..4   magic  b"VSEV"
//! 4      format version
//! 5      element type (1 = f32)
//! 6..8   reserved (zero)
//! 8..12  element count (u32)
//! 12..   count * 4 bytes of f32
//! ```
//!
//! The layout is plain numeric data so a store written by one build can be
//! read by any other tool that knows the header.

use crate::{Error, Result};

pub const MAGIC: [u8; 4] = *b"VSEV";
pub const FORMAT_VERSION: u8 = 1;
pub const HEADER_LEN: usize = 12;

const ELEM_F32: u8 = 1;
const ELEM_SIZE: usize = std::mem::size_of::<f32>();

/// Encode a vector into a self-sized blob. Bit-exact for every f32 value.
pub fn encode(vector: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + vector.len() * ELEM_SIZE);
    out.extend_from_slice(&MAGIC);
    out.push(FORMAT_VERSION);
    out.push(ELEM_F32);
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&(vector.len() as u32).to_le_bytes());
    for x in vector {
        out.extend_from_slice(&x.to_le_bytes());
    }
    out
}

/// Decode a blob produced by [`encode`].
pub fn decode(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() < HEADER_LEN {
        return Err(Error::CorruptBlob(format!(
            "blob is {} bytes, shorter than the {}-byte header",
            blob.len(),
            HEADER_LEN
        )));
    }
    if blob[0..4] != MAGIC {
        return Err(Error::CorruptBlob("bad magic".to_string()));
    }
    if blob[4] != FORMAT_VERSION {
        return Err(Error::CorruptBlob(format!(
            "unsupported format version {}",
            blob[4]
        )));
    }
    if blob[5] != ELEM_F32 {
        return Err(Error::CorruptBlob(format!(
            "unsupported element type {}",
            blob[5]
        )));
    }

    let count = u32::from_le_bytes([blob[8], blob[9], blob[10], blob[11]]) as usize;
    let body = &blob[HEADER_LEN..];
    if body.len() != count * ELEM_SIZE {
        return Err(Error::CorruptBlob(format!(
            "header declares {} elements ({} bytes) but body has {} bytes",
            count,
            count * ELEM_SIZE,
            body.len()
        )));
    }

    Ok(body
        .chunks_exact(ELEM_SIZE)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
