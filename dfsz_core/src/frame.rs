//! On-stream layout of one compressed chunk.
//!
//! ```text
//! [raw_len: u32 BE][compressed_len: u32 BE][checksum: u64 BE][payload ...]
//! ```
//!
//! Length-prefixed blocks as in Hadoop's block-compressed streams, plus an
//! xxh3-64 checksum of the payload. Every position-index entry points at the
//! first byte of a frame header, so a reader can start decoding there without
//! touching earlier frames.

use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Fixed size of a frame header in bytes: 4 + 4 + 8.
pub const FRAME_HEADER_SIZE: usize = 16;

/// Largest raw chunk a single frame can describe.
pub const MAX_CHUNK_SIZE: u64 = u32::MAX as u64;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("{what} of {len} bytes does not fit in a frame (max {})", MAX_CHUNK_SIZE)]
    TooLarge { what: &'static str, len: u64 },

    #[error("frame checksum mismatch: expected {expected:016x}, got {actual:016x}")]
    ChecksumMismatch { expected: u64, actual: u64 },

    #[error("frame decoded to {actual} bytes but header says {expected}")]
    LengthMismatch { expected: u32, actual: usize },
}

// ── Header ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Length of the original chunk.
    pub raw_len: u32,
    /// Length of the payload that follows the header.
    pub compressed_len: u32,
    /// xxh3-64 of the payload.
    pub checksum: u64,
}

impl FrameHeader {
    /// Describe `payload`, the compressed form of a `raw_len`-byte chunk.
    pub fn for_payload(raw_len: usize, payload: &[u8]) -> Result<Self, FrameError> {
        Ok(Self {
            raw_len: fit_u32("chunk", raw_len)?,
            compressed_len: fit_u32("compressed chunk", payload.len())?,
            checksum: xxh3_64(payload),
        })
    }

    /// Total bytes this frame occupies on the stream.
    pub fn frame_len(&self) -> u64 {
        FRAME_HEADER_SIZE as u64 + self.compressed_len as u64
    }

    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut buf = [0u8; FRAME_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.raw_len.to_be_bytes());
        buf[4..8].copy_from_slice(&self.compressed_len.to_be_bytes());
        buf[8..16].copy_from_slice(&self.checksum.to_be_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; FRAME_HEADER_SIZE]) -> Self {
        let mut raw_len = [0u8; 4];
        let mut compressed_len = [0u8; 4];
        let mut checksum = [0u8; 8];
        raw_len.copy_from_slice(&buf[0..4]);
        compressed_len.copy_from_slice(&buf[4..8]);
        checksum.copy_from_slice(&buf[8..16]);
        Self {
            raw_len: u32::from_be_bytes(raw_len),
            compressed_len: u32::from_be_bytes(compressed_len),
            checksum: u64::from_be_bytes(checksum),
        }
    }

    /// Check `payload` against the stored checksum.
    pub fn verify(&self, payload: &[u8]) -> Result<(), FrameError> {
        let actual = xxh3_64(payload);
        if actual != self.checksum {
            return Err(FrameError::ChecksumMismatch {
                expected: self.checksum,
                actual,
            });
        }
        Ok(())
    }

    /// Check a decoded chunk against the stored raw length.
    pub fn verify_raw_len(&self, raw: &[u8]) -> Result<(), FrameError> {
        if raw.len() != self.raw_len as usize {
            return Err(FrameError::LengthMismatch {
                expected: self.raw_len,
                actual: raw.len(),
            });
        }
        Ok(())
    }
}

fn fit_u32(what: &'static str, len: usize) -> Result<u32, FrameError> {
    u32::try_from(len).map_err(|_| FrameError::TooLarge {
        what,
        len: len as u64,
    })
}
